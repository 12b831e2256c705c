//! Strata Type Oracle
//!
//! Compiler-facing view of the VM's class metadata:
//! - **Oracle**: per-compilation cache of immutable type handles (`oracle` module)
//! - **Hierarchy**: subtype, subclass, display and LCA queries (`hierarchy` module)
//! - **Heap**: the gate, scopes and store trait that guard live metadata (`heap` module)
//! - **Interner**: canonical class names within a session (`interner` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata_oracle::{ClassDef, ClassTable, TypeOracle};
//!
//! let table = Arc::new(ClassTable::new("java/lang/Object"));
//! let list = table.define(ClassDef::class("java/util/AbstractList"))?;
//!
//! let mut oracle = TypeOracle::new(table.clone());
//! let list = oracle.resolve(list)?;
//! let object = oracle.resolve(table.root())?;
//! assert!(oracle.is_subtype_of(list, object)?);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Configuration: per-session options and TOML loading
pub mod config;

/// Error types
pub mod error;

/// Type handles and hierarchy snapshots
pub mod handle;

/// The heap boundary: gate, scopes, store trait and the in-memory class table
pub mod heap;

/// Subtype, subclass and common-ancestor queries
pub mod hierarchy;

/// Class name interning
pub mod interner;

/// The session cache
pub mod oracle;

pub use config::{ConfigError, OracleOptions};
pub use error::{HeapError, OracleError, OracleResult};
pub use handle::{
    external_name, CheckSlot, HierarchyDescriptor, LoadedClass, SessionId, TypeHandle, TypeKind,
    TypeRef, TypeState, UnloadedClass,
};
pub use heap::{
    ArrayElement, BasicType, ClassDef, ClassFlags, ClassKind, ClassTable, GateStats,
    HeapEntryScope, HeapGate, HeapIdentity, HierarchyRecord, LayoutDescriptor, LoadState,
    LoaderId, MetadataStore, PauseGuard, TableError,
};
pub use interner::{NameInterner, NameRef};
pub use oracle::{OracleStats, TypeOracle};
