//! The heap boundary
//!
//! Class metadata lives in a store that class loading mutates and the
//! collector relocates while compilations run. Every read goes through the
//! [`MetadataStore`] trait and takes a [`HeapEntryScope`] as proof that the
//! caller is inside the gate. Nothing read here may be retained as a
//! reference: reads return owned values.

mod gate;
pub mod layout;
mod table;

pub use gate::{GateId, GateStats, HeapEntryScope, HeapGate, PauseGuard};
pub use layout::{BasicType, LayoutDescriptor};
pub use table::{ArrayElement, ClassDef, ClassTable, TableError};

use crate::error::HeapError;
use std::fmt;
use std::num::NonZeroU64;

/// Opaque token naming one class object in the metadata store
///
/// Used only as a cache key and as an argument to store reads; it is never
/// dereferenced by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapIdentity(NonZeroU64);

impl HeapIdentity {
    /// Wrap a raw token (zero is not a valid identity)
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(HeapIdentity)
    }

    /// Get the raw token
    pub fn as_u64(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for HeapIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:#x}", self.0.get())
    }
}

/// A class loader namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoaderId(u32);

impl LoaderId {
    /// The loader that defines the root class
    pub const BOOTSTRAP: LoaderId = LoaderId(0);

    /// Wrap a raw loader number
    pub const fn new(raw: u32) -> Self {
        LoaderId(raw)
    }

    /// Get the raw loader number
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Whether a class object has finished loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Fully loaded; layout and hierarchy are available
    Loaded,
    /// Referenced but not loaded
    Unloaded,
}

/// Shape of a class object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// An ordinary (possibly abstract) class
    Instance,
    /// An interface
    Interface,
    /// An array whose elements have the given basic type
    Array(BasicType),
}

/// Access and modifier flags of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassFlags {
    /// Flags as declared in the class file
    pub access_flags: u32,
    /// Flags as reported by reflection (arrays derive theirs from the element)
    pub modifier_flags: u32,
}

/// Hierarchy position of a loaded class as stored in the heap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyRecord {
    /// Superclass chain from the root down to the direct superclass
    pub supers: Vec<HeapIdentity>,
    /// Interfaces and ancestors that do not fit in the primary display
    pub secondary_supers: Vec<HeapIdentity>,
    /// Whether this class occupies a primary display slot in its subclasses
    pub can_be_primary_super: bool,
    /// Byte offset that a fast subtype check against this class compares
    pub super_check_offset: u32,
    /// Number of primary display slots
    pub display_capacity: usize,
}

/// Read access to heap-resident class metadata
///
/// All reads require an open scope on [`gate`](MetadataStore::gate).
/// Implementations serialize their own mutation internally.
pub trait MetadataStore: Send + Sync {
    /// The gate guarding this store
    fn gate(&self) -> &HeapGate;

    /// Internal name, e.g. `com/example/Foo` or `[Ljava/lang/String;`
    fn read_name(&self, scope: &HeapEntryScope<'_>, id: HeapIdentity) -> Result<String, HeapError>;

    /// Current load state
    fn read_load_state(
        &self,
        scope: &HeapEntryScope<'_>,
        id: HeapIdentity,
    ) -> Result<LoadState, HeapError>;

    /// Class shape
    fn read_kind(&self, scope: &HeapEntryScope<'_>, id: HeapIdentity) -> Result<ClassKind, HeapError>;

    /// Packed layout helper
    fn read_layout(
        &self,
        scope: &HeapEntryScope<'_>,
        id: HeapIdentity,
    ) -> Result<LayoutDescriptor, HeapError>;

    /// Supertype display and secondary supers (loaded classes only)
    fn read_hierarchy(
        &self,
        scope: &HeapEntryScope<'_>,
        id: HeapIdentity,
    ) -> Result<HierarchyRecord, HeapError>;

    /// Access and modifier flags
    fn read_flags(&self, scope: &HeapEntryScope<'_>, id: HeapIdentity) -> Result<ClassFlags, HeapError>;

    /// Prototype mark word for new instances
    fn read_prototype_header(
        &self,
        scope: &HeapEntryScope<'_>,
        id: HeapIdentity,
    ) -> Result<u64, HeapError>;

    /// Defining loader
    fn read_loader(&self, scope: &HeapEntryScope<'_>, id: HeapIdentity) -> Result<LoaderId, HeapError>;

    /// Look a name up through `loader` (with delegation)
    fn find_by_name_and_loader(
        &self,
        scope: &HeapEntryScope<'_>,
        loader: LoaderId,
        name: &str,
    ) -> Result<Option<HeapIdentity>, HeapError>;
}
