//! Error types for the type oracle
//!
//! Precondition violations are caller bugs and abort the compilation task.
//! `NotFound` is an ordinary outcome of a name lookup. Heap-boundary
//! failures are fatal to the task that owns the oracle.

use crate::heap::HeapIdentity;
use std::time::Duration;
use thiserror::Error;

/// Failures crossing into the heap-protected region
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HeapError {
    /// The gate was shut down (VM exit)
    #[error("Heap gate is shut down")]
    ShutDown,

    /// Scope acquisition did not complete within the configured bound
    #[error("Timed out after {waited:?} waiting to enter the heap")]
    Timeout {
        /// How long the caller waited
        waited: Duration,
    },

    /// The store has no object with this identity (stale or foreign token)
    #[error("Unknown heap identity: {0}")]
    UnknownIdentity(HeapIdentity),

    /// The store reported a hierarchy that contains a cycle or a malformed display
    #[error("Malformed class hierarchy for {name}")]
    CyclicHierarchy {
        /// Internal name of the offending class
        name: String,
    },

    /// Any other store-side failure
    #[error("Metadata store failure: {0}")]
    StoreFailure(String),
}

/// Errors produced by oracle queries
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// A contract breach by the caller, e.g. a loaded-only query on an unloaded handle
    #[error("Precondition violated in {operation}: {detail}")]
    PreconditionViolated {
        /// Operation that was invoked
        operation: &'static str,
        /// What was wrong
        detail: String,
    },

    /// A name lookup found no type through the given loader
    #[error("Type not found: {name}")]
    NotFound {
        /// Internal name that was looked up
        name: String,
    },

    /// The oracle's arena is full
    #[error("Type oracle exhausted its arena ({limit} handles)")]
    ResourceExhausted {
        /// Configured handle limit
        limit: usize,
    },

    /// Failure at the heap boundary
    #[error(transparent)]
    Heap(#[from] HeapError),
}

impl OracleError {
    pub(crate) fn precondition(operation: &'static str, detail: impl Into<String>) -> Self {
        OracleError::PreconditionViolated {
            operation,
            detail: detail.into(),
        }
    }

    /// Whether the caller can reasonably continue the compilation
    ///
    /// Only `NotFound` is recoverable; callers usually treat the reference
    /// as unresolved.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, OracleError::NotFound { .. })
    }
}

/// Result type for oracle operations
pub type OracleResult<T> = Result<T, OracleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_not_found_is_recoverable() {
        assert!(OracleError::NotFound { name: "a/B".into() }.is_recoverable());
        assert!(!OracleError::precondition("is_subtype_of", "unloaded").is_recoverable());
        assert!(!OracleError::ResourceExhausted { limit: 4 }.is_recoverable());
        assert!(!OracleError::Heap(HeapError::ShutDown).is_recoverable());
    }

    #[test]
    fn test_heap_error_converts() {
        let err: OracleError = HeapError::ShutDown.into();
        assert_eq!(err, OracleError::Heap(HeapError::ShutDown));
        assert_eq!(err.to_string(), "Heap gate is shut down");
    }

    #[test]
    fn test_precondition_message() {
        let err = OracleError::precondition("super_of_depth", "com/example/Foo is not loaded");
        assert_eq!(
            err.to_string(),
            "Precondition violated in super_of_depth: com/example/Foo is not loaded"
        );
    }
}
