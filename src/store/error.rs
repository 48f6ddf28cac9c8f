//! # Store Errors
//!
//! Every failure the contact store, its client or a session can report. The
//! session retry wrapper relies on [`StoreError::is_transient`] to decide whether
//! a whole unit of work is worth running again.

use std::time::Duration;

use crate::model::ContactIdentifier;

/// Errors that can occur while talking to the contact store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The store could not serve the request right now.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store closed")]
    Closed,
    #[error("Store dropped response channel")]
    Dropped,
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),
    /// A write was based on a snapshot that is no longer the latest.
    #[error("Version conflict on {identifier}: expected {expected}, found {found}")]
    Conflict {
        identifier: ContactIdentifier,
        expected: u64,
        found: u64,
    },
    /// A write targeted a contact the store does not know.
    #[error("Contact not found: {0}")]
    NotFound(ContactIdentifier),
    #[error("Operation cancelled")]
    Cancelled,
    /// Several failures reported together, e.g. every attempt of a retried
    /// unit of work or every rejected operation of one commit.
    #[error("{} store failure(s): {}", .0.len(), join(.0))]
    Aggregate(Vec<StoreError>),
}

impl StoreError {
    /// Whether running the same unit of work again may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_)
            | StoreError::Dropped
            | StoreError::Timeout(_)
            | StoreError::Conflict { .. } => true,
            StoreError::Aggregate(errors) => {
                !errors.is_empty() && errors.iter().all(StoreError::is_transient)
            }
            StoreError::Closed | StoreError::NotFound(_) | StoreError::Cancelled => false,
        }
    }

    /// Wraps several errors, collapsing a single one into itself.
    pub fn aggregate(mut errors: Vec<StoreError>) -> StoreError {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            StoreError::Aggregate(errors)
        }
    }

    /// The individual failures carried by this error.
    pub fn inner_errors(&self) -> &[StoreError] {
        match self {
            StoreError::Aggregate(errors) => errors,
            other => std::slice::from_ref(other),
        }
    }
}

fn join(errors: &[StoreError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
