//! Error types for event processors.

use crate::model::ContactIdentifier;
use crate::store::StoreError;
use thiserror::Error;

/// Errors a processor reports back to the pipeline.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProcessError {
    /// The event arguments carry no email open.
    #[error("Email open missing from event arguments")]
    MissingEmailOpen,

    /// The email open names a contact that cannot be looked up.
    #[error("Invalid contact identifier: {0}")]
    InvalidIdentifier(ContactIdentifier),

    /// Processing was aborted through the pipeline's cancellation token.
    #[error("Processing cancelled")]
    Cancelled,

    /// Reading or writing the contact failed.
    #[error("Email bounce count not reset for {details}")]
    Store {
        details: String,
        #[source]
        source: StoreError,
    },
}
