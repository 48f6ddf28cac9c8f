//! # Store Messages
//!
//! The request protocol spoken between a [`StoreClient`](super::StoreClient) and
//! whatever serves it: the in-memory [`ContactStore`](super::ContactStore) in
//! production wiring, or a [`MockStore`](super::mock::MockStore) in tests.

use super::error::StoreError;
use crate::model::{Contact, ContactIdentifier, EmailAddressList, FacetKey};
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the store.
pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

/// A write staged by a session and applied by the store on commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Replace the email facet of a contact.
    ///
    /// `expected_version` is the version of the snapshot the new facet was
    /// computed from.
    SetEmails {
        identifier: ContactIdentifier,
        expected_version: u64,
        emails: EmailAddressList,
    },
}

impl Operation {
    pub fn identifier(&self) -> &ContactIdentifier {
        match self {
            Operation::SetEmails { identifier, .. } => identifier,
        }
    }
}

/// Requests understood by the store.
#[derive(Debug)]
pub enum StoreRequest {
    /// Read a contact, projecting only the listed facets.
    Fetch {
        identifier: ContactIdentifier,
        facets: Vec<FacetKey>,
        respond_to: Response<Option<Contact>>,
    },
    /// Apply a batch of operations, all or nothing.
    Commit {
        operations: Vec<Operation>,
        respond_to: Response<()>,
    },
    /// Create or replace a contact. Responds with the new version.
    Upsert {
        contact: Contact,
        respond_to: Response<u64>,
    },
}
