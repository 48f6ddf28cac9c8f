//! # Store Sessions
//!
//! A session is the store's unit of work: reads go straight to the store, writes
//! are staged locally and only reach the store when [`StoreSession::submit`] is
//! called. A submit applies every staged write or none of them.
//!
//! Sessions are opened by a [`SessionFactory`]. The session retry wrapper opens a
//! fresh session for every attempt, so nothing staged by a failed attempt leaks
//! into the next one.

use super::client::StoreClient;
use super::error::StoreError;
use super::message::Operation;
use crate::model::{Contact, ContactIdentifier, EmailAddressList, FacetKey};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// The operations a unit of work may perform against the store.
#[async_trait]
pub trait StoreSession: Send {
    /// Reads a contact, projecting only the requested facets.
    ///
    /// `Ok(None)` means the store does not (yet) know the contact.
    async fn get_contact(
        &mut self,
        identifier: &ContactIdentifier,
        facets: &[FacetKey],
    ) -> Result<Option<Contact>, StoreError>;

    /// Stages a replacement of the contact's email facet.
    fn set_emails(&mut self, contact: &Contact, emails: EmailAddressList);

    /// Sends every staged write to the store in one batch.
    async fn submit(&mut self) -> Result<(), StoreError>;
}

/// Opens sessions against a store.
pub trait SessionFactory: Send + Sync {
    type Session: StoreSession;

    fn open(&self) -> Self::Session;
}

/// A [`StoreSession`] backed by a [`StoreClient`].
#[derive(Debug)]
pub struct ClientSession {
    client: StoreClient,
    staged: Vec<Operation>,
}

impl ClientSession {
    pub fn new(client: StoreClient) -> Self {
        Self {
            client,
            staged: Vec::new(),
        }
    }

    /// Operations waiting for the next submit.
    pub fn staged(&self) -> &[Operation] {
        &self.staged
    }
}

#[async_trait]
impl StoreSession for ClientSession {
    #[instrument(skip(self))]
    async fn get_contact(
        &mut self,
        identifier: &ContactIdentifier,
        facets: &[FacetKey],
    ) -> Result<Option<Contact>, StoreError> {
        debug!("Sending request");
        self.client.fetch(identifier.clone(), facets.to_vec()).await
    }

    fn set_emails(&mut self, contact: &Contact, emails: EmailAddressList) {
        // A later write to the same contact replaces the earlier one.
        self.staged
            .retain(|operation| operation.identifier() != &contact.identifier);
        self.staged.push(Operation::SetEmails {
            identifier: contact.identifier.clone(),
            expected_version: contact.version,
            emails,
        });
    }

    #[instrument(skip(self))]
    async fn submit(&mut self) -> Result<(), StoreError> {
        if self.staged.is_empty() {
            return Ok(());
        }
        debug!(staged = self.staged.len(), "Sending request");
        self.client.commit(self.staged.clone()).await?;
        self.staged.clear();
        Ok(())
    }
}

impl SessionFactory for StoreClient {
    type Session = ClientSession;

    fn open(&self) -> ClientSession {
        ClientSession::new(self.clone())
    }
}
