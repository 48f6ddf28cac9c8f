//! # In-Memory Contact Store
//!
//! [`ContactStore`] is an eventually consistent contact store served by a single
//! Tokio task. It processes [`StoreRequest`]s sequentially, so its state needs no
//! locks.
//!
//! ## Read-after-write lag
//!
//! An upsert does not become visible to fetches immediately: it is parked as a
//! *pending* version until the configured replication lag has elapsed. A fetch
//! issued inside that window still sees the previous version, or nothing at all
//! for a brand new contact. Commits always validate against the latest version,
//! pending or not, so a write computed from a stale read is rejected with
//! [`StoreError::Conflict`].

use super::client::StoreClient;
use super::error::StoreError;
use super::message::{Operation, StoreRequest};
use crate::model::{Contact, ContactIdentifier, FacetKey};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Construction options for a [`ContactStore`] and its client.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    /// Capacity of the request channel.
    pub buffer_size: usize,
    /// Delay before an upsert becomes visible to fetches.
    pub replication_lag: Duration,
    /// Upper bound for a single client call. `None` waits indefinitely.
    pub operation_timeout: Option<Duration>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            buffer_size: 32,
            replication_lag: Duration::ZERO,
            operation_timeout: None,
        }
    }
}

#[derive(Debug, Default)]
struct Entry {
    visible: Option<Contact>,
    pending: Option<(Contact, Instant)>,
}

impl Entry {
    fn promote(&mut self, now: Instant) {
        if matches!(&self.pending, Some((_, due)) if *due <= now) {
            self.visible = self.pending.take().map(|(contact, _)| contact);
        }
    }

    fn latest(&self) -> Option<&Contact> {
        self.pending
            .as_ref()
            .map(|(contact, _)| contact)
            .or(self.visible.as_ref())
    }

    fn latest_mut(&mut self) -> Option<&mut Contact> {
        match self.pending.as_mut() {
            Some((contact, _)) => Some(contact),
            None => self.visible.as_mut(),
        }
    }
}

/// The store server. Owns every contact and the receiving end of the channel.
pub struct ContactStore {
    receiver: mpsc::Receiver<StoreRequest>,
    contacts: HashMap<ContactIdentifier, Entry>,
    replication_lag: Duration,
}

impl ContactStore {
    /// Creates the store and a client connected to it.
    ///
    /// The store does nothing until [`ContactStore::run`] is spawned.
    pub fn new(options: &StoreOptions) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(options.buffer_size.max(1));
        let store = Self {
            receiver,
            contacts: HashMap::new(),
            replication_lag: options.replication_lag,
        };
        let client = StoreClient::new(sender).with_timeout(options.operation_timeout);
        (store, client)
    }

    /// Serves requests until every client has been dropped.
    pub async fn run(mut self) {
        info!(lag_ms = self.replication_lag.as_millis() as u64, "Store started");

        while let Some(request) = self.receiver.recv().await {
            match request {
                StoreRequest::Fetch {
                    identifier,
                    facets,
                    respond_to,
                } => {
                    let contact = self.fetch(&identifier, &facets);
                    debug!(%identifier, ?facets, found = contact.is_some(), "Fetch");
                    let _ = respond_to.send(Ok(contact));
                }
                StoreRequest::Commit {
                    operations,
                    respond_to,
                } => {
                    debug!(operations = operations.len(), "Commit");
                    let result = self.commit(operations);
                    match &result {
                        Ok(()) => info!(size = self.contacts.len(), "Committed"),
                        Err(e) => warn!(error = %e, "Commit rejected"),
                    }
                    let _ = respond_to.send(result);
                }
                StoreRequest::Upsert {
                    contact,
                    respond_to,
                } => {
                    let identifier = contact.identifier.clone();
                    let version = self.upsert(contact);
                    info!(%identifier, version, size = self.contacts.len(), "Upserted");
                    let _ = respond_to.send(Ok(version));
                }
            }
        }

        info!(size = self.contacts.len(), "Shutdown");
    }

    fn fetch(&mut self, identifier: &ContactIdentifier, facets: &[FacetKey]) -> Option<Contact> {
        let entry = self.contacts.get_mut(identifier)?;
        entry.promote(Instant::now());
        entry.visible.as_ref().map(|contact| contact.project(facets))
    }

    fn upsert(&mut self, mut contact: Contact) -> u64 {
        let entry = self.contacts.entry(contact.identifier.clone()).or_default();
        let now = Instant::now();
        entry.promote(now);
        contact.version = entry.latest().map_or(1, |latest| latest.version + 1);
        let version = contact.version;

        if self.replication_lag.is_zero() {
            entry.pending = None;
            entry.visible = Some(contact);
        } else {
            entry.pending = Some((contact, now + self.replication_lag));
        }
        version
    }

    fn commit(&mut self, operations: Vec<Operation>) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut staged: HashMap<ContactIdentifier, Contact> = HashMap::new();
        let mut errors = Vec::new();

        // Validate the whole batch against a working copy before touching state.
        for operation in &operations {
            let identifier = operation.identifier();
            let current = match staged.get(identifier) {
                Some(contact) => Some(contact.clone()),
                None => self.contacts.get_mut(identifier).and_then(|entry| {
                    entry.promote(now);
                    entry.latest().cloned()
                }),
            };
            let Some(mut current) = current else {
                errors.push(StoreError::NotFound(identifier.clone()));
                continue;
            };

            match operation {
                Operation::SetEmails {
                    expected_version,
                    emails,
                    ..
                } => {
                    if current.version != *expected_version {
                        errors.push(StoreError::Conflict {
                            identifier: identifier.clone(),
                            expected: *expected_version,
                            found: current.version,
                        });
                        continue;
                    }
                    current.emails = Some(emails.clone());
                    current.version += 1;
                }
            }
            staged.insert(identifier.clone(), current);
        }

        if !errors.is_empty() {
            return Err(StoreError::aggregate(errors));
        }

        for (identifier, contact) in staged {
            if let Some(latest) = self
                .contacts
                .get_mut(&identifier)
                .and_then(Entry::latest_mut)
            {
                *latest = contact;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EmailAddress, EmailAddressList};

    fn alice() -> Contact {
        Contact::new(ContactIdentifier::new("exm", "alice")).with_emails(EmailAddressList::new(
            "work",
            EmailAddress::new("alice@example.com").with_bounce_count(2),
        ))
    }

    fn spawn(lag: Duration) -> StoreClient {
        let options = StoreOptions {
            replication_lag: lag,
            ..StoreOptions::default()
        };
        let (store, client) = ContactStore::new(&options);
        tokio::spawn(store.run());
        client
    }

    #[tokio::test]
    async fn test_upsert_then_fetch_without_lag() {
        let client = spawn(Duration::ZERO);
        let version = client.upsert(alice()).await.unwrap();
        assert_eq!(version, 1);

        let fetched = client
            .fetch(alice().identifier, vec![FacetKey::Emails])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.version, 1);
        assert!(fetched.emails().is_some());

        let bare = client.fetch(alice().identifier, vec![]).await.unwrap().unwrap();
        assert!(bare.emails().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upsert_is_invisible_until_lag_elapses() {
        let client = spawn(Duration::from_millis(500));
        client.upsert(alice()).await.unwrap();

        let early = client.fetch(alice().identifier, vec![]).await.unwrap();
        assert!(early.is_none());

        tokio::time::sleep(Duration::from_millis(500)).await;
        let late = client.fetch(alice().identifier, vec![]).await.unwrap();
        assert_eq!(late.map(|c| c.version), Some(1));
    }

    #[tokio::test]
    async fn test_commit_bumps_version_and_rejects_stale_writes() {
        let client = spawn(Duration::ZERO);
        client.upsert(alice()).await.unwrap();

        let emails = EmailAddressList::new("work", EmailAddress::new("alice@example.com"));
        let write = Operation::SetEmails {
            identifier: alice().identifier,
            expected_version: 1,
            emails: emails.clone(),
        };
        client.commit(vec![write.clone()]).await.unwrap();

        let stored = client
            .fetch(alice().identifier, vec![FacetKey::Emails])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.emails, Some(emails));

        let stale = client.commit(vec![write]).await;
        assert_eq!(
            stale,
            Err(StoreError::Conflict {
                identifier: alice().identifier,
                expected: 1,
                found: 2,
            })
        );
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let client = spawn(Duration::ZERO);
        client.upsert(alice()).await.unwrap();

        let good = Operation::SetEmails {
            identifier: alice().identifier,
            expected_version: 1,
            emails: EmailAddressList::default(),
        };
        let unknown = Operation::SetEmails {
            identifier: ContactIdentifier::new("exm", "ghost"),
            expected_version: 1,
            emails: EmailAddressList::default(),
        };
        let result = client.commit(vec![good, unknown]).await;
        assert_eq!(
            result,
            Err(StoreError::NotFound(ContactIdentifier::new("exm", "ghost")))
        );

        let untouched = client
            .fetch(alice().identifier, vec![FacetKey::Emails])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.version, 1);
        assert_eq!(untouched.emails, alice().emails);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_against_pending_version_conflicts() {
        let client = spawn(Duration::from_millis(100));
        client.upsert(alice()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // A second write is still replicating; a read sees version 1.
        client.upsert(alice()).await.unwrap();
        let seen = client.fetch(alice().identifier, vec![]).await.unwrap().unwrap();
        assert_eq!(seen.version, 1);

        let result = client
            .commit(vec![Operation::SetEmails {
                identifier: alice().identifier,
                expected_version: seen.version,
                emails: EmailAddressList::default(),
            }])
            .await;
        assert!(matches!(result, Err(StoreError::Conflict { found: 2, .. })));
    }
}
