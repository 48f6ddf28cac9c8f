//! # Mock Store
//!
//! [`MockStore`] answers the real store protocol from a queue of expectations,
//! so anything built on a [`StoreClient`] (sessions, the retrying reader, the
//! processors) can be tested without a running [`ContactStore`](super::ContactStore).
//!
//! | | MockStore | ContactStore |
//! |---|---|---|
//! | **State** | None, replies are scripted | Real contacts, versions and lag |
//! | **Error injection** | `return_err` | Only conflicts and unknown contacts |
//! | **Use case** | Retry and failure paths, call counting | End-to-end flows |
//!
//! ```rust
//! use bounce_reset::model::{Contact, ContactIdentifier};
//! use bounce_reset::store::{mock::MockStore, StoreError};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockStore::new();
//!     let alice = ContactIdentifier::new("exm", "alice");
//!
//!     mock.expect_fetch(alice.clone()).return_ok(None);
//!     mock.expect_fetch(alice.clone()).return_ok(Some(Contact::new(alice.clone())));
//!     mock.expect_commit().return_err(StoreError::Unavailable("node down".into()));
//!
//!     let client = mock.client();
//!     assert_eq!(client.fetch(alice.clone(), vec![]).await, Ok(None));
//!     assert!(client.fetch(alice, vec![]).await.unwrap().is_some());
//!     assert!(client.commit(vec![]).await.is_err());
//!
//!     mock.verify();
//!     assert_eq!(mock.fetch_count(), 2);
//!     assert_eq!(mock.commit_count(), 1);
//! }
//! ```
//!
//! A request that does not match the next expectation panics the mock's task.
//! The caller then sees [`StoreError::Dropped`] or [`StoreError::Closed`], and
//! [`MockStore::verify`] reports the mismatch.

use super::client::StoreClient;
use super::error::StoreError;
use super::message::{Operation, StoreRequest};
use crate::model::{Contact, ContactIdentifier};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

enum Expectation {
    Fetch {
        identifier: ContactIdentifier,
        response: Result<Option<Contact>, StoreError>,
    },
    Commit {
        response: Result<(), StoreError>,
    },
}

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    fetches: usize,
    commits: Vec<Vec<Operation>>,
    mismatch: Option<String>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A scripted store with expectation tracking.
pub struct MockStore {
    client: StoreClient,
    state: Arc<Mutex<MockState>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Creates a mock with no expectations. Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<StoreRequest>(100);
        let state = Arc::new(Mutex::new(MockState::default()));
        let state_clone = state.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let mut guard = lock(&state_clone);
                match &request {
                    StoreRequest::Fetch { .. } => guard.fetches += 1,
                    StoreRequest::Commit { operations, .. } => {
                        guard.commits.push(operations.clone())
                    }
                    StoreRequest::Upsert { .. } => {}
                }
                let expectation = guard.expectations.pop_front();
                drop(guard);

                match (request, expectation) {
                    (
                        StoreRequest::Fetch {
                            identifier,
                            respond_to,
                            ..
                        },
                        Some(Expectation::Fetch {
                            identifier: expected,
                            response,
                        }),
                    ) if identifier == expected => {
                        let _ = respond_to.send(response);
                    }
                    (StoreRequest::Commit { respond_to, .. }, Some(Expectation::Commit { response })) => {
                        let _ = respond_to.send(response);
                    }
                    (request, _) => {
                        let message = format!("Unexpected request or expectation mismatch: {:?}", request);
                        lock(&state_clone).mismatch = Some(message.clone());
                        panic!("{}", message);
                    }
                }
            }
        });

        Self {
            client: StoreClient::new(sender),
            state,
            _handle: handle,
        }
    }

    /// Returns a client wired to this mock.
    pub fn client(&self) -> StoreClient {
        self.client.clone()
    }

    /// Expects a fetch of `identifier`.
    pub fn expect_fetch(&mut self, identifier: ContactIdentifier) -> FetchExpectationBuilder {
        FetchExpectationBuilder {
            identifier,
            state: self.state.clone(),
        }
    }

    /// Expects a commit.
    pub fn expect_commit(&mut self) -> CommitExpectationBuilder {
        CommitExpectationBuilder {
            state: self.state.clone(),
        }
    }

    /// Number of fetch requests received.
    pub fn fetch_count(&self) -> usize {
        lock(&self.state).fetches
    }

    /// Number of commit requests received.
    pub fn commit_count(&self) -> usize {
        lock(&self.state).commits.len()
    }

    /// Operation batches of every commit received, in order.
    pub fn committed(&self) -> Vec<Vec<Operation>> {
        lock(&self.state).commits.clone()
    }

    /// Verifies that every expectation was consumed and no request was unexpected.
    pub fn verify(&self) {
        let state = lock(&self.state);
        if let Some(mismatch) = &state.mismatch {
            panic!("{}", mismatch);
        }
        if !state.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                state.expectations.len()
            );
        }
    }
}

/// Builder for fetch expectations.
pub struct FetchExpectationBuilder {
    identifier: ContactIdentifier,
    state: Arc<Mutex<MockState>>,
}

impl FetchExpectationBuilder {
    pub fn return_ok(self, contact: Option<Contact>) {
        self.push(Ok(contact));
    }

    pub fn return_err(self, error: StoreError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Option<Contact>, StoreError>) {
        lock(&self.state).expectations.push_back(Expectation::Fetch {
            identifier: self.identifier,
            response,
        });
    }
}

/// Builder for commit expectations.
pub struct CommitExpectationBuilder {
    state: Arc<Mutex<MockState>>,
}

impl CommitExpectationBuilder {
    pub fn return_ok(self) {
        lock(&self.state)
            .expectations
            .push_back(Expectation::Commit { response: Ok(()) });
    }

    pub fn return_err(self, error: StoreError) {
        lock(&self.state)
            .expectations
            .push_back(Expectation::Commit {
                response: Err(error),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_expectations_in_order() {
        let mut mock = MockStore::new();
        let alice = ContactIdentifier::new("exm", "alice");
        mock.expect_fetch(alice.clone()).return_ok(None);
        mock.expect_commit().return_ok();

        let client = mock.client();
        assert_eq!(client.fetch(alice, vec![]).await, Ok(None));
        assert_eq!(client.commit(vec![]).await, Ok(()));

        mock.verify();
        assert_eq!(mock.committed(), vec![Vec::<Operation>::new()]);
    }

    #[tokio::test]
    async fn test_unexpected_request_is_reported() {
        let mock = MockStore::new();
        let result = mock.client().commit(vec![]).await;
        assert_eq!(result, Err(StoreError::Dropped));
        assert_eq!(mock.commit_count(), 1);

        let verified = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| mock.verify()));
        assert!(verified.is_err());
    }
}
