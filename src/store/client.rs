//! # Store Client
//!
//! Cheap-to-clone handle for sending [`StoreRequest`]s and awaiting their
//! replies.

use super::error::StoreError;
use super::message::{Operation, StoreRequest};
use crate::model::{Contact, ContactIdentifier, FacetKey};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// A type-safe client for a contact store.
///
/// Holds only a sender, so clones share the same store. When a timeout is set,
/// every call that takes longer fails with [`StoreError::Timeout`].
#[derive(Clone, Debug)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
    timeout: Option<Duration>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self {
            sender,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn fetch(
        &self,
        identifier: ContactIdentifier,
        facets: Vec<FacetKey>,
    ) -> Result<Option<Contact>, StoreError> {
        self.request(|respond_to| StoreRequest::Fetch {
            identifier,
            facets,
            respond_to,
        })
        .await
    }

    pub async fn commit(&self, operations: Vec<Operation>) -> Result<(), StoreError> {
        self.request(|respond_to| StoreRequest::Commit {
            operations,
            respond_to,
        })
        .await
    }

    pub async fn upsert(&self, contact: Contact) -> Result<u64, StoreError> {
        self.request(|respond_to| StoreRequest::Upsert {
            contact,
            respond_to,
        })
        .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, StoreError>>) -> StoreRequest,
    ) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        let exchange = async {
            self.sender
                .send(build(respond_to))
                .await
                .map_err(|_| StoreError::Closed)?;
            response.await.map_err(|_| StoreError::Dropped)?
        };
        with_timeout(self.timeout, exchange).await
    }
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    future: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| StoreError::Timeout(limit))?,
        None => future.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_store() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let client = StoreClient::new(sender);

        let result = client.fetch(ContactIdentifier::new("exm", "alice"), vec![]).await;
        assert_eq!(result, Err(StoreError::Closed));
    }

    #[tokio::test]
    async fn test_dropped_response() {
        let (sender, mut receiver) = mpsc::channel(1);
        let client = StoreClient::new(sender);

        tokio::spawn(async move {
            // Receive and drop the request without answering it.
            let _ = receiver.recv().await;
        });

        let result = client.commit(vec![]).await;
        assert_eq!(result, Err(StoreError::Dropped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let (sender, mut receiver) = mpsc::channel(1);
        let client = StoreClient::new(sender).with_timeout(Some(Duration::from_millis(50)));

        let _server = tokio::spawn(async move {
            // Hold the request forever.
            let held = receiver.recv().await;
            std::future::pending::<()>().await;
            drop(held);
        });

        let result = client.upsert(Contact::new(ContactIdentifier::new("exm", "a"))).await;
        assert_eq!(result, Err(StoreError::Timeout(Duration::from_millis(50))));
    }
}
