//! # Session Retry
//!
//! Runs a [`UnitOfWork`] inside a store session and runs it again, in a fresh
//! session, when it fails with a transient [`StoreError`]. The unit of work
//! itself never sees the retry budget or the backoff curve.

use super::cancellable_sleep;
use super::policy::SessionRetryPolicy;
use crate::store::{SessionFactory, StoreError, StoreSession};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A block of reads and writes performed against one session.
#[async_trait]
pub trait UnitOfWork<S: StoreSession>: Send + Sync {
    type Output: Send;

    async fn run(&self, session: &mut S) -> Result<Self::Output, StoreError>;
}

/// Opens sessions from `F` and retries whole units of work on transient errors.
pub struct SessionRetry<F> {
    factory: F,
    policy: SessionRetryPolicy,
    cancellation: CancellationToken,
}

impl<F: SessionFactory> SessionRetry<F> {
    pub fn new(factory: F, policy: SessionRetryPolicy, cancellation: CancellationToken) -> Self {
        Self {
            factory,
            policy,
            cancellation,
        }
    }

    /// Runs `work` until it succeeds, fails for good, or the budget is spent.
    ///
    /// A failure after earlier transient failures, and running out of attempts,
    /// both report every attempt's error as [`StoreError::Aggregate`].
    /// [`StoreError::Cancelled`] is returned as is and never retried.
    pub async fn request_with_retry<W>(&self, work: &W) -> Result<W::Output, StoreError>
    where
        W: UnitOfWork<F::Session>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut failures = Vec::new();
        let mut attempt = 0;

        loop {
            if self.cancellation.is_cancelled() {
                return Err(StoreError::Cancelled);
            }
            attempt += 1;

            let mut session = self.factory.open();
            let error = match work.run(&mut session).await {
                Ok(output) => {
                    if attempt > 1 {
                        info!(attempt, "Unit of work succeeded after retry");
                    }
                    return Ok(output);
                }
                Err(StoreError::Cancelled) => return Err(StoreError::Cancelled),
                Err(error) => error,
            };

            if !error.is_transient() || attempt >= max_attempts {
                if failures.is_empty() {
                    return Err(error);
                }
                failures.push(error);
                return Err(StoreError::Aggregate(failures));
            }

            let delay = self.policy.delay_for_attempt(attempt);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Unit of work failed, retrying"
            );
            failures.push(error);
            cancellable_sleep(&self.cancellation, delay).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Contact, ContactIdentifier, EmailAddressList, FacetKey};
    use crate::retry::BackoffStrategy;
    use crate::store::mock::MockStore;
    use std::time::Duration;

    struct ClearEmails(ContactIdentifier);

    #[async_trait]
    impl<S: StoreSession> UnitOfWork<S> for ClearEmails {
        type Output = bool;

        async fn run(&self, session: &mut S) -> Result<bool, StoreError> {
            let Some(contact) = session.get_contact(&self.0, &[FacetKey::Emails]).await? else {
                return Ok(false);
            };
            session.set_emails(&contact, EmailAddressList::default());
            session.submit().await?;
            Ok(true)
        }
    }

    fn policy(max_attempts: u32) -> SessionRetryPolicy {
        SessionRetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            backoff_strategy: BackoffStrategy::Exponential,
        }
    }

    fn unavailable() -> StoreError {
        StoreError::Unavailable("node down".into())
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_rerun_whole_unit() {
        let alice = ContactIdentifier::new("exm", "alice");
        let mut mock = MockStore::new();
        mock.expect_fetch(alice.clone())
            .return_ok(Some(Contact::new(alice.clone())));
        mock.expect_commit().return_err(unavailable());
        mock.expect_fetch(alice.clone())
            .return_ok(Some(Contact::new(alice.clone())));
        mock.expect_commit().return_ok();

        let retry = SessionRetry::new(mock.client(), policy(3), CancellationToken::new());
        let result = retry.request_with_retry(&ClearEmails(alice)).await;

        assert_eq!(result, Ok(true));
        mock.verify();
        assert_eq!(mock.fetch_count(), 2);
        // Each attempt commits only what it staged itself.
        assert!(mock.committed().iter().all(|batch| batch.len() == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_aggregates_every_attempt() {
        let alice = ContactIdentifier::new("exm", "alice");
        let mut mock = MockStore::new();
        for _ in 0..3 {
            mock.expect_fetch(alice.clone()).return_err(unavailable());
        }

        let retry = SessionRetry::new(mock.client(), policy(3), CancellationToken::new());
        let result = retry.request_with_retry(&ClearEmails(alice)).await;

        assert_eq!(
            result,
            Err(StoreError::Aggregate(vec![unavailable(), unavailable(), unavailable()]))
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let alice = ContactIdentifier::new("exm", "alice");
        let mut mock = MockStore::new();
        mock.expect_fetch(alice.clone())
            .return_ok(Some(Contact::new(alice.clone())));
        mock.expect_commit()
            .return_err(StoreError::NotFound(alice.clone()));

        let retry = SessionRetry::new(mock.client(), policy(5), CancellationToken::new());
        let result = retry.request_with_retry(&ClearEmails(alice.clone())).await;

        assert_eq!(result, Err(StoreError::NotFound(alice)));
        mock.verify();
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_after_transient_keeps_history() {
        let alice = ContactIdentifier::new("exm", "alice");
        let mut mock = MockStore::new();
        mock.expect_fetch(alice.clone()).return_err(unavailable());
        mock.expect_fetch(alice.clone()).return_err(StoreError::Closed);

        let retry = SessionRetry::new(mock.client(), policy(5), CancellationToken::new());
        let result = retry.request_with_retry(&ClearEmails(alice)).await;

        assert_eq!(
            result,
            Err(StoreError::Aggregate(vec![unavailable(), StoreError::Closed]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff() {
        let alice = ContactIdentifier::new("exm", "alice");
        let mut mock = MockStore::new();
        mock.expect_fetch(alice.clone()).return_err(unavailable());

        let token = CancellationToken::new();
        let retry = SessionRetry::new(mock.client(), policy(5), token.clone());

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = retry.request_with_retry(&ClearEmails(alice)).await;
        assert_eq!(result, Err(StoreError::Cancelled));
        mock.verify();
        assert_eq!(mock.fetch_count(), 1);
    }
}
