//! Retry building blocks.
//!
//! - [`ReadRetryPolicy`] - How long to keep looking for a contact that is not visible yet
//! - [`SessionRetry`] - Runs a [`UnitOfWork`] in a fresh session, retrying transient failures
//! - [`cancellable`] - Races a store call against a [`CancellationToken`]

pub mod policy;
pub mod session_retry;

pub use policy::*;
pub use session_retry::*;

use crate::store::StoreError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Awaits `future` unless `token` is cancelled first.
///
/// An already cancelled token wins without polling `future`.
pub async fn cancellable<T>(
    token: &CancellationToken,
    future: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(StoreError::Cancelled),
        result = future => result,
    }
}

/// Sleeps for `delay`, returning early with [`StoreError::Cancelled`].
pub async fn cancellable_sleep(token: &CancellationToken, delay: Duration) -> Result<(), StoreError> {
    cancellable(token, async {
        tokio::time::sleep(delay).await;
        Ok(())
    })
    .await
}
