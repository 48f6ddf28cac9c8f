use crate::model::{Contact, ContactIdentifier, FacetKey};
use crate::retry::{cancellable, cancellable_sleep, ReadRetryPolicy};
use crate::store::{StoreError, StoreSession};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Reads contacts that may not have replicated yet.
///
/// A contact the store does not return is looked up again after the policy's
/// delay, until the attempt budget is spent. Store errors are not retried
/// here; they belong to the session retry wrapper.
#[derive(Clone, Debug)]
pub struct ContactService {
    policy: ReadRetryPolicy,
    cancellation: CancellationToken,
}

impl ContactService {
    pub fn new(policy: ReadRetryPolicy, cancellation: CancellationToken) -> Self {
        Self {
            policy,
            cancellation,
        }
    }

    /// Fetches `identifier` through `session`, retrying while it is not found.
    ///
    /// Returns `Ok(None)` once every attempt came back empty.
    #[instrument(skip(self, session), fields(identifier = %identifier))]
    pub async fn get_contact_with_retry<S: StoreSession>(
        &self,
        session: &mut S,
        identifier: &ContactIdentifier,
        facets: &[FacetKey],
    ) -> Result<Option<Contact>, StoreError> {
        let max_attempts = self.policy.max_attempts();

        for attempt in 1..=max_attempts {
            let fetched = cancellable(
                &self.cancellation,
                session.get_contact(identifier, facets),
            )
            .await?;

            if let Some(contact) = fetched {
                return Ok(Some(contact));
            }
            debug!(attempt, max_attempts, "Contact not visible yet");

            if attempt < max_attempts && !self.policy.delay().is_zero() {
                cancellable_sleep(&self.cancellation, self.policy.delay()).await?;
            }
        }

        Ok(None)
    }
}
