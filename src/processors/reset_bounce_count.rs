//! # Bounce Count Reset
//!
//! An opened email proves the contact's preferred address delivers mail, so its
//! bounce count goes back to zero.
//!
//! The read and the write run as one [`UnitOfWork`]:
//!
//! ```text
//! read (up to N lookups) ──► not found ──────────────► SkippedNoContact
//!          │
//!          └──► found ──► no usable preferred email ─► SkippedNoPreferredEmail
//!                   │
//!                   └──► reset + stage ──► submit ───► Updated
//!                                            │
//!                                            └──────► Err (logged, returned)
//! ```
//!
//! Transient store failures rerun the whole unit in a fresh session through
//! [`SessionRetry`]; a contact that is not visible yet is only looked up again,
//! through [`ContactService`].

use super::error::ProcessError;
use crate::clients::ContactService;
use crate::config::Config;
use crate::model::{ContactIdentifier, EmailOpenedArgs, FacetKey};
use crate::retry::{cancellable, SessionRetry, UnitOfWork};
use crate::store::{SessionFactory, StoreError, StoreSession};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// What processing an event amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The preferred address's bounce count was written back as zero.
    Updated,
    /// The contact never became visible within the read budget.
    SkippedNoContact,
    /// The contact has no preferred address with an SMTP address.
    SkippedNoPreferredEmail,
}

/// Resets the preferred email's bounce count of the contact that opened an email.
pub struct ResetContactEmailBounceCount<F> {
    contact_service: ContactService,
    session_retry: SessionRetry<F>,
    cancellation: CancellationToken,
}

impl<F: SessionFactory> ResetContactEmailBounceCount<F> {
    pub fn new(
        contact_service: ContactService,
        session_retry: SessionRetry<F>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            contact_service,
            session_retry,
            cancellation,
        }
    }

    /// Wires the reader and the session retry from `config`, sharing `cancellation`.
    pub fn with_config(factory: F, config: &Config, cancellation: CancellationToken) -> Self {
        let contact_service =
            ContactService::new(config.to_read_retry_policy(), cancellation.clone());
        let session_retry = SessionRetry::new(
            factory,
            config.to_session_retry_policy(),
            cancellation.clone(),
        );
        Self::new(contact_service, session_retry, cancellation)
    }

    /// Processes one email-opened event.
    ///
    /// Arguments without an email open, or with a blank contact identifier, are
    /// rejected before the store is touched.
    #[instrument(skip(self, args))]
    pub async fn process(&self, args: &EmailOpenedArgs) -> Result<Outcome, ProcessError> {
        let open = args
            .email_open
            .as_ref()
            .ok_or(ProcessError::MissingEmailOpen)?;
        if !open.contact_identifier.is_valid() {
            return Err(ProcessError::InvalidIdentifier(
                open.contact_identifier.clone(),
            ));
        }
        debug!(%args, "Processing");

        let work = ResetBounceCount {
            contact_service: &self.contact_service,
            cancellation: &self.cancellation,
            identifier: &open.contact_identifier,
            args,
        };

        match self.session_retry.request_with_retry(&work).await {
            Ok(outcome) => Ok(outcome),
            Err(StoreError::Cancelled) => Err(ProcessError::Cancelled),
            Err(source) => {
                let causes: Vec<String> =
                    source.inner_errors().iter().map(ToString::to_string).collect();
                error!(
                    error = %source,
                    ?causes,
                    details = %args,
                    "Email bounce count not reset"
                );
                Err(ProcessError::Store {
                    details: args.to_string(),
                    source,
                })
            }
        }
    }
}

struct ResetBounceCount<'a> {
    contact_service: &'a ContactService,
    cancellation: &'a CancellationToken,
    identifier: &'a ContactIdentifier,
    args: &'a EmailOpenedArgs,
}

#[async_trait]
impl<'a, S: StoreSession> UnitOfWork<S> for ResetBounceCount<'a> {
    type Output = Outcome;

    async fn run(&self, session: &mut S) -> Result<Outcome, StoreError> {
        let contact = self
            .contact_service
            .get_contact_with_retry(session, self.identifier, &[FacetKey::Emails])
            .await?;

        let Some(contact) = contact else {
            debug!(details = %self.args, "Email bounce count not reset, as contact not found");
            return Ok(Outcome::SkippedNoContact);
        };

        let mut emails = contact.emails().cloned().unwrap_or_default();
        if !emails.reset_preferred_bounce_count() {
            debug!(
                details = %self.args,
                "Email bounce count not reset, as preferred email could not be found"
            );
            return Ok(Outcome::SkippedNoPreferredEmail);
        }

        session.set_emails(&contact, emails);
        cancellable(self.cancellation, session.submit()).await?;

        info!(identifier = %self.identifier, version = contact.version, "Bounce count reset");
        Ok(Outcome::Updated)
    }
}
