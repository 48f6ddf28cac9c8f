use serde::{Deserialize, Serialize};
use std::fmt;

use super::contact::ContactIdentifier;

/// An "email opened" occurrence for an identified contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailOpen {
    pub contact_identifier: ContactIdentifier,
    pub message_id: String,
    pub instance_id: String,
    /// Unix timestamp (seconds) at which the open was recorded.
    pub opened_at: u64,
}

impl EmailOpen {
    pub fn new(contact_identifier: ContactIdentifier, message_id: impl Into<String>) -> Self {
        Self {
            contact_identifier,
            message_id: message_id.into(),
            instance_id: String::new(),
            opened_at: 0,
        }
    }
}

/// Arguments handed to every processor of the email-opened pipeline.
///
/// `email_open` is optional because upstream stages may hand over arguments
/// before the open has been resolved; processors must reject such arguments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmailOpenedArgs {
    pub email_open: Option<EmailOpen>,
    pub campaign_id: Option<String>,
}

impl EmailOpenedArgs {
    pub fn new(email_open: EmailOpen) -> Self {
        Self {
            email_open: Some(email_open),
            campaign_id: None,
        }
    }

    pub fn with_campaign(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }
}

impl fmt::Display for EmailOpenedArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.email_open {
            Some(open) => write!(
                f,
                "EmailOpen(contact={}, message={}, instance={}, opened_at={})",
                open.contact_identifier, open.message_id, open.instance_id, open.opened_at
            )?,
            None => f.write_str("EmailOpen(<none>)")?,
        }
        if let Some(campaign) = &self.campaign_id {
            write!(f, " campaign={}", campaign)?;
        }
        Ok(())
    }
}
