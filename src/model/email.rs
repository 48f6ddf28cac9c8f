use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single email address of a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub smtp_address: String,
    /// Consecutive delivery failures for this address.
    pub bounce_count: u32,
    pub validated: bool,
}

impl EmailAddress {
    pub fn new(smtp_address: impl Into<String>) -> Self {
        Self {
            smtp_address: smtp_address.into(),
            bounce_count: 0,
            validated: false,
        }
    }

    pub fn with_bounce_count(mut self, bounce_count: u32) -> Self {
        self.bounce_count = bounce_count;
        self
    }
}

/// The email address facet of a contact.
///
/// Holds at most one preferred address, stored under `preferred_key`, plus any
/// number of secondary addresses keyed by label.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmailAddressList {
    pub preferred_key: Option<String>,
    pub preferred_email: Option<EmailAddress>,
    pub others: BTreeMap<String, EmailAddress>,
}

impl EmailAddressList {
    pub fn new(preferred_key: impl Into<String>, preferred_email: EmailAddress) -> Self {
        Self {
            preferred_key: Some(preferred_key.into()),
            preferred_email: Some(preferred_email),
            others: BTreeMap::new(),
        }
    }

    pub fn with_other(mut self, key: impl Into<String>, email: EmailAddress) -> Self {
        self.others.insert(key.into(), email);
        self
    }

    /// The preferred address, provided it carries a non-empty SMTP address.
    pub fn usable_preferred_email(&self) -> Option<&EmailAddress> {
        self.preferred_email
            .as_ref()
            .filter(|email| !email.smtp_address.is_empty())
    }

    /// Sets the preferred address's bounce count to zero.
    ///
    /// Returns `false` and leaves the facet untouched when there is no usable
    /// preferred address. Resetting an address already at zero still returns
    /// `true`.
    pub fn reset_preferred_bounce_count(&mut self) -> bool {
        if self.usable_preferred_email().is_none() {
            return false;
        }
        if let Some(email) = self.preferred_email.as_mut() {
            email.bounce_count = 0;
        }
        true
    }
}
