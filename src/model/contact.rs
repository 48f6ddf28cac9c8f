use serde::{Deserialize, Serialize};
use std::fmt;

use super::email::EmailAddressList;

/// Key under which a contact is known to the store.
///
/// A contact identifier is the pair of the system that issued it (`source`) and
/// the opaque value itself. Only the value is required to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactIdentifier {
    pub source: String,
    pub identifier: String,
}

impl ContactIdentifier {
    pub fn new(source: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            identifier: identifier.into(),
        }
    }

    /// Returns `true` when the identifier can be used for a lookup.
    pub fn is_valid(&self) -> bool {
        !self.identifier.trim().is_empty()
    }
}

impl fmt::Display for ContactIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.identifier)
    }
}

/// Facets that can be requested when fetching a contact.
///
/// Facets not named in a fetch are left out of the returned snapshot, so a
/// missing facet on a snapshot means either "not requested" or "not there yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacetKey {
    Emails,
}

impl FacetKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetKey::Emails => "Emails",
        }
    }
}

impl fmt::Display for FacetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A read snapshot of a contact as held by the store.
///
/// `version` is bumped by the store on every accepted write and is echoed back
/// on commit so the store can reject writes based on a stale read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub identifier: ContactIdentifier,
    pub version: u64,
    pub emails: Option<EmailAddressList>,
}

impl Contact {
    /// Creates a contact with no facets. The store assigns the version.
    pub fn new(identifier: ContactIdentifier) -> Self {
        Self {
            identifier,
            version: 0,
            emails: None,
        }
    }

    pub fn with_emails(mut self, emails: EmailAddressList) -> Self {
        self.emails = Some(emails);
        self
    }

    /// The email address facet, if it was loaded.
    pub fn emails(&self) -> Option<&EmailAddressList> {
        self.emails.as_ref()
    }

    /// Returns a copy carrying only the requested facets.
    pub fn project(&self, facets: &[FacetKey]) -> Self {
        Self {
            identifier: self.identifier.clone(),
            version: self.version,
            emails: if facets.contains(&FacetKey::Emails) {
                self.emails.clone()
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EmailAddress;

    #[test]
    fn test_identifier_validation() {
        assert!(ContactIdentifier::new("exm", "alice").is_valid());
        assert!(ContactIdentifier::new("", "alice").is_valid());
        assert!(!ContactIdentifier::new("exm", "").is_valid());
        assert!(!ContactIdentifier::new("exm", "   ").is_valid());
    }

    #[test]
    fn test_projection_drops_unrequested_facets() {
        let contact = Contact::new(ContactIdentifier::new("exm", "alice"))
            .with_emails(EmailAddressList::new("work", EmailAddress::new("alice@example.com")));

        assert!(contact.project(&[FacetKey::Emails]).emails().is_some());
        assert!(contact.project(&[]).emails().is_none());
        assert_eq!(contact.project(&[]).identifier, contact.identifier);
    }
}
