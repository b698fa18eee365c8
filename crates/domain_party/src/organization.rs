//! Provider and payer organisations, and the doctors working for providers

use std::collections::BTreeSet;

use core_kernel::{DoctorId, PayerId, ProviderId, UserId};
use serde::{Deserialize, Serialize};

/// A healthcare facility that submits GOP requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub company: String,
    /// Free-form facility type (hospital, clinic, ...)
    pub provider_type: Option<String>,
    /// Person in charge
    pub pic: Option<String>,
    pub pic_email: Option<String>,
    pub tel: Option<String>,
    pub country: Option<String>,
    /// Primary account notified about this provider's requests
    pub user_id: Option<UserId>,
    /// Payers this provider has a contract with
    pub payer_ids: BTreeSet<PayerId>,
}

impl Provider {
    /// Whether GOP requests may be addressed to this payer
    pub fn works_with(&self, payer: PayerId) -> bool {
        self.payer_ids.contains(&payer)
    }
}

/// An insurer, TPA or corporate payer that decides GOP requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub id: PayerId,
    pub company: String,
    pub payer_type: Option<String>,
    /// Person in charge
    pub pic: Option<String>,
    /// Primary contact address for request emails
    pub pic_email: Option<String>,
    /// Alternate contact, used when the primary is missing
    pub pic_alt_email: Option<String>,
    pub tel: Option<String>,
    pub country: Option<String>,
    /// Linked login account, provisioned on the first request if missing
    pub user_id: Option<UserId>,
}

impl Payer {
    /// Contact addresses in priority order, skipping blanks
    pub fn contact_emails(&self) -> impl Iterator<Item = &str> {
        [self.pic_email.as_deref(), self.pic_alt_email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

/// A doctor attached to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub provider_id: ProviderId,
    pub name: String,
    pub department: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payer(pic_email: Option<&str>, alt: Option<&str>) -> Payer {
        Payer {
            id: PayerId::new(1),
            company: "Acme Health".into(),
            payer_type: None,
            pic: None,
            pic_email: pic_email.map(String::from),
            pic_alt_email: alt.map(String::from),
            tel: None,
            country: None,
            user_id: None,
        }
    }

    #[test]
    fn test_contact_emails_priority() {
        let both = payer(Some("pic@acme.test"), Some("alt@acme.test"));
        assert_eq!(both.contact_emails().next(), Some("pic@acme.test"));

        let blank_primary = payer(Some("  "), Some("alt@acme.test"));
        assert_eq!(blank_primary.contact_emails().next(), Some("alt@acme.test"));

        let none = payer(None, None);
        assert_eq!(none.contact_emails().next(), None);
    }
}
