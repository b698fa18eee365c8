//! Outbound email

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use domain_party::{Payer, User};

use crate::error::DeliveryError;

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

/// Mail transport
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), DeliveryError>;
}

/// Payer address for request emails.
///
/// Priority: primary contact, alternate contact, linked account email.
pub fn resolve_recipient(payer: &Payer, account: Option<&User>) -> Option<String> {
    payer
        .contact_emails()
        .next()
        .map(str::to_string)
        .or_else(|| {
            account
                .map(|user| user.email.trim().to_string())
                .filter(|email| !email.is_empty())
        })
}

/// Sender that only logs, for environments without a mail relay
#[derive(Debug, Default, Clone)]
pub struct LogMailSender;

#[async_trait]
impl MailSender for LogMailSender {
    async fn send(&self, email: &Email) -> Result<(), DeliveryError> {
        tracing::info!(recipient = %email.recipient, subject = %email.subject, "email not sent, no relay configured");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Posts emails as JSON to an HTTP mail relay
#[derive(Debug, Clone)]
pub struct HttpMailSender {
    client: reqwest::Client,
    endpoint: String,
    sender: String,
}

impl HttpMailSender {
    pub fn new(endpoint: impl Into<String>, sender: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DeliveryError::mail(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            sender: sender.into(),
        })
    }
}

#[async_trait]
impl MailSender for HttpMailSender {
    async fn send(&self, email: &Email) -> Result<(), DeliveryError> {
        let message = RelayMessage {
            from: &self.sender,
            to: &email.recipient,
            subject: &email.subject,
            html: &email.html_body,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await
            .map_err(|e| DeliveryError::mail(e.to_string()))?;

        if response.status().is_success() {
            tracing::debug!(recipient = %email.recipient, "email handed to relay");
            Ok(())
        } else {
            Err(DeliveryError::mail(format!("relay answered {}", response.status())))
        }
    }
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    /// Records sent emails; can be switched to fail every send
    #[derive(Debug, Default)]
    pub struct RecordingMailSender {
        sent: RwLock<Vec<Email>>,
        failing: AtomicBool,
    }

    impl RecordingMailSender {
        pub fn new() -> Self {
            Self::default()
        }

        /// A sender whose every send fails
        pub fn failing() -> Self {
            let sender = Self::default();
            sender.set_failing(true);
            sender
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub async fn sent(&self) -> Vec<Email> {
            self.sent.read().await.clone()
        }
    }

    #[async_trait]
    impl MailSender for RecordingMailSender {
        async fn send(&self, email: &Email) -> Result<(), DeliveryError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(DeliveryError::mail("smtp connection refused"));
            }
            self.sent.write().await.push(email.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{PayerId, UserId};
    use domain_party::{Affiliation, Role};

    fn payer(pic: Option<&str>, alt: Option<&str>) -> Payer {
        Payer {
            id: PayerId::new(1),
            company: "Acme".into(),
            payer_type: None,
            pic: None,
            pic_email: pic.map(String::from),
            pic_alt_email: alt.map(String::from),
            tel: None,
            country: None,
            user_id: None,
        }
    }

    fn account(email: &str) -> User {
        User {
            id: UserId::new(3),
            name: "Acme".into(),
            email: email.into(),
            role: Role::User,
            affiliation: Affiliation::Payer(PayerId::new(1)),
            premium: false,
        }
    }

    #[test]
    fn test_recipient_priority() {
        let user = account("login@acme.test");

        assert_eq!(
            resolve_recipient(&payer(Some("pic@acme.test"), Some("alt@acme.test")), Some(&user)).as_deref(),
            Some("pic@acme.test")
        );
        assert_eq!(
            resolve_recipient(&payer(None, Some("alt@acme.test")), Some(&user)).as_deref(),
            Some("alt@acme.test")
        );
        assert_eq!(
            resolve_recipient(&payer(None, None), Some(&user)).as_deref(),
            Some("login@acme.test")
        );
        assert_eq!(resolve_recipient(&payer(None, None), None), None);
    }

    #[tokio::test]
    async fn test_failing_sender() {
        let sender = mock::RecordingMailSender::failing();
        let email = Email {
            recipient: "a@b.test".into(),
            subject: "s".into(),
            html_body: "b".into(),
        };
        assert!(sender.send(&email).await.is_err());
        assert!(sender.sent().await.is_empty());
    }
}
