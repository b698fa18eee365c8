//! Notification fan-out
//!
//! [`Notifier::notify`] writes the durable row first and then attempts the
//! best-effort channels. Only a failure of the durable row is returned as an
//! error; push and email outcomes are reported in the [`DispatchReport`].

use std::sync::Arc;

use serde_json::json;

use core_kernel::UserId;

use crate::error::DeliveryError;
use crate::mail::{Email, MailSender};
use crate::notification::{NewNotification, Notification, NotificationPort};
use crate::push::{user_room, RealtimePush};

/// One notification to fan out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub target: UserId,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    /// Push room; the target's personal room when `None`
    pub room_hint: Option<String>,
    pub email: Option<Email>,
}

/// Outcome of the best-effort channels
#[derive(Debug)]
pub struct DispatchReport {
    pub notification: Notification,
    /// Live subscribers reached
    pub pushed: Result<usize, DeliveryError>,
    /// `None` when no email was requested
    pub emailed: Option<Result<(), DeliveryError>>,
}

impl DispatchReport {
    /// Logs failed best-effort channels
    pub fn log_failures(&self) {
        if let Err(error) = &self.pushed {
            tracing::warn!(user = %self.notification.user_id, %error, "push failed");
        }
        if let Some(Err(error)) = &self.emailed {
            tracing::warn!(user = %self.notification.user_id, %error, "email failed");
        }
    }

    pub fn fully_delivered(&self) -> bool {
        self.pushed.is_ok() && !matches!(self.emailed, Some(Err(_)))
    }
}

/// Fans a notification out to storage, push and email
#[derive(Clone)]
pub struct Notifier {
    notifications: Arc<dyn NotificationPort>,
    push: Arc<dyn RealtimePush>,
    mail: Arc<dyn MailSender>,
}

impl Notifier {
    pub fn new(
        notifications: Arc<dyn NotificationPort>,
        push: Arc<dyn RealtimePush>,
        mail: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            notifications,
            push,
            mail,
        }
    }

    /// Sends one notification through every channel.
    ///
    /// # Errors
    ///
    /// `DeliveryError::Storage` if the durable row could not be written; the
    /// other channels are not attempted in that case.
    pub async fn notify(&self, dispatch: Dispatch) -> Result<DispatchReport, DeliveryError> {
        let Dispatch {
            target,
            title,
            message,
            link,
            room_hint,
            email,
        } = dispatch;

        let notification = self
            .notifications
            .enqueue(NewNotification {
                user_id: target,
                message: message.clone(),
                link: link.clone(),
            })
            .await?;

        let room = room_hint.unwrap_or_else(|| user_room(target));
        let pushed = self
            .push
            .emit(
                "notification",
                json!({ "title": title, "message": message, "link": link }),
                &room,
            )
            .await;

        let emailed = match email {
            Some(email) => Some(self.mail.send(&email).await),
            None => None,
        };

        Ok(DispatchReport {
            notification,
            pushed,
            emailed,
        })
    }

    /// Consumes the user's oldest queued notification
    pub async fn take_next(&self, user: UserId) -> Result<Option<Notification>, DeliveryError> {
        Ok(self.notifications.take_next(user).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::mock::RecordingMailSender;
    use crate::notification::mock::InMemoryNotificationStore;
    use crate::push::PushHub;

    fn dispatch(email: Option<Email>) -> Dispatch {
        Dispatch {
            target: UserId::new(8),
            title: "New request".into(),
            message: "New GOP request #1 received".into(),
            link: Some("/request/1".into()),
            room_hint: None,
            email,
        }
    }

    fn email() -> Email {
        Email {
            recipient: "pic@acme.test".into(),
            subject: "Request for GOP - Mercy".into(),
            html_body: "<p>hi</p>".into(),
        }
    }

    #[tokio::test]
    async fn test_email_failure_is_reported_not_raised() {
        let store = Arc::new(InMemoryNotificationStore::new());
        let notifier = Notifier::new(
            store.clone(),
            Arc::new(PushHub::new()),
            Arc::new(RecordingMailSender::failing()),
        );

        let report = notifier.notify(dispatch(Some(email()))).await.unwrap();

        assert!(matches!(report.emailed, Some(Err(_))));
        assert!(!report.fully_delivered());
        assert_eq!(store.pending_for(UserId::new(8)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_push_reaches_personal_room() {
        let hub = Arc::new(PushHub::new());
        let mut rx = hub.subscribe("8").await;
        let mail = Arc::new(RecordingMailSender::new());
        let notifier = Notifier::new(Arc::new(InMemoryNotificationStore::new()), hub.clone(), mail.clone());

        let report = notifier.notify(dispatch(Some(email()))).await.unwrap();

        assert_eq!(report.pushed.as_ref().ok(), Some(&1));
        assert!(report.fully_delivered());
        assert_eq!(rx.recv().await.unwrap().payload["link"], "/request/1");
        assert_eq!(mail.sent().await.len(), 1);
    }
}
