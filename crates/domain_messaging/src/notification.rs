//! Persisted notifications
//!
//! A notification is queued for one user and consumed by the first poll:
//! reading it deletes it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, NotificationId, PortError, UserId};

/// A queued notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A notification to queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub message: String,
    pub link: Option<String>,
}

/// Storage for queued notifications
#[async_trait]
pub trait NotificationPort: DomainPort {
    /// Queues a notification
    async fn enqueue(&self, notification: NewNotification) -> Result<Notification, PortError>;

    /// Removes and returns the oldest queued notification for the user
    async fn take_next(&self, user: UserId) -> Result<Option<Notification>, PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicI64, Ordering};
    use tokio::sync::RwLock;

    /// In-memory notification queue
    #[derive(Debug, Default)]
    pub struct InMemoryNotificationStore {
        rows: RwLock<VecDeque<Notification>>,
        next_id: AtomicI64,
    }

    impl InMemoryNotificationStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queued notifications for a user, without consuming them
        pub async fn pending_for(&self, user: UserId) -> Vec<Notification> {
            self.rows
                .read()
                .await
                .iter()
                .filter(|n| n.user_id == user)
                .cloned()
                .collect()
        }
    }

    impl DomainPort for InMemoryNotificationStore {}

    #[async_trait]
    impl NotificationPort for InMemoryNotificationStore {
        async fn enqueue(&self, notification: NewNotification) -> Result<Notification, PortError> {
            let stored = Notification {
                id: NotificationId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
                user_id: notification.user_id,
                message: notification.message,
                link: notification.link,
                created_at: Utc::now(),
            };
            self.rows.write().await.push_back(stored.clone());
            Ok(stored)
        }

        async fn take_next(&self, user: UserId) -> Result<Option<Notification>, PortError> {
            let mut rows = self.rows.write().await;
            let position = rows.iter().position(|n| n.user_id == user);
            Ok(position.and_then(|index| rows.remove(index)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::InMemoryNotificationStore;
    use super::*;

    #[tokio::test]
    async fn test_take_next_consumes_oldest_first() {
        let store = InMemoryNotificationStore::new();
        let user = UserId::new(1);
        for message in ["first", "second"] {
            store
                .enqueue(NewNotification {
                    user_id: user,
                    message: message.to_string(),
                    link: None,
                })
                .await
                .unwrap();
        }

        assert_eq!(store.take_next(user).await.unwrap().map(|n| n.message).as_deref(), Some("first"));
        assert_eq!(store.take_next(user).await.unwrap().map(|n| n.message).as_deref(), Some("second"));
        assert!(store.take_next(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_other_users_rows_are_untouched() {
        let store = InMemoryNotificationStore::new();
        store
            .enqueue(NewNotification {
                user_id: UserId::new(2),
                message: "hello".into(),
                link: Some("/request/1".into()),
            })
            .await
            .unwrap();

        assert!(store.take_next(UserId::new(1)).await.unwrap().is_none());
        assert_eq!(store.pending_for(UserId::new(2)).await.len(), 1);
    }
}
