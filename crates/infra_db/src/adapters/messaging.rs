//! PostgreSQL Messaging Adapter
//!
//! One adapter serves both the notification queue and chat storage, since
//! they share the messaging repository.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{ChatId, DomainPort, GopId, HealthCheckResult, HealthCheckable, NotificationId, PortError, UserId};
use domain_messaging::{chat_room_name, Chat, ChatMessage, ChatPort, NewNotification, Notification, NotificationPort};

use crate::pool::ping;
use crate::repositories::messaging::{ChatMessageRow, ChatRow, MessagingRepository, NotificationRow};

/// PostgreSQL-backed implementation of NotificationPort and ChatPort
#[derive(Debug, Clone)]
pub struct PostgresMessagingAdapter {
    repository: MessagingRepository,
    pool: PgPool,
}

impl PostgresMessagingAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: MessagingRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresMessagingAdapter {}

#[async_trait]
impl HealthCheckable for PostgresMessagingAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-messaging-adapter").await
    }
}

#[async_trait]
impl NotificationPort for PostgresMessagingAdapter {
    #[instrument(skip(self, notification), fields(user_id = %notification.user_id))]
    async fn enqueue(&self, notification: NewNotification) -> Result<Notification, PortError> {
        let row = self
            .repository
            .insert_notification(
                notification.user_id.value(),
                &notification.message,
                notification.link.as_deref(),
            )
            .await?;
        Ok(notification_from_row(row))
    }

    #[instrument(skip(self), fields(user_id = %user))]
    async fn take_next(&self, user: UserId) -> Result<Option<Notification>, PortError> {
        let row = self.repository.take_next_notification(user.value()).await?;
        Ok(row.map(notification_from_row))
    }
}

#[async_trait]
impl ChatPort for PostgresMessagingAdapter {
    #[instrument(skip(self), fields(gop_id = %gop_id))]
    async fn ensure_room(&self, gop_id: GopId) -> Result<Chat, PortError> {
        let row = self
            .repository
            .ensure_chat(gop_id.value(), &chat_room_name(gop_id))
            .await?;
        Ok(chat_from_row(row))
    }

    #[instrument(skip(self, messages), fields(chat_id = %chat_id, count = messages.len()))]
    async fn append_messages(&self, chat_id: ChatId, messages: &[ChatMessage]) -> Result<(), PortError> {
        let rows: Vec<ChatMessageRow> = messages
            .iter()
            .map(|message| ChatMessageRow {
                author: message.author.clone(),
                text: message.text.clone(),
                sent_at: message.sent_at,
            })
            .collect();
        self.repository.append_messages(chat_id.value(), &rows).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(chat_id = %chat_id))]
    async fn messages(&self, chat_id: ChatId) -> Result<Vec<ChatMessage>, PortError> {
        let rows = self.repository.messages(chat_id.value()).await?;
        Ok(rows
            .into_iter()
            .map(|row| ChatMessage {
                author: row.author,
                text: row.text,
                sent_at: row.sent_at,
            })
            .collect())
    }
}

fn notification_from_row(row: NotificationRow) -> Notification {
    Notification {
        id: NotificationId::new(row.id),
        user_id: UserId::new(row.user_id),
        message: row.message,
        link: row.link,
        created_at: row.created_at,
    }
}

fn chat_from_row(row: ChatRow) -> Chat {
    Chat {
        id: ChatId::new(row.id),
        gop_id: GopId::new(row.gop_id),
        name: row.name,
    }
}
