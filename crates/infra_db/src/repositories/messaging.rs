//! Messaging repository implementation
//!
//! Queued notifications and chat rooms. Taking a notification deletes it in
//! the same statement, so two concurrent polls never receive the same row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::DatabaseError;

/// Repository for notifications and chat storage
#[derive(Debug, Clone)]
pub struct MessagingRepository {
    pool: PgPool,
}

impl MessagingRepository {
    /// Creates a new MessagingRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    pub async fn insert_notification(
        &self,
        user_id: i64,
        message: &str,
        link: Option<&str>,
    ) -> Result<NotificationRow, DatabaseError> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (user_id, message, link)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, message, link, created_at
            "#,
        )
        .bind(user_id)
        .bind(message)
        .bind(link)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Deletes and returns the user's oldest notification
    pub async fn take_next_notification(&self, user_id: i64) -> Result<Option<NotificationRow>, DatabaseError> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            DELETE FROM notifications
            WHERE id = (
                SELECT id FROM notifications
                WHERE user_id = $1
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, user_id, message, link, created_at
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // ========================================================================
    // Chats
    // ========================================================================

    /// Returns the request's room, creating it on first use
    pub async fn ensure_chat(&self, gop_id: i64, name: &str) -> Result<ChatRow, DatabaseError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            INSERT INTO chats (gop_id, name)
            VALUES ($1, $2)
            ON CONFLICT (gop_id) DO UPDATE SET name = chats.name
            RETURNING id, gop_id, name
            "#,
        )
        .bind(gop_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Appends a batch of messages in one transaction, keeping their order
    pub async fn append_messages(&self, chat_id: i64, messages: &[ChatMessageRow]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        for message in messages {
            sqlx::query(
                r#"
                INSERT INTO chat_messages (chat_id, author, text, sent_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(chat_id)
            .bind(&message.author)
            .bind(&message.text)
            .bind(message.sent_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn messages(&self, chat_id: i64) -> Result<Vec<ChatMessageRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            SELECT author, text, sent_at
            FROM chat_messages
            WHERE chat_id = $1
            ORDER BY id
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// ============================================================================
// Type definitions
// ============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatRow {
    pub id: i64,
    pub gop_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatMessageRow {
    pub author: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}
