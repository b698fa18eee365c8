//! Real-time push rooms
//!
//! Each live connection subscribes to one or more named rooms: its personal
//! room (the user id) and any chat rooms it joined. Emitting to a room with no
//! subscribers is not an error; the frame is dropped.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use core_kernel::UserId;

use crate::error::DeliveryError;

const ROOM_CAPACITY: usize = 64;

/// Personal room name for a user
pub fn user_room(user: UserId) -> String {
    user.value().to_string()
}

/// One outbound event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFrame {
    pub event: String,
    pub room: String,
    pub payload: serde_json::Value,
}

/// Outbound push transport
#[async_trait]
pub trait RealtimePush: Send + Sync {
    /// Emits an event to a room
    ///
    /// # Returns
    ///
    /// The number of live subscribers that received the frame
    async fn emit(&self, event: &str, payload: serde_json::Value, room: &str) -> Result<usize, DeliveryError>;
}

/// In-process room registry backed by broadcast channels
#[derive(Debug, Default)]
pub struct PushHub {
    rooms: RwLock<HashMap<String, broadcast::Sender<PushFrame>>>,
}

impl PushHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to a room, creating it on first use
    pub async fn subscribe(&self, room: &str) -> broadcast::Receiver<PushFrame> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Drops rooms nobody listens to any more
    pub async fn prune(&self) {
        self.rooms
            .write()
            .await
            .retain(|_, sender| sender.receiver_count() > 0);
    }

    pub async fn subscriber_count(&self, room: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(room)
            .map_or(0, |sender| sender.receiver_count())
    }
}

#[async_trait]
impl RealtimePush for PushHub {
    async fn emit(&self, event: &str, payload: serde_json::Value, room: &str) -> Result<usize, DeliveryError> {
        let rooms = self.rooms.read().await;
        let Some(sender) = rooms.get(room) else {
            tracing::trace!(room, event, "no live connection, push dropped");
            return Ok(0);
        };

        let frame = PushFrame {
            event: event.to_string(),
            room: room.to_string(),
            payload,
        };
        // SendError only means there are no receivers left
        Ok(sender.send(frame).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_without_subscribers_is_dropped() {
        let hub = PushHub::new();
        let delivered = hub.emit("notification", serde_json::json!({}), "42").await.unwrap();
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_frame() {
        let hub = PushHub::new();
        let mut rx = hub.subscribe(&user_room(UserId::new(42))).await;

        let delivered = hub
            .emit("notification", serde_json::json!({"message": "hi"}), "42")
            .await
            .unwrap();
        assert_eq!(delivered, 1);

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event, "notification");
        assert_eq!(frame.payload["message"], "hi");
    }

    #[tokio::test]
    async fn test_prune_removes_abandoned_rooms() {
        let hub = PushHub::new();
        let rx = hub.subscribe("gop1").await;
        drop(rx);
        hub.prune().await;
        assert_eq!(hub.subscriber_count("gop1").await, 0);
        assert!(hub.rooms.read().await.is_empty());
    }
}
