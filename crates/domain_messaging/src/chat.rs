//! Per-request chat rooms
//!
//! Live messages are broadcast through the [`PushHub`] as they arrive and
//! buffered per room in arrival order. The buffer is written to storage in
//! one batch whenever someone joins or leaves the room. Messages buffered
//! when the process stops are lost.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{broadcast, Mutex};

use core_kernel::{ChatId, DomainPort, GopId, PortError, UserId};

use crate::error::DeliveryError;
use crate::push::{PushFrame, PushHub, RealtimePush};

/// Room name for a request's chat
pub fn chat_room_name(gop_id: GopId) -> String {
    format!("gop{}", gop_id.value())
}

/// A stored chat room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub gop_id: GopId,
    pub name: String,
}

/// One chat line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Chat storage
#[async_trait]
pub trait ChatPort: DomainPort {
    /// Returns the request's room, creating it if none exists
    async fn ensure_room(&self, gop_id: GopId) -> Result<Chat, PortError>;

    /// Appends messages in order
    async fn append_messages(&self, chat_id: ChatId, messages: &[ChatMessage]) -> Result<(), PortError>;

    /// Stored messages, oldest first
    async fn messages(&self, chat_id: ChatId) -> Result<Vec<ChatMessage>, PortError>;
}

/// The two accounts a request's chat is between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChatParticipants {
    pub provider_user: Option<UserId>,
    pub payer_user: Option<UserId>,
}

impl ChatParticipants {
    pub fn is_complete(&self) -> bool {
        self.provider_user.is_some() && self.payer_user.is_some()
    }
}

/// A connection's membership in one room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub chat: Chat,
    pub display_name: String,
    pub participants: ChatParticipants,
}

#[derive(Debug)]
struct LiveRoom {
    chat_id: ChatId,
    participants: ChatParticipants,
    /// Joined connections; the room is dropped when the last one leaves
    members: usize,
    pending: Vec<ChatMessage>,
}

impl LiveRoom {
    fn open(session: &ChatSession) -> Self {
        Self {
            chat_id: session.chat.id,
            participants: session.participants,
            members: 0,
            pending: Vec::new(),
        }
    }

    /// Takes the pending batch, or drops it when a participant is unresolved
    fn take_batch(&mut self, room_name: &str) -> Option<(ChatId, Vec<ChatMessage>)> {
        if self.pending.is_empty() {
            return None;
        }
        if !self.participants.is_complete() {
            tracing::warn!(room = room_name, dropped = self.pending.len(), "chat participants unresolved, messages not stored");
            self.pending.clear();
            return None;
        }
        Some((self.chat_id, std::mem::take(&mut self.pending)))
    }
}

/// Live chat rooms
pub struct ChatHub {
    push: Arc<PushHub>,
    store: Arc<dyn ChatPort>,
    rooms: Mutex<HashMap<String, LiveRoom>>,
}

impl ChatHub {
    pub fn new(push: Arc<PushHub>, store: Arc<dyn ChatPort>) -> Self {
        Self {
            push,
            store,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Joins a room: flushes pending messages, announces the user and
    /// returns the room subscription.
    pub async fn join(&self, session: &ChatSession) -> broadcast::Receiver<PushFrame> {
        let receiver = self.push.subscribe(&session.chat.name).await;
        {
            let mut rooms = self.rooms.lock().await;
            let room = rooms
                .entry(session.chat.name.clone())
                .or_insert_with(|| LiveRoom::open(session));
            room.participants = session.participants;
            room.members += 1;
        }
        self.flush(&session.chat.name).await;
        self.announce(session, "has entered the room.").await;
        receiver
    }

    /// Broadcasts a message and buffers it for the next flush
    pub async fn text(&self, session: &ChatSession, text: &str) -> Result<usize, DeliveryError> {
        let message = ChatMessage {
            author: session.display_name.clone(),
            text: text.to_string(),
            sent_at: Utc::now(),
        };

        {
            let mut rooms = self.rooms.lock().await;
            let room = rooms
                .entry(session.chat.name.clone())
                .or_insert_with(|| LiveRoom::open(session));
            room.pending.push(message.clone());
        }

        self.push
            .emit(
                "message",
                json!({ "name": message.author, "msg": message.text }),
                &session.chat.name,
            )
            .await
    }

    /// Leaves a room: flushes pending messages and announces the departure.
    /// The last member out closes the room.
    pub async fn leave(&self, session: &ChatSession) {
        self.flush(&session.chat.name).await;
        self.announce(session, "has left the room.").await;
        self.release(&session.chat.name).await;
        self.push.prune().await;
    }

    /// Rooms with at least one joined connection or unflushed message
    pub async fn open_rooms(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Messages waiting for the next flush
    pub async fn pending(&self, room: &str) -> usize {
        self.rooms.lock().await.get(room).map_or(0, |r| r.pending.len())
    }

    /// Writes every pending message of the room in one batch.
    ///
    /// Skipped, and the batch dropped, unless both participants resolve.
    async fn flush(&self, room_name: &str) {
        let batch = {
            let mut rooms = self.rooms.lock().await;
            rooms.get_mut(room_name).and_then(|room| room.take_batch(room_name))
        };
        self.persist(room_name, batch).await;
    }

    async fn release(&self, room_name: &str) {
        let batch = {
            let mut rooms = self.rooms.lock().await;
            let Some(room) = rooms.get_mut(room_name) else {
                return;
            };
            room.members = room.members.saturating_sub(1);
            if room.members > 0 {
                return;
            }
            rooms
                .remove(room_name)
                .and_then(|mut room| room.take_batch(room_name))
        };
        self.persist(room_name, batch).await;
    }

    async fn persist(&self, room_name: &str, batch: Option<(ChatId, Vec<ChatMessage>)>) {
        let Some((chat_id, batch)) = batch else {
            return;
        };
        if let Err(error) = self.store.append_messages(chat_id, &batch).await {
            tracing::warn!(room = room_name, %error, lost = batch.len(), "chat flush failed");
        }
    }

    async fn announce(&self, session: &ChatSession, what: &str) {
        let payload = json!({ "msg": format!("{} {}", session.display_name, what) });
        if let Err(error) = self.push.emit("status", payload, &session.chat.name).await {
            tracing::debug!(room = %session.chat.name, %error, "status push failed");
        }
    }
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use tokio::sync::RwLock;

    /// In-memory chat storage
    #[derive(Debug, Default)]
    pub struct InMemoryChatStore {
        rooms: RwLock<HashMap<GopId, Chat>>,
        messages: RwLock<HashMap<ChatId, Vec<ChatMessage>>>,
        next_id: AtomicI64,
    }

    impl InMemoryChatStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn room_for(&self, gop_id: GopId) -> Option<Chat> {
            self.rooms.read().await.get(&gop_id).cloned()
        }
    }

    impl DomainPort for InMemoryChatStore {}

    #[async_trait]
    impl ChatPort for InMemoryChatStore {
        async fn ensure_room(&self, gop_id: GopId) -> Result<Chat, PortError> {
            let mut rooms = self.rooms.write().await;
            let chat = rooms.entry(gop_id).or_insert_with(|| Chat {
                id: ChatId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
                gop_id,
                name: chat_room_name(gop_id),
            });
            Ok(chat.clone())
        }

        async fn append_messages(&self, chat_id: ChatId, messages: &[ChatMessage]) -> Result<(), PortError> {
            self.messages
                .write()
                .await
                .entry(chat_id)
                .or_default()
                .extend_from_slice(messages);
            Ok(())
        }

        async fn messages(&self, chat_id: ChatId) -> Result<Vec<ChatMessage>, PortError> {
            Ok(self.messages.read().await.get(&chat_id).cloned().unwrap_or_default())
        }
    }
}
