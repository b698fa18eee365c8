//! Messaging Domain
//!
//! Side-effect targets of the GOP lifecycle:
//!
//! - **Notifications**: durable, single-delivery rows polled by the client
//! - **Push**: per-user and per-chat rooms for live connections
//! - **Mail**: templated payer emails through a pluggable sender
//! - **Chat**: a room per request with batched persistence
//!
//! # Delivery Semantics
//!
//! ```text
//! Notifier::notify
//!   ├─ store row      (error returned to caller)
//!   ├─ push to room   (best effort, reported)
//!   └─ send email     (best effort, reported)
//! ```
//!
//! The caller decides what to do with a failure. The GOP service logs and
//! drops it, because the transition it reports on has already committed.

pub mod error;
pub mod notification;
pub mod push;
pub mod mail;
pub mod templates;
pub mod chat;
pub mod dispatcher;

pub use error::DeliveryError;
pub use notification::{NewNotification, Notification, NotificationPort};
pub use push::{user_room, PushFrame, PushHub, RealtimePush};
pub use mail::{resolve_recipient, Email, HttpMailSender, LogMailSender, MailSender};
pub use templates::{request_email, Credentials};
pub use chat::{chat_room_name, Chat, ChatHub, ChatMessage, ChatParticipants, ChatPort, ChatSession};
pub use dispatcher::{Dispatch, DispatchReport, Notifier};
#[cfg(any(test, feature = "mock"))]
pub use notification::mock::InMemoryNotificationStore;
#[cfg(any(test, feature = "mock"))]
pub use mail::mock::RecordingMailSender;
#[cfg(any(test, feature = "mock"))]
pub use chat::mock::InMemoryChatStore;
