//! Websocket frames

use serde::{Deserialize, Serialize};

use domain_messaging::PushFrame;

/// Inbound client event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join the personal notification room
    Hello,
    /// Join a request's chat room
    Joined { gop_id: i64 },
    /// Chat line for the joined room
    Text { msg: String },
    /// Leave the chat room
    Left,
}

/// Outbound frame as sent on the socket
#[derive(Debug, Serialize)]
pub struct ServerFrame<'a> {
    pub event: &'a str,
    pub room: &'a str,
    pub data: &'a serde_json::Value,
}

impl<'a> From<&'a PushFrame> for ServerFrame<'a> {
    fn from(frame: &'a PushFrame) -> Self {
        Self {
            event: &frame.event,
            room: &frame.room,
            data: &frame.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_events_parse() {
        let joined: ClientEvent = serde_json::from_str(r#"{"event": "joined", "gop_id": 4}"#).unwrap();
        assert_eq!(joined, ClientEvent::Joined { gop_id: 4 });

        let text: ClientEvent = serde_json::from_str(r#"{"event": "text", "msg": "hi"}"#).unwrap();
        assert_eq!(text, ClientEvent::Text { msg: "hi".into() });

        assert!(serde_json::from_str::<ClientEvent>(r#"{"event": "shout"}"#).is_err());
    }
}
