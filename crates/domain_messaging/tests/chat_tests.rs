//! Chat room buffering and persistence

use std::sync::Arc;

use core_kernel::{GopId, UserId};
use domain_messaging::{ChatHub, ChatParticipants, ChatPort, ChatSession, InMemoryChatStore, PushHub};

async fn session(store: &InMemoryChatStore, participants: ChatParticipants) -> ChatSession {
    ChatSession {
        chat: store.ensure_room(GopId::new(7)).await.unwrap(),
        display_name: "Mercy Hospital".into(),
        participants,
    }
}

fn both() -> ChatParticipants {
    ChatParticipants {
        provider_user: Some(UserId::new(1)),
        payer_user: Some(UserId::new(2)),
    }
}

#[tokio::test]
async fn test_room_is_reused_per_request() {
    let store = InMemoryChatStore::new();
    let first = store.ensure_room(GopId::new(7)).await.unwrap();
    let second = store.ensure_room(GopId::new(7)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.name, "gop7");
}

#[tokio::test]
async fn test_messages_flush_in_order_on_leave() {
    let store = Arc::new(InMemoryChatStore::new());
    let hub = ChatHub::new(Arc::new(PushHub::new()), store.clone());
    let session = session(&store, both()).await;

    let mut rx = hub.join(&session).await;
    let joined = rx.recv().await.unwrap();
    assert_eq!(joined.event, "status");
    assert_eq!(joined.payload["msg"], "Mercy Hospital has entered the room.");

    hub.text(&session, "first").await.unwrap();
    hub.text(&session, "second").await.unwrap();
    assert_eq!(hub.pending(&session.chat.name).await, 2);
    assert!(store.messages(session.chat.id).await.unwrap().is_empty());

    let message = rx.recv().await.unwrap();
    assert_eq!(message.event, "message");
    assert_eq!(message.payload["name"], "Mercy Hospital");
    assert_eq!(message.payload["msg"], "first");

    hub.leave(&session).await;

    let stored: Vec<String> = store
        .messages(session.chat.id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.text)
        .collect();
    assert_eq!(stored, vec!["first", "second"]);
    assert_eq!(hub.pending(&session.chat.name).await, 0);
}

#[tokio::test]
async fn test_unresolved_participants_drop_the_batch() {
    let store = Arc::new(InMemoryChatStore::new());
    let hub = ChatHub::new(Arc::new(PushHub::new()), store.clone());
    let session = session(
        &store,
        ChatParticipants {
            provider_user: Some(UserId::new(1)),
            payer_user: None,
        },
    )
    .await;

    let _rx = hub.join(&session).await;
    hub.text(&session, "lost").await.unwrap();
    hub.leave(&session).await;

    assert!(store.messages(session.chat.id).await.unwrap().is_empty());
    assert_eq!(hub.pending(&session.chat.name).await, 0);
}

#[tokio::test]
async fn test_last_member_out_closes_the_room() {
    let store = Arc::new(InMemoryChatStore::new());
    let hub = ChatHub::new(Arc::new(PushHub::new()), store.clone());
    let provider = session(&store, both()).await;
    let payer = ChatSession {
        display_name: "Acme Assurance".into(),
        ..provider.clone()
    };

    let _provider_rx = hub.join(&provider).await;
    let _payer_rx = hub.join(&payer).await;
    assert_eq!(hub.open_rooms().await, 1);

    hub.leave(&provider).await;
    assert_eq!(hub.open_rooms().await, 1);

    hub.text(&payer, "still here").await.unwrap();
    hub.leave(&payer).await;

    assert_eq!(hub.open_rooms().await, 0);
    let stored = store.messages(payer.chat.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].author, "Acme Assurance");
}
