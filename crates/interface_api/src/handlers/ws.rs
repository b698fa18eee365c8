//! Realtime socket
//!
//! One connection per signed-in user. `hello` subscribes the personal
//! notification room; `joined` enters a request's chat room after the same
//! visibility check as the detail view. A connection is in at most one chat
//! room at a time.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    Extension,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use core_kernel::GopId;
use domain_messaging::{user_room, ChatSession, PushFrame};
use domain_party::Actor;

use crate::dto::ws::{ClientEvent, ServerFrame};
use crate::AppState;

type Subscription = Option<broadcast::Receiver<PushFrame>>;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, actor))
}

async fn handle_socket(socket: WebSocket, state: AppState, actor: Actor) {
    let (mut sender, mut receiver) = socket.split();
    let mut personal: Subscription = None;
    let mut chat: Option<ChatSession> = None;
    let mut chat_frames: Subscription = None;

    info!(user = %actor.user_id, "socket connected");

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                let text = match inbound {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(error)) => {
                        debug!(user = %actor.user_id, %error, "socket read failed");
                        break;
                    }
                };
                let event = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => event,
                    Err(error) => {
                        debug!(user = %actor.user_id, %error, "unrecognised socket event");
                        continue;
                    }
                };

                match event {
                    ClientEvent::Hello => {
                        personal = Some(state.push.subscribe(&user_room(actor.user_id)).await);
                    }
                    ClientEvent::Joined { gop_id } => {
                        if let Some(previous) = chat.take() {
                            chat_frames = None;
                            state.chat_hub.leave(&previous).await;
                        }
                        match state.service.chat_session(&actor, GopId::new(gop_id)).await {
                            Ok(session) => {
                                chat_frames = Some(state.chat_hub.join(&session).await);
                                chat = Some(session);
                            }
                            Err(error) => warn!(user = %actor.user_id, gop = gop_id, %error, "chat join refused"),
                        }
                    }
                    ClientEvent::Text { msg } => match &chat {
                        Some(session) => {
                            if let Err(error) = state.chat_hub.text(session, &msg).await {
                                debug!(room = %session.chat.name, %error, "chat push failed");
                            }
                        }
                        None => debug!(user = %actor.user_id, "text outside a chat room"),
                    },
                    ClientEvent::Left => {
                        if let Some(session) = chat.take() {
                            chat_frames = None;
                            state.chat_hub.leave(&session).await;
                        }
                    }
                }
            }
            frame = next_frame(&mut personal) => {
                if forward(&mut sender, frame, &mut personal).await.is_err() {
                    break;
                }
            }
            frame = next_frame(&mut chat_frames) => {
                if forward(&mut sender, frame, &mut chat_frames).await.is_err() {
                    break;
                }
            }
        }
    }

    // a dropped connection still flushes the room
    if let Some(session) = chat.take() {
        drop(chat_frames);
        state.chat_hub.leave(&session).await;
    }
    info!(user = %actor.user_id, "socket closed");
}

/// Next frame of a subscription; never resolves while unsubscribed
async fn next_frame(subscription: &mut Subscription) -> Result<PushFrame, RecvError> {
    match subscription {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn forward(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: Result<PushFrame, RecvError>,
    subscription: &mut Subscription,
) -> Result<(), axum::Error> {
    match frame {
        Ok(frame) => match serde_json::to_string(&ServerFrame::from(&frame)) {
            Ok(json) => sender.send(Message::Text(json)).await,
            Err(error) => {
                warn!(room = %frame.room, %error, "frame not serialisable");
                Ok(())
            }
        },
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "socket too slow, frames dropped");
            Ok(())
        }
        Err(RecvError::Closed) => {
            *subscription = None;
            Ok(())
        }
    }
}
