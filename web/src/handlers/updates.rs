//! WebSocket endpoint streaming change events to subscribers.
//!
//! Server-to-client only: each outbound message is one serialized
//! [`todo_relay_core::ChangeEvent`], in publication order. The peer sends
//! nothing at the application level; its text/binary frames are ignored
//! and ping/pong is handled at the transport layer.
//!
//! # Lifecycle
//!
//! ```text
//! Client              Handler                 Broadcaster
//!   │                    │                        │
//!   ├─ Connect ─────────>│                        │
//!   │                    ├─ subscribe() ─────────>│
//!   │<─ ChangeEvent ─────┤<── bounded queue ──────┤
//!   │        ...         │                        │
//!   ├─ Disconnect ──────>│                        │
//!   │                    ├─ unsubscribe(id) ─────>│
//! ```
//!
//! A slow peer whose queue overflows is evicted by the broadcaster's
//! dispatch task; its queue closes, the send loop ends and the connection
//! is torn down like any other disconnect. No store lock is held anywhere
//! in this module.

use crate::state::AppState;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use tracing::{debug, info, warn};

/// `GET /ws` — upgrade and register the peer as a subscriber.
#[allow(clippy::unused_async)] // Axum handler signature requires async
pub async fn handle(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    info!("Updates connection requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drives one subscriber connection until either side is done.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let subscription = state.broadcaster.subscribe().await;
    let subscriber_id = subscription.id;
    info!(subscriber = %subscriber_id, "Updates connection established");

    // Split the socket: events flow out while we watch for a close.
    let (mut sender, mut receiver) = socket.split();
    let mut events = subscription.events;

    // Stream serialized change events until the queue closes (eviction or
    // shutdown) or the peer stops accepting writes.
    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = events.recv().await {
            if sender.send(Message::Text(payload)).await.is_err() {
                // Peer disconnected mid-write.
                break;
            }
        }

        debug!(subscriber = %subscriber_id, "Updates send task terminated");
    });

    // The subscription surface accepts no mutating input; drain and drop
    // whatever the peer sends, leaving the loop on close or error.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => {
                    info!(subscriber = %subscriber_id, "Peer requested close");
                    break;
                }
                Message::Text(_) | Message::Binary(_) => {
                    warn!(subscriber = %subscriber_id, "Ignoring unexpected inbound message");
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // Keepalive only; Axum answers pings automatically.
                    debug!(subscriber = %subscriber_id, "Keepalive frame");
                }
            }
        }

        debug!(subscriber = %subscriber_id, "Updates receive task terminated");
    });

    // Either task finishing means the connection is done.
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        },
        _ = (&mut recv_task) => {
            send_task.abort();
        },
    }

    // Deregistration and queue teardown happen as one step; idempotent if
    // the dispatch task already evicted us.
    state.broadcaster.unsubscribe(subscriber_id).await;
    info!(subscriber = %subscriber_id, "Updates connection closed");
}
