//! WebSocket event stream.
//!
//! Each connection becomes one broadcaster observer: it receives a
//! synthesized `state` event on subscribe, then every event its bounded
//! queue has room for, serialized as JSON text frames.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tracing::{debug, warn};

use super::AppState;

pub async fn events_handler(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| serve_observer(state, socket))
}

async fn serve_observer(state: AppState, mut socket: WebSocket) {
    let (observer_id, mut events) = state.engine.subscribe().await;
    debug!(observer = observer_id, "event stream opened");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("event serialization failed: {e}");
                        continue;
                    },
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            },
            incoming = socket.recv() => {
                match incoming {
                    // clients only ever send pings / close frames
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {},
                }
            },
        }
    }

    state.engine.unsubscribe(observer_id);
    debug!(observer = observer_id, "event stream closed");
}
