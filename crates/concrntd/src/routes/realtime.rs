//! `GET /realtime` (spec §4.8, §6).
//!
//! One task per connection, driving the `{Opening, Subscribed, Closing}`
//! state machine directly against a `Subscription`: an unsubscribed
//! `Subscription` already drops every event (spec §4.6's "no subscription"
//! behaviour), so `Opening` needs no extra representation — it is just a
//! `Subscription` with empty prefixes.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientFrame {
    Listen { prefixes: Vec<String> },
    H,
}

pub async fn realtime(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut sub = state.signals.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(ClientFrame::Listen { prefixes }) => sub.set_prefixes(prefixes),
                            Ok(ClientFrame::H) => {
                                if socket.send(Message::Text(r#"{"type":"h"}"#.to_string())).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!(error = %e, "unrecognised realtime client frame, ignoring"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!(error = %e, "realtime transport read error, closing");
                        break;
                    }
                }
            }
            event = sub.recv() => {
                match event {
                    Some(event) => {
                        let payload = match serde_json::to_string(&*event) {
                            Ok(p) => p,
                            Err(e) => {
                                warn!(error = %e, "failed to serialise realtime event");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
}
