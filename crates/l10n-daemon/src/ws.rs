// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `/v1/events` streaming endpoint.
//!
//! The WebSocket transport over the subscription manager: subscribe /
//! unsubscribe / ping messages inbound, typed events and control messages
//! outbound, heartbeat with a pong deadline, and cooperative teardown when
//! either side goes away. Slow consumers are dropped by the manager; this
//! task then observes its closed queue and closes the socket.

use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, State};
use axum::response::Response;
use l10n_auth::Claims;
use l10n_subscribe::{ClientMessage, ControlMessage};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use uuid::Uuid;

/// `GET /v1/events` — upgrade to a streaming subscription.
///
/// Authentication happened in the middleware; the verified claims arrive
/// as an extension.
pub(crate) async fn events_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| drive_subscriber(state, claims, socket))
}

async fn drive_subscriber(state: Arc<AppState>, claims: Claims, mut socket: WebSocket) {
    let is_admin = state.auth.is_admin(&claims);
    let (subscriber_id, mut events) = state
        .subscriptions
        .register(claims.username.clone(), is_admin);
    info!(subscriber = %subscriber_id, username = %claims.username, "subscriber connected");

    let mut heartbeat =
        tokio::time::interval(Duration::from_secs(state.config.heartbeat_secs.max(1)));
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let pong_deadline = Duration::from_secs(state.config.heartbeat_timeout_secs.max(2));
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    let Ok(json) = serde_json::to_string(&event) else { continue };
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                // The manager dropped us (slow consumer) or shut down.
                None => break,
            },

            _ = heartbeat.tick() => {
                if last_seen.elapsed() > pong_deadline {
                    debug!(subscriber = %subscriber_id, "no pong within deadline, closing");
                    break;
                }
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            },

            incoming = socket.recv() => match incoming {
                Some(Ok(message)) => {
                    last_seen = Instant::now();
                    match message {
                        Message::Text(text) => {
                            if handle_client_message(&state, subscriber_id, text.as_str(), &mut socket)
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        // Protocol pings are answered by the transport;
                        // both directions count as liveness.
                        Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
                    }
                }
                Some(Err(_)) | None => break,
            },
        }
    }

    state.subscriptions.remove(subscriber_id);
    info!(subscriber = %subscriber_id, "subscriber disconnected");
}

/// Apply one client message; `Err` means the socket write failed and the
/// connection should wind down.
async fn handle_client_message(
    state: &Arc<AppState>,
    subscriber_id: Uuid,
    text: &str,
    socket: &mut WebSocket,
) -> Result<(), ()> {
    let reply = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { spec }) => {
            match state.subscriptions.subscribe(subscriber_id, spec) {
                Ok(()) => ControlMessage::Ack { subscriber_id },
                Err(err) => ControlMessage::Error {
                    code: "VALIDATION_FAILED".into(),
                    message: err.to_string(),
                },
            }
        }
        Ok(ClientMessage::Unsubscribe) => {
            match state.subscriptions.unsubscribe(subscriber_id) {
                Ok(()) => ControlMessage::Ack { subscriber_id },
                Err(err) => ControlMessage::Error {
                    code: "VALIDATION_FAILED".into(),
                    message: err.to_string(),
                },
            }
        }
        Ok(ClientMessage::Ping) => ControlMessage::Pong,
        Err(err) => ControlMessage::Error {
            code: "VALIDATION_FAILED".into(),
            message: format!("unparseable message: {err}"),
        },
    };

    let json = serde_json::to_string(&reply).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
