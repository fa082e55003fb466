use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use hero_core::config::HEARTBEAT_INTERVAL_SECS;
use hero_core::{ConnId, HeroError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::hub::Outcome;
use crate::ws::handshake::{self, ConnectQuery};

const BANNER: &str = "WebSocket server is running";

/// GET /ws: upgrade to a hub session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    upgrade(ws, query, state)
}

/// GET /: same session as /ws for upgrade requests, a plain banner otherwise.
pub async fn root_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Query(query): Query<ConnectQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match ws {
        Ok(ws) => upgrade(ws, query, state),
        Err(_) => BANNER.into_response(),
    }
}

fn upgrade(ws: WebSocketUpgrade, query: ConnectQuery, state: Arc<AppState>) -> Response {
    let privileged = match handshake::verify_credentials(&query, &state.config.hub.auth) {
        Ok(privileged) => privileged,
        Err(reason) => {
            warn!(reason = %reason, "refusing upgrade");
            return (StatusCode::UNAUTHORIZED, reason).into_response();
        }
    };
    ws.on_upgrade(move |socket| run_connection(socket, state, privileged))
}

/// Per-connection session: lives for the entire WS connection.
///
/// Inbound frames go straight to the hub under its lock. Outbound frames
/// (init, broadcasts, private errors) arrive through this connection's queue
/// and are written here, so a slow socket only ever stalls its own task.
async fn run_connection(socket: WebSocket, state: Arc<AppState>, privileged: bool) {
    let conn_id = ConnId::new();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut outbound) = mpsc::channel::<String>(state.config.limits.outbound_queue.max(1));

    let admitted = state.hub().admit(conn_id.clone(), privileged, tx);
    if let Err(e) = admitted {
        warn!(conn_id = %conn_id, error = %e, "admission failed");
        return;
    }

    let max_payload = state.config.limits.max_payload_bytes;
    let period = Duration::from_secs(HEARTBEAT_INTERVAL_SECS);
    let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > max_payload {
                            let err = HeroError::PayloadTooLarge {
                                size: text.len(),
                                max: max_payload,
                            };
                            warn!(conn_id = %conn_id, error = %err, "closing connection");
                            break;
                        }
                        let outcome = state.hub().handle(&conn_id, text.as_str(), Instant::now());
                        if let Outcome::Rejected(e) = &outcome {
                            debug!(conn_id = %conn_id, code = e.code(), "sender notified");
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(conn_id = %conn_id, error = %e, "socket error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }

            frame = outbound.recv() => {
                match frame {
                    Some(text) => {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    // the hub dropped our record (queue overflow)
                    None => break,
                }
            }

            _ = heartbeat.tick() => {
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.hub().retire(&conn_id);
    let _ = sink.close().await;
    info!(conn_id = %conn_id, "WS connection closed");
}
