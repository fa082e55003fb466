//! The hub: canonical store, connection registry, and the rules applied
//! between them.
//!
//! Every method is synchronous. The caller holds the one lock around `Hub`
//! for the length of a call, so admission, routing, and fan-out of a single
//! event are never interleaved with another.

pub mod broadcast;
pub mod rate_limit;
pub mod registry;
pub mod router;
pub mod store;

use std::time::Instant;

use hero_core::{ConnId, HeroConfig, HeroError};
use hero_protocol::frames::{ClientFrame, ServerFrame};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use rate_limit::RateLimitPolicy;
use registry::{Connection, Registry};
use router::Rules;
use store::Store;

/// What the hub did with one inbound frame.
#[derive(Debug)]
pub enum Outcome {
    /// Store mutated; the event went to every open connection.
    Broadcast(ServerFrame),
    /// Refused; a private `error` frame went back to the sender only.
    Rejected(HeroError),
    /// Removal of an id that was already gone. Nothing sent.
    Unchanged,
    /// Malformed frame, or a sender that is no longer registered. Nothing sent.
    Ignored,
}

#[derive(Debug)]
pub struct Hub {
    store: Store,
    registry: Registry,
    rules: Rules,
}

impl Hub {
    pub fn new(config: &HeroConfig) -> Self {
        Self {
            store: Store::new(config.limits.chat_history),
            registry: Registry::default(),
            rules: Rules {
                policy: RateLimitPolicy::new(config.limits.cooldown()),
                auth_mode: config.hub.auth.mode,
                chat_max_chars: config.limits.chat_max_chars,
            },
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_connected(&self, conn_id: &ConnId) -> bool {
        self.registry.contains(conn_id)
    }

    /// Register a connection and queue its `init` snapshot.
    ///
    /// Runs under the hub lock, so the snapshot is taken after every
    /// previously broadcast event and before any later one.
    pub fn admit(
        &mut self,
        conn_id: ConnId,
        privileged: bool,
        tx: mpsc::Sender<String>,
    ) -> Result<(), HeroError> {
        let init = ServerFrame::Init {
            data: self.store.snapshot(),
        }
        .to_text()?;

        let conn = Connection::new(tx, privileged);
        conn.deliver(&init).map_err(|e| {
            HeroError::ConnectionLost(format!("could not queue init for {}: {}", conn_id, e))
        })?;

        self.registry.insert(conn_id.clone(), conn);
        info!(
            conn_id = %conn_id,
            privileged,
            connections = self.registry.len(),
            "connection admitted"
        );
        Ok(())
    }

    /// Drop a connection and its rate-limit clock. Safe to call twice.
    pub fn retire(&mut self, conn_id: &ConnId) -> bool {
        let removed = self.registry.remove(conn_id).is_some();
        if removed {
            info!(
                conn_id = %conn_id,
                connections = self.registry.len(),
                "connection retired"
            );
        }
        removed
    }

    /// Drop every connection. Each session task sees its queue close and
    /// shuts its socket. Returns how many were open.
    pub fn retire_all(&mut self) -> usize {
        let ids: Vec<ConnId> = self.registry.iter().map(|(id, _)| id.clone()).collect();
        for id in &ids {
            self.retire(id);
        }
        ids.len()
    }

    /// Handle one text frame using the current wall clock for ids and timestamps.
    pub fn handle(&mut self, conn_id: &ConnId, text: &str, now: Instant) -> Outcome {
        let wall_ms = chrono::Utc::now().timestamp_millis();
        self.handle_at(conn_id, text, now, wall_ms)
    }

    pub fn handle_at(
        &mut self,
        conn_id: &ConnId,
        text: &str,
        now: Instant,
        wall_ms: i64,
    ) -> Outcome {
        let frame = match ClientFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "dropping malformed frame");
                return Outcome::Ignored;
            }
        };
        let kind = frame.kind();
        let client_ref = frame.client_ref().map(str::to_owned);

        let Some(sender) = self.registry.get_mut(conn_id) else {
            warn!(conn_id = %conn_id, kind, "frame from unregistered connection");
            return Outcome::Ignored;
        };

        match router::route(frame, sender, &mut self.store, &self.rules, now, wall_ms) {
            Ok(event) => {
                debug!(conn_id = %conn_id, kind, "event accepted");
                self.broadcast(&event);
                Outcome::Broadcast(event)
            }
            Err(e @ HeroError::NotFound { .. }) => {
                debug!(conn_id = %conn_id, kind, error = %e, "removal of missing item");
                Outcome::Unchanged
            }
            Err(e) => match e.client_message() {
                Some(message) => {
                    info!(conn_id = %conn_id, kind, code = e.code(), "frame rejected");
                    let refusal = ServerFrame::rejection(message, e.class(), client_ref);
                    self.reply(conn_id, &refusal);
                    Outcome::Rejected(e)
                }
                None => {
                    warn!(conn_id = %conn_id, kind, error = %e, "dropping invalid frame");
                    Outcome::Ignored
                }
            },
        }
    }

    fn broadcast(&mut self, event: &ServerFrame) {
        let payload = match event.to_text() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "failed to serialize event");
                return;
            }
        };
        let result = broadcast::fan_out(&self.registry, &payload);
        for conn_id in &result.dead {
            self.retire(conn_id);
        }
        debug!(delivered = result.delivered, dropped = result.dead.len(), "event fanned out");
    }

    fn reply(&mut self, conn_id: &ConnId, frame: &ServerFrame) {
        let Ok(text) = frame.to_text() else {
            return;
        };
        let delivered = self
            .registry
            .get(conn_id)
            .map(|conn| conn.deliver(&text).is_ok())
            .unwrap_or(false);
        if !delivered {
            self.retire(conn_id);
        }
    }
}
