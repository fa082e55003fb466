use std::collections::HashMap;

use hero_core::ConnId;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::rate_limit::RateLimitClock;

/// One open connection: its outbound queue, privilege, and rate-limit clock.
#[derive(Debug)]
pub struct Connection {
    tx: mpsc::Sender<String>,
    pub privileged: bool,
    pub clock: RateLimitClock,
}

impl Connection {
    pub fn new(tx: mpsc::Sender<String>, privileged: bool) -> Self {
        Self {
            tx,
            privileged,
            clock: RateLimitClock::default(),
        }
    }

    /// Queue a frame without waiting. Fails when the queue is full or the
    /// session task has gone away.
    pub fn deliver(&self, text: &str) -> Result<(), TrySendError<String>> {
        self.tx.try_send(text.to_owned())
    }
}

/// Open connections keyed by id. Dropping a record drops its sender, which
/// ends the session task's outbound stream.
#[derive(Debug, Default)]
pub struct Registry {
    open: HashMap<ConnId, Connection>,
}

impl Registry {
    pub fn insert(&mut self, id: ConnId, conn: Connection) {
        self.open.insert(id, conn);
    }

    /// Idempotent: removing an unknown id returns `None`.
    pub fn remove(&mut self, id: &ConnId) -> Option<Connection> {
        self.open.remove(id)
    }

    pub fn get(&self, id: &ConnId) -> Option<&Connection> {
        self.open.get(id)
    }

    pub fn get_mut(&mut self, id: &ConnId) -> Option<&mut Connection> {
        self.open.get_mut(id)
    }

    pub fn contains(&self, id: &ConnId) -> bool {
        self.open.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConnId, &Connection)> {
        self.open.iter()
    }
}
