use hero_core::ConnId;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use super::registry::Registry;

/// Result of one fan-out pass.
#[derive(Debug, Default)]
pub struct FanOut {
    pub delivered: usize,
    /// Connections whose queue was full or closed. The caller retires them.
    pub dead: Vec<ConnId>,
}

/// Push one serialized event to every open connection, originator included.
///
/// Never waits: each delivery is a `try_send` into that connection's bounded
/// queue, so one stalled socket cannot hold up the others.
pub fn fan_out(registry: &Registry, payload: &str) -> FanOut {
    let mut result = FanOut::default();
    for (conn_id, conn) in registry.iter() {
        match conn.deliver(payload) {
            Ok(()) => result.delivered += 1,
            Err(TrySendError::Full(_)) => {
                warn!(conn_id = %conn_id, "outbound queue full, dropping connection");
                result.dead.push(conn_id.clone());
            }
            Err(TrySendError::Closed(_)) => {
                result.dead.push(conn_id.clone());
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::registry::Connection;
    use tokio::sync::mpsc;

    #[test]
    fn one_full_queue_does_not_block_the_rest() {
        let mut registry = Registry::default();

        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let slow = ConnId::new();
        registry.insert(slow.clone(), Connection::new(slow_tx, false));

        let (fast_tx, mut fast_rx) = mpsc::channel(8);
        registry.insert(ConnId::new(), Connection::new(fast_tx, false));

        let first = fan_out(&registry, "one");
        assert_eq!(first.delivered, 2);
        assert!(first.dead.is_empty());

        let second = fan_out(&registry, "two");
        assert_eq!(second.delivered, 1);
        assert_eq!(second.dead, vec![slow]);

        assert_eq!(fast_rx.try_recv().unwrap(), "one");
        assert_eq!(fast_rx.try_recv().unwrap(), "two");
    }

    #[test]
    fn closed_receiver_is_reported_dead() {
        let mut registry = Registry::default();
        let (tx, rx) = mpsc::channel(4);
        let gone = ConnId::new();
        registry.insert(gone.clone(), Connection::new(tx, false));
        drop(rx);

        let result = fan_out(&registry, "x");
        assert_eq!(result.delivered, 0);
        assert_eq!(result.dead, vec![gone]);
    }
}
