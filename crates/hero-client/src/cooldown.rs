use std::time::{Duration, Instant};

/// Client-side mirror of the hub's per-class cooldown. Advisory only: the
/// hub still enforces its own clock.
#[derive(Debug, Clone)]
pub struct SubmitCooldown {
    period: Duration,
    last: Option<Instant>,
}

impl SubmitCooldown {
    pub fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    /// Whole seconds left, rounded up. `None` when a submit may go out now.
    pub fn remaining(&self, now: Instant) -> Option<u64> {
        let last = self.last?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed >= self.period {
            return None;
        }
        let left = self.period - elapsed;
        Some(left.as_millis().div_ceil(1000) as u64)
    }

    pub fn stamp(&mut self, now: Instant) -> Option<Instant> {
        self.last.replace(now)
    }

    /// Undo a stamp whose frame never left.
    pub fn restore(&mut self, previous: Option<Instant>) {
        self.last = previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_rounds_up() {
        let mut cooldown = SubmitCooldown::new(Duration::from_secs(10));
        let t0 = Instant::now();
        assert_eq!(cooldown.remaining(t0), None);

        cooldown.stamp(t0);
        assert_eq!(cooldown.remaining(t0 + Duration::from_millis(1_500)), Some(9));
        assert_eq!(cooldown.remaining(t0 + Duration::from_millis(9_999)), Some(1));
        assert_eq!(cooldown.remaining(t0 + Duration::from_secs(10)), None);
    }

    #[test]
    fn restore_rolls_back_a_stamp() {
        let mut cooldown = SubmitCooldown::new(Duration::from_secs(10));
        let t0 = Instant::now();
        let previous = cooldown.stamp(t0);
        cooldown.restore(previous);
        assert_eq!(cooldown.remaining(t0), None);
    }

    #[test]
    fn zero_period_never_blocks() {
        let mut cooldown = SubmitCooldown::new(Duration::ZERO);
        let t0 = Instant::now();
        cooldown.stamp(t0);
        assert_eq!(cooldown.remaining(t0), None);
    }
}
