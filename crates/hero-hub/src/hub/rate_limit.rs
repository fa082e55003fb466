use std::time::{Duration, Instant};

use hero_core::{EventClass, HeroError};

/// Last-accepted instant per event class for one connection.
/// Lives on the registry record and is dropped with it.
#[derive(Debug, Clone, Default)]
pub struct RateLimitClock {
    chat: Option<Instant>,
    hazard: Option<Instant>,
    ride: Option<Instant>,
    first_aid: Option<Instant>,
}

impl RateLimitClock {
    pub fn last_accepted(&self, class: EventClass) -> Option<Instant> {
        *self.slot(class)
    }

    fn record(&mut self, class: EventClass, now: Instant) {
        *self.slot_mut(class) = Some(now);
    }

    fn slot(&self, class: EventClass) -> &Option<Instant> {
        match class {
            EventClass::Chat => &self.chat,
            EventClass::Hazard => &self.hazard,
            EventClass::Ride => &self.ride,
            EventClass::FirstAid => &self.first_aid,
        }
    }

    fn slot_mut(&mut self, class: EventClass) -> &mut Option<Instant> {
        match class {
            EventClass::Chat => &mut self.chat,
            EventClass::Hazard => &mut self.hazard,
            EventClass::Ride => &mut self.ride,
            EventClass::FirstAid => &mut self.first_aid,
        }
    }
}

/// Fixed cooldown between accepted creation events of one class.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    cooldown: Duration,
}

impl RateLimitPolicy {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Accept and stamp `now`, or reject with the remaining wait.
    ///
    /// The wait is `cooldown - floor(elapsed)` in whole seconds, so a second
    /// chat 2s after the first is told to wait 8 seconds.
    pub fn check_and_update(
        &self,
        clock: &mut RateLimitClock,
        class: EventClass,
        now: Instant,
    ) -> Result<(), HeroError> {
        if let Some(last) = clock.last_accepted(class) {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.cooldown {
                let wait_secs = self
                    .cooldown
                    .as_secs()
                    .saturating_sub(elapsed.as_secs())
                    .max(1);
                return Err(HeroError::RateLimited { class, wait_secs });
            }
        }
        clock.record(class, now);
        Ok(())
    }
}
