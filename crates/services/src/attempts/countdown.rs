use chrono::{DateTime, Utc};

use assess_core::time::Countdown;

/// One observation of the countdown, produced every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    pub remaining_seconds: u64,
    /// True exactly once per attempt, on the tick that crossed zero.
    pub timed_out: bool,
}

/// Drives the 1-second countdown for an active attempt.
///
/// The host calls [`tick`] once per second with the current time; remaining
/// time is always recomputed from the absolute start timestamp, so the
/// controller is reload-safe by construction. The timeout event is latched:
/// it fires on the first tick that observes zero — whether that is the very
/// first tick after a reload past the limit or a live countdown reaching
/// zero — and never again, even though both paths can race to report it.
///
/// [`tick`]: CountdownController::tick
#[derive(Debug, Clone, Copy)]
pub struct CountdownController {
    countdown: Countdown,
    fired: bool,
    disarmed: bool,
}

impl CountdownController {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, limit_seconds: u64) -> Self {
        Self {
            countdown: Countdown::new(started_at, limit_seconds),
            fired: false,
            disarmed: false,
        }
    }

    #[must_use]
    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// Seconds the attempt consumed so far, capped at the limit.
    #[must_use]
    pub fn time_used_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.countdown.time_used_seconds(now)
    }

    /// Observe the countdown; reports the timeout at most once.
    pub fn tick(&mut self, now: DateTime<Utc>) -> CountdownTick {
        let remaining_seconds = self.countdown.remaining_seconds(now);
        if self.disarmed {
            return CountdownTick {
                remaining_seconds,
                timed_out: false,
            };
        }

        let timed_out = remaining_seconds == 0 && !self.fired;
        if timed_out {
            self.fired = true;
        }
        CountdownTick {
            remaining_seconds,
            timed_out,
        }
    }

    /// Make the controller inert once the attempt is terminal.
    pub fn disarm(&mut self) {
        self.disarmed = true;
    }

    #[must_use]
    pub fn is_disarmed(&self) -> bool {
        self.disarmed
    }
}
