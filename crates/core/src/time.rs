use chrono::{DateTime, Duration, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Returns true if this clock represents real time.
    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self, Clock::Default)
    }

    /// Returns true if this clock is fixed.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

//
// ─── COUNTDOWN ─────────────────────────────────────────────────────────────────
//

/// Remaining-time computation for a timed attempt.
///
/// Remaining time is always recomputed from the absolute start timestamp:
/// `max(0, limit − elapsed(now))`. Nothing here is persisted or advanced
/// independently, so a reload resumes with the correct remaining time and a
/// paused client gains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    started_at: DateTime<Utc>,
    limit_seconds: u64,
}

impl Countdown {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, limit_seconds: u64) -> Self {
        Self {
            started_at,
            limit_seconds,
        }
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn limit_seconds(&self) -> u64 {
        self.limit_seconds
    }

    /// Whole seconds elapsed since the start, clamped at zero for clocks
    /// that read before `started_at`.
    #[must_use]
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = (now - self.started_at).num_seconds();
        u64::try_from(elapsed).unwrap_or(0)
    }

    /// Seconds left on the countdown, saturating at zero.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.limit_seconds.saturating_sub(self.elapsed_seconds(now))
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) == 0
    }

    /// Seconds the attempt actually consumed, capped at the limit so a
    /// timed-out attempt never reports more than the configured budget.
    #[must_use]
    pub fn time_used_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.elapsed_seconds(now).min(self.limit_seconds)
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
