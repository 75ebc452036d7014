use chrono::{DateTime, Duration, Utc};

/// Default spacing between draft overwrites.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECONDS: i64 = 10;

/// Schedules periodic draft persistence: at most one overwrite per interval.
///
/// The draft write is a last-write-wins overwrite with no versioning or
/// merging, and a failed write is simply lost until the next interval —
/// marking consumes the slot whether or not the save landed, so there is no
/// retry inside an interval.
#[derive(Debug, Clone, Copy)]
pub struct AutosavePolicy {
    interval: Duration,
    last_attempted_at: Option<DateTime<Utc>>,
}

impl Default for AutosavePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl AutosavePolicy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            interval: Duration::seconds(DEFAULT_AUTOSAVE_INTERVAL_SECONDS),
            last_attempted_at: None,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Whether a save slot is open at `now`.
    #[must_use]
    pub fn should_save(&self, now: DateTime<Utc>) -> bool {
        match self.last_attempted_at {
            None => true,
            Some(last) => now - last >= self.interval,
        }
    }

    /// Consume the current slot, successful save or not.
    pub fn mark_attempted(&mut self, now: DateTime<Utc>) {
        self.last_attempted_at = Some(now);
    }
}
