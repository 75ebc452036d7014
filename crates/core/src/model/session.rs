use thiserror::Error;

use crate::model::SessionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionValidationError {
    #[error("passing score {0} is out of range 0-100")]
    PassingScoreOutOfRange(u8),

    #[error("time limit must be at least one minute")]
    ZeroTimeLimit,

    #[error("max attempts, when set, must be at least one")]
    ZeroMaxAttempts,
}

/// A timed test session as configured by the platform.
///
/// Immutable from the engine's perspective: attempts reference it, grading
/// reads `passing_score` from it, and the countdown derives its limit from
/// `time_limit_minutes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSession {
    id: SessionId,
    title: String,
    time_limit_minutes: u32,
    passing_score: u8,
    max_attempts: Option<u32>,
}

impl TestSession {
    /// Build a session, validating score range and limits.
    ///
    /// # Errors
    ///
    /// Returns `SessionValidationError` if `passing_score` exceeds 100, the
    /// time limit is zero, or `max_attempts` is `Some(0)`.
    pub fn new(
        id: SessionId,
        title: impl Into<String>,
        time_limit_minutes: u32,
        passing_score: u8,
        max_attempts: Option<u32>,
    ) -> Result<Self, SessionValidationError> {
        if passing_score > 100 {
            return Err(SessionValidationError::PassingScoreOutOfRange(
                passing_score,
            ));
        }
        if time_limit_minutes == 0 {
            return Err(SessionValidationError::ZeroTimeLimit);
        }
        if max_attempts == Some(0) {
            return Err(SessionValidationError::ZeroMaxAttempts);
        }

        Ok(Self {
            id,
            title: title.into(),
            time_limit_minutes,
            passing_score,
            max_attempts,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    /// Time limit expressed in seconds, as consumed by the countdown.
    #[must_use]
    pub fn time_limit_seconds(&self) -> u64 {
        u64::from(self.time_limit_minutes) * 60
    }

    /// Minimum score (0-100) required to pass.
    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    /// Cap on terminal attempts per user; `None` means unlimited.
    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}
