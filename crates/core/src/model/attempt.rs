use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{AnswerMap, AttemptId, SessionId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptStateError {
    #[error("invalid attempt status: {0}")]
    InvalidStatus(String),

    #[error("attempt is already terminal")]
    AlreadyTerminal,

    #[error("{0} is not a terminal grading status")]
    NotAGradingStatus(&'static str),

    #[error("score {0} is out of range 0-100")]
    ScoreOutOfRange(u8),

    #[error("terminal attempt is missing completion fields")]
    IncompleteTerminalState,

    #[error("in-progress attempt carries completion fields")]
    PrematureCompletion,
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle state of a test attempt.
///
/// `InProgress` is the only non-terminal state. The legal transitions are
/// `InProgress → Completed` (manual submit), `InProgress → TimedOut`
/// (countdown expiry) and `InProgress → Abandoned` (stale-row recovery);
/// nothing leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptStatus {
    InProgress,
    Completed,
    TimedOut,
    Abandoned,
}

impl AttemptStatus {
    /// Stable string form, persisted in the attempts table.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::TimedOut => "timed_out",
            AttemptStatus::Abandoned => "abandoned",
        }
    }

    /// Parse the stable string form.
    ///
    /// # Errors
    ///
    /// Returns `AttemptStateError::InvalidStatus` for unknown strings.
    pub fn parse(s: &str) -> Result<Self, AttemptStateError> {
        match s {
            "in_progress" => Ok(AttemptStatus::InProgress),
            "completed" => Ok(AttemptStatus::Completed),
            "timed_out" => Ok(AttemptStatus::TimedOut),
            "abandoned" => Ok(AttemptStatus::Abandoned),
            other => Err(AttemptStateError::InvalidStatus(other.to_string())),
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// One student's timed run through a test session.
///
/// Created in `in_progress` with a server-side start timestamp; mutated only
/// by draft overwrites while in progress and by exactly one terminal
/// transition. Terminal attempts are immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct TestAttempt {
    id: AttemptId,
    session_id: SessionId,
    user_id: UserId,
    status: AttemptStatus,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    score: Option<u8>,
    passed: Option<bool>,
    time_used_seconds: Option<u32>,
    draft_answers: AnswerMap,
}

impl TestAttempt {
    /// Start a fresh attempt: `in_progress`, empty draft.
    #[must_use]
    pub fn new(
        id: AttemptId,
        session_id: SessionId,
        user_id: UserId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            session_id,
            user_id,
            status: AttemptStatus::InProgress,
            started_at,
            completed_at: None,
            score: None,
            passed: None,
            time_used_seconds: None,
            draft_answers: AnswerMap::new(),
        }
    }

    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptStateError` if the persisted fields are incoherent:
    /// a graded terminal attempt without completion fields, an in-progress
    /// attempt carrying them, or a score above 100.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: AttemptId,
        session_id: SessionId,
        user_id: UserId,
        status: AttemptStatus,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        score: Option<u8>,
        passed: Option<bool>,
        time_used_seconds: Option<u32>,
        draft_answers: AnswerMap,
    ) -> Result<Self, AttemptStateError> {
        if let Some(score) = score {
            if score > 100 {
                return Err(AttemptStateError::ScoreOutOfRange(score));
            }
        }
        match status {
            AttemptStatus::InProgress => {
                if completed_at.is_some() || score.is_some() || passed.is_some() {
                    return Err(AttemptStateError::PrematureCompletion);
                }
            }
            AttemptStatus::Completed | AttemptStatus::TimedOut => {
                if completed_at.is_none() || score.is_none() || passed.is_none() {
                    return Err(AttemptStateError::IncompleteTerminalState);
                }
            }
            // Abandoned rows were never graded; only the end timestamp is required.
            AttemptStatus::Abandoned => {
                if completed_at.is_none() {
                    return Err(AttemptStateError::IncompleteTerminalState);
                }
            }
        }

        Ok(Self {
            id,
            session_id,
            user_id,
            status,
            started_at,
            completed_at,
            score,
            passed,
            time_used_seconds,
            draft_answers,
        })
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn score(&self) -> Option<u8> {
        self.score
    }

    #[must_use]
    pub fn passed(&self) -> Option<bool> {
        self.passed
    }

    #[must_use]
    pub fn time_used_seconds(&self) -> Option<u32> {
        self.time_used_seconds
    }

    #[must_use]
    pub fn draft_answers(&self) -> &AnswerMap {
        &self.draft_answers
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Overwrite the draft snapshot (last write wins).
    ///
    /// # Errors
    ///
    /// Returns `AttemptStateError::AlreadyTerminal` once the attempt has
    /// reached a terminal status.
    pub fn record_draft(&mut self, answers: AnswerMap) -> Result<(), AttemptStateError> {
        if self.is_terminal() {
            return Err(AttemptStateError::AlreadyTerminal);
        }
        self.draft_answers = answers;
        Ok(())
    }

    /// Apply the one terminal grading transition.
    ///
    /// # Errors
    ///
    /// Returns `AttemptStateError::AlreadyTerminal` on a second call,
    /// `NotAGradingStatus` for `InProgress`/`Abandoned`, and
    /// `ScoreOutOfRange` for scores above 100.
    pub fn finalize(
        &mut self,
        status: AttemptStatus,
        score: u8,
        passed: bool,
        time_used_seconds: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<(), AttemptStateError> {
        if self.is_terminal() {
            return Err(AttemptStateError::AlreadyTerminal);
        }
        if !matches!(status, AttemptStatus::Completed | AttemptStatus::TimedOut) {
            return Err(AttemptStateError::NotAGradingStatus(status.as_str()));
        }
        if score > 100 {
            return Err(AttemptStateError::ScoreOutOfRange(score));
        }

        self.status = status;
        self.score = Some(score);
        self.passed = Some(passed);
        self.time_used_seconds = Some(time_used_seconds);
        self.completed_at = Some(completed_at);
        Ok(())
    }

    /// Retire a stale in-progress row superseded by recovery.
    ///
    /// # Errors
    ///
    /// Returns `AttemptStateError::AlreadyTerminal` if the attempt already
    /// reached a terminal status.
    pub fn abandon(&mut self, at: DateTime<Utc>) -> Result<(), AttemptStateError> {
        if self.is_terminal() {
            return Err(AttemptStateError::AlreadyTerminal);
        }
        self.status = AttemptStatus::Abandoned;
        self.completed_at = Some(at);
        Ok(())
    }
}
