use chrono::{DateTime, Utc};

use assess_core::model::{AttemptId, AttemptStatus, TestAttempt};

use super::player::{ActiveAttempt, FinalizedResult};
use super::workflow::LoadOutcome;

/// The observable states of the embedded player surface:
/// `loading → (not_found | limit_reached | active → results)`.
///
/// This is intentionally **not** a UI view-model:
/// - no pre-formatted strings
/// - no localization assumptions
///
/// The host page renders these states and formats timestamps/durations as
/// needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerView {
    Loading,
    NotFound,
    LimitReached(Vec<AttemptListItem>),
    Active(ActiveView),
    Results(ResultsView),
}

/// One terminal attempt, shown on the limit-reached screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptListItem {
    pub attempt_id: AttemptId,
    pub status: AttemptStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<u8>,
    pub passed: Option<bool>,
    pub time_used_seconds: Option<u32>,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_attempt(attempt: &TestAttempt) -> Self {
        Self {
            attempt_id: attempt.id(),
            status: attempt.status(),
            completed_at: attempt.completed_at(),
            score: attempt.score(),
            passed: attempt.passed(),
            time_used_seconds: attempt.time_used_seconds(),
        }
    }
}

/// Snapshot of an active attempt for the countdown header and progress bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveView {
    pub session_title: String,
    pub total_exercises: usize,
    pub answered_exercises: usize,
    pub remaining_seconds: u64,
}

impl ActiveView {
    #[must_use]
    pub fn from_player(player: &ActiveAttempt, now: DateTime<Utc>) -> Self {
        Self {
            session_title: player.session().title().to_string(),
            total_exercises: player.exercises().len(),
            answered_exercises: player.answered_exercises(),
            remaining_seconds: player.remaining_seconds(now),
        }
    }
}

/// The results screen after a terminal submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsView {
    pub status: AttemptStatus,
    pub score: u8,
    pub passed: bool,
    pub total_correct: usize,
    pub total_questions: usize,
    pub time_used_seconds: u32,
    pub completed_at: DateTime<Utc>,
}

impl ResultsView {
    #[must_use]
    pub fn from_result(result: &FinalizedResult) -> Self {
        Self {
            status: result.status,
            score: result.outcome.score,
            passed: result.outcome.passed,
            total_correct: result.outcome.total_correct,
            total_questions: result.outcome.total_questions,
            time_used_seconds: result.time_used_seconds,
            completed_at: result.completed_at,
        }
    }
}

impl LoadOutcome {
    /// Project the load outcome into the observable player state.
    #[must_use]
    pub fn view(&self, now: DateTime<Utc>) -> PlayerView {
        match self {
            LoadOutcome::LimitReached(attempts) => PlayerView::LimitReached(
                attempts.iter().map(AttemptListItem::from_attempt).collect(),
            ),
            LoadOutcome::Active(player) => match player.result() {
                Some(result) => PlayerView::Results(ResultsView::from_result(result)),
                None => PlayerView::Active(ActiveView::from_player(player, now)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::grading::GradingOutcome;
    use assess_core::model::{SessionId, UserId};
    use assess_core::time::fixed_now;
    use uuid::Uuid;

    #[test]
    fn list_item_is_presentation_agnostic() {
        let mut attempt = TestAttempt::new(
            AttemptId::new(7),
            SessionId::new(1),
            UserId::new(Uuid::from_u128(1)),
            fixed_now(),
        );
        attempt
            .finalize(AttemptStatus::Completed, 85, true, 420, fixed_now())
            .unwrap();

        let item = AttemptListItem::from_attempt(&attempt);
        assert_eq!(item.attempt_id, AttemptId::new(7));
        assert_eq!(item.score, Some(85));
        assert_eq!(item.passed, Some(true));
        assert_eq!(item.time_used_seconds, Some(420));
    }

    #[test]
    fn results_view_carries_the_grading_totals() {
        let result = FinalizedResult {
            status: AttemptStatus::TimedOut,
            outcome: GradingOutcome {
                score: 40,
                passed: false,
                total_correct: 2,
                total_questions: 5,
                question_attempts: Vec::new(),
            },
            time_used_seconds: 1800,
            completed_at: fixed_now(),
        };

        let view = ResultsView::from_result(&result);
        assert_eq!(view.status, AttemptStatus::TimedOut);
        assert_eq!(view.score, 40);
        assert_eq!(view.total_questions, 5);
        assert!(!view.passed);
    }
}
