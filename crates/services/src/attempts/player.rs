use chrono::{DateTime, Utc};
use std::fmt;
use tracing::debug;

use assess_core::grading::{GradingEngine, GradingOutcome};
use assess_core::model::{
    AnswerMap, AttemptId, AttemptStatus, Exercise, ExerciseAnswers, ExerciseId, TestAttempt,
    TestSession,
};

use crate::error::AttemptError;

use super::autosave::AutosavePolicy;
use super::collector::AnswerCollector;
use super::countdown::{CountdownController, CountdownTick};

/// The terminal grading result of an attempt, kept alongside the player
/// state once submission succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedResult {
    pub status: AttemptStatus,
    pub outcome: GradingOutcome,
    pub time_used_seconds: u32,
    pub completed_at: DateTime<Utc>,
}

/// In-memory state for one active attempt: the session and its exercises,
/// the attempt row, the answer collector, the countdown, and the autosave
/// schedule.
///
/// Exercise players write into it through [`record_answers`]; the loop
/// service drives ticks and submission. Once a result exists every entry
/// point is inert: ticks stop firing, edits are dropped, and a second
/// submission is refused.
///
/// [`record_answers`]: ActiveAttempt::record_answers
pub struct ActiveAttempt {
    session: TestSession,
    exercises: Vec<Exercise>,
    attempt: TestAttempt,
    collector: AnswerCollector,
    countdown: CountdownController,
    autosave: AutosavePolicy,
    result: Option<FinalizedResult>,
}

impl ActiveAttempt {
    /// Wire up player state for a started or resumed attempt. The collector
    /// is seeded from the persisted draft and the countdown from the
    /// attempt's absolute start timestamp.
    #[must_use]
    pub(crate) fn new(
        session: TestSession,
        exercises: Vec<Exercise>,
        attempt: TestAttempt,
        autosave: AutosavePolicy,
    ) -> Self {
        let collector = AnswerCollector::from_draft(attempt.draft_answers().clone());
        let countdown =
            CountdownController::new(attempt.started_at(), session.time_limit_seconds());
        Self {
            session,
            exercises,
            attempt,
            collector,
            countdown,
            autosave,
            result: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &TestSession {
        &self.session
    }

    #[must_use]
    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    #[must_use]
    pub fn attempt(&self) -> &TestAttempt {
        &self.attempt
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt.id()
    }

    #[must_use]
    pub fn result(&self) -> Option<&FinalizedResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    /// Remaining countdown seconds at `now`.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.countdown.countdown().remaining_seconds(now)
    }

    /// Number of exercises with any collected payload.
    #[must_use]
    pub fn answered_exercises(&self) -> usize {
        self.collector.answered_exercises()
    }

    /// The initial state for one exercise player, sliced from the draft.
    #[must_use]
    pub fn initial_answers(&self, exercise_id: ExerciseId) -> Option<&ExerciseAnswers> {
        self.collector.initial_answers(exercise_id)
    }

    /// Current answer snapshot, as pushed by autosave and read by grading.
    #[must_use]
    pub fn snapshot(&self) -> &AnswerMap {
        self.collector.snapshot()
    }

    /// Entry point for the per-exercise collection callback.
    ///
    /// Inert once a result exists: late edits from a still-rendered player
    /// are dropped.
    pub fn record_answers(&mut self, exercise_id: ExerciseId, answers: ExerciseAnswers) {
        if self.is_complete() {
            debug!(attempt_id = %self.attempt_id(), %exercise_id, "dropping edit after finalization");
            return;
        }
        self.collector.record(exercise_id, answers);
    }

    pub(crate) fn countdown_tick(&mut self, now: DateTime<Utc>) -> CountdownTick {
        self.countdown.tick(now)
    }

    pub(crate) fn time_used_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.countdown.time_used_seconds(now)
    }

    pub(crate) fn autosave_due(&self, now: DateTime<Utc>) -> bool {
        self.autosave.should_save(now)
    }

    pub(crate) fn mark_autosave_attempted(&mut self, now: DateTime<Utc>) {
        self.autosave.mark_attempted(now);
    }

    /// Grade the current snapshot against the session's passing score.
    #[must_use]
    pub fn grade(&self) -> GradingOutcome {
        GradingEngine::new(self.session.passing_score()).grade(&self.exercises, self.snapshot())
    }

    /// Record the persisted terminal result and make the player inert.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::State` if the local attempt row was somehow
    /// already terminal.
    pub(crate) fn finalize_local(&mut self, result: FinalizedResult) -> Result<(), AttemptError> {
        self.attempt.finalize(
            result.status,
            result.outcome.score,
            result.outcome.passed,
            result.time_used_seconds,
            result.completed_at,
        )?;
        self.countdown.disarm();
        self.result = Some(result);
        Ok(())
    }
}

impl fmt::Debug for ActiveAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveAttempt")
            .field("session_id", &self.session.id())
            .field("attempt_id", &self.attempt.id())
            .field("exercises_len", &self.exercises.len())
            .field("answered", &self.collector.answered_exercises())
            .field("is_complete", &self.is_complete())
            .finish_non_exhaustive()
    }
}
