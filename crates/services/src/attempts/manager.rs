use std::sync::Arc;

use tracing::warn;

use assess_core::Clock;
use assess_core::grading::GradingOutcome;
use assess_core::model::{AnswerMap, AttemptId, AttemptStatus, SessionId, TestAttempt, UserId};
use storage::repository::{AttemptRepository, FinalizeOutcome, QuestionAttemptRow, StorageError};

use crate::error::AttemptError;

/// How many times a submission is attempted before giving up. Retrying is
/// safe because the terminal write is idempotent.
const SUBMIT_TRIES: u32 = 2;

/// Result of resolving which attempt a user plays.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// A fresh attempt was created.
    Started(TestAttempt),
    /// An existing in-progress attempt was picked up, draft included.
    Resumed(TestAttempt),
    /// The attempt cap is exhausted; nothing was created. Carries the
    /// terminal attempts so their scores can be shown.
    LimitReached(Vec<TestAttempt>),
}

impl StartOutcome {
    #[must_use]
    pub fn attempt(&self) -> Option<&TestAttempt> {
        match self {
            StartOutcome::Started(attempt) | StartOutcome::Resumed(attempt) => Some(attempt),
            StartOutcome::LimitReached(_) => None,
        }
    }

    #[must_use]
    pub fn is_limit_reached(&self) -> bool {
        matches!(self, StartOutcome::LimitReached(_))
    }
}

/// Owns the attempt lifecycle: resume-or-create with limit enforcement,
/// best-effort draft persistence, and the one terminal submission.
#[derive(Clone)]
pub struct AttemptManager {
    clock: Clock,
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptManager {
    #[must_use]
    pub fn new(clock: Clock, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { clock, attempts }
    }

    /// Resolve the attempt for a (session, user) pair.
    ///
    /// Resumes an in-progress attempt when one exists — unless a terminal
    /// attempt is also present, in which case the in-progress row is a stale
    /// leftover (a crashed or duplicated tab), gets marked abandoned, and
    /// resolution falls through to the limit check and fresh creation.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Storage` on gateway failures.
    pub async fn start(
        &self,
        session_id: SessionId,
        user_id: UserId,
        max_attempts: Option<u32>,
    ) -> Result<StartOutcome, AttemptError> {
        if let Some(found) = self
            .attempts
            .find_in_progress_attempt(session_id, user_id)
            .await?
        {
            let terminal_count = self
                .attempts
                .count_terminal_attempts(session_id, user_id)
                .await?;
            if terminal_count == 0 {
                return Ok(StartOutcome::Resumed(found));
            }
            warn!(
                attempt_id = %found.id(),
                %session_id,
                "abandoning stale in-progress attempt alongside a terminal one"
            );
            self.attempts
                .mark_abandoned(found.id(), self.clock.now())
                .await?;
        }

        if let Some(max) = max_attempts {
            let terminal_count = self
                .attempts
                .count_terminal_attempts(session_id, user_id)
                .await?;
            if terminal_count >= max {
                let attempts = self
                    .attempts
                    .list_terminal_attempts(session_id, user_id)
                    .await?;
                return Ok(StartOutcome::LimitReached(attempts));
            }
        }

        let attempt = self
            .attempts
            .create_attempt(session_id, user_id, self.clock.now())
            .await?;
        Ok(StartOutcome::Started(attempt))
    }

    /// Overwrite the persisted draft, best effort.
    ///
    /// Autosave must never block interaction: failures are logged and
    /// swallowed, not retried, not surfaced.
    pub async fn save_draft(&self, attempt_id: AttemptId, answers: &AnswerMap) {
        if let Err(error) = self.attempts.update_draft_answers(attempt_id, answers).await {
            warn!(%attempt_id, %error, "draft autosave failed");
        }
    }

    /// Apply the terminal grading result: finalize the attempt row and
    /// append the audit trail in one atomic gateway write, with a bounded
    /// retry on transient failures.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AlreadyFinalized` when another code path won
    /// the finalize race, and `AttemptError::Storage` when every try failed.
    pub async fn submit(
        &self,
        attempt_id: AttemptId,
        status: AttemptStatus,
        outcome: &GradingOutcome,
        time_used_seconds: u32,
    ) -> Result<FinalizeOutcome, AttemptError> {
        let finalize = FinalizeOutcome {
            status,
            score: outcome.score,
            passed: outcome.passed,
            time_used_seconds,
            completed_at: self.clock.now(),
        };
        let mut rows = Vec::with_capacity(outcome.question_attempts.len());
        for graded in &outcome.question_attempts {
            rows.push(QuestionAttemptRow::from_graded(attempt_id, graded)?);
        }

        let mut last_error = StorageError::Connection("submission never attempted".into());
        for try_index in 0..SUBMIT_TRIES {
            match self.attempts.submit_result(attempt_id, &finalize, &rows).await {
                Ok(true) => return Ok(finalize),
                Ok(false) => return Err(AttemptError::AlreadyFinalized),
                Err(StorageError::NotFound) => return Err(StorageError::NotFound.into()),
                Err(error) => {
                    warn!(%attempt_id, %error, try_index, "submission write failed");
                    last_error = error;
                }
            }
        }
        Err(last_error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::time::{fixed_clock, fixed_now};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use storage::repository::InMemoryRepository;
    use uuid::Uuid;

    fn user(n: u128) -> UserId {
        UserId::new(Uuid::from_u128(n))
    }

    fn empty_outcome(score: u8, passed: bool) -> GradingOutcome {
        GradingOutcome {
            score,
            passed,
            total_correct: 0,
            total_questions: 0,
            question_attempts: Vec::new(),
        }
    }

    fn manager(repo: &InMemoryRepository) -> AttemptManager {
        AttemptManager::new(fixed_clock(), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn start_creates_then_resumes() {
        let repo = InMemoryRepository::new();
        let mgr = manager(&repo);
        let session_id = SessionId::new(1);

        let first = mgr.start(session_id, user(1), Some(3)).await.unwrap();
        let StartOutcome::Started(created) = first else {
            panic!("expected a fresh attempt");
        };

        let second = mgr.start(session_id, user(1), Some(3)).await.unwrap();
        let StartOutcome::Resumed(resumed) = second else {
            panic!("expected resume");
        };
        assert_eq!(resumed.id(), created.id());
    }

    #[tokio::test]
    async fn resume_carries_the_persisted_draft() {
        let repo = InMemoryRepository::new();
        let mgr = manager(&repo);
        let session_id = SessionId::new(1);

        let StartOutcome::Started(created) =
            mgr.start(session_id, user(1), None).await.unwrap()
        else {
            panic!("expected a fresh attempt");
        };

        let mut answers = AnswerMap::new();
        answers.insert(
            assess_core::model::ExerciseId::new(4),
            assess_core::model::ExerciseAnswers::SingleSelect {
                selected: std::iter::once((0, 1)).collect(),
            },
        );
        mgr.save_draft(created.id(), &answers).await;

        let StartOutcome::Resumed(resumed) =
            mgr.start(session_id, user(1), None).await.unwrap()
        else {
            panic!("expected resume");
        };
        assert_eq!(resumed.draft_answers(), &answers);
    }

    #[tokio::test]
    async fn stale_in_progress_row_is_abandoned_and_superseded() {
        let repo = InMemoryRepository::new();
        let mgr = manager(&repo);
        let session_id = SessionId::new(1);

        // One finished attempt plus a stale in-progress row, as left behind
        // by a crashed tab that never reached submit.
        let StartOutcome::Started(finished) =
            mgr.start(session_id, user(1), None).await.unwrap()
        else {
            panic!("expected a fresh attempt");
        };
        mgr.submit(
            finished.id(),
            AttemptStatus::Completed,
            &empty_outcome(80, true),
            100,
        )
        .await
        .unwrap();
        let StartOutcome::Started(stale) = mgr.start(session_id, user(1), None).await.unwrap()
        else {
            panic!("expected a fresh attempt");
        };

        let outcome = mgr.start(session_id, user(1), Some(5)).await.unwrap();
        let StartOutcome::Started(fresh) = outcome else {
            panic!("expected recovery to create a fresh attempt");
        };
        assert_ne!(fresh.id(), stale.id());

        let recovered = repo.get_attempt(stale.id()).await.unwrap();
        assert_eq!(recovered.status(), AttemptStatus::Abandoned);
    }

    #[tokio::test]
    async fn limit_reached_creates_no_row_and_lists_history() {
        let repo = InMemoryRepository::new();
        let mgr = manager(&repo);
        let session_id = SessionId::new(1);

        let StartOutcome::Started(only) =
            mgr.start(session_id, user(1), Some(1)).await.unwrap()
        else {
            panic!("expected a fresh attempt");
        };
        mgr.submit(
            only.id(),
            AttemptStatus::Completed,
            &empty_outcome(90, true),
            200,
        )
        .await
        .unwrap();

        let outcome = mgr.start(session_id, user(1), Some(1)).await.unwrap();
        let StartOutcome::LimitReached(history) = outcome else {
            panic!("expected limit reached");
        };
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].score(), Some(90));

        // No new in-progress row appeared.
        assert!(
            repo.find_in_progress_attempt(session_id, user(1))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn unlimited_sessions_ignore_terminal_count() {
        let repo = InMemoryRepository::new();
        let mgr = manager(&repo);
        let session_id = SessionId::new(1);

        for _ in 0..3 {
            let StartOutcome::Started(attempt) =
                mgr.start(session_id, user(1), None).await.unwrap()
            else {
                panic!("expected a fresh attempt");
            };
            mgr.submit(
                attempt.id(),
                AttemptStatus::Completed,
                &empty_outcome(50, false),
                10,
            )
            .await
            .unwrap();
        }

        let outcome = mgr.start(session_id, user(1), None).await.unwrap();
        assert!(matches!(outcome, StartOutcome::Started(_)));
    }

    #[tokio::test]
    async fn double_submit_reports_already_finalized() {
        let repo = InMemoryRepository::new();
        let mgr = manager(&repo);

        let StartOutcome::Started(attempt) =
            mgr.start(SessionId::new(1), user(1), None).await.unwrap()
        else {
            panic!("expected a fresh attempt");
        };

        mgr.submit(
            attempt.id(),
            AttemptStatus::TimedOut,
            &empty_outcome(30, false),
            1800,
        )
        .await
        .unwrap();
        let err = mgr
            .submit(
                attempt.id(),
                AttemptStatus::Completed,
                &empty_outcome(30, false),
                1800,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AttemptError::AlreadyFinalized));
    }

    /// Delegating repository whose `submit_result` fails a configured number
    /// of times before letting writes through.
    struct FlakySubmitRepo {
        inner: InMemoryRepository,
        failures_left: AtomicU32,
        calls: Mutex<u32>,
    }

    impl FlakySubmitRepo {
        fn new(inner: InMemoryRepository, failures: u32) -> Self {
            Self {
                inner,
                failures_left: AtomicU32::new(failures),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl AttemptRepository for FlakySubmitRepo {
        async fn find_in_progress_attempt(
            &self,
            session_id: SessionId,
            user_id: UserId,
        ) -> Result<Option<TestAttempt>, StorageError> {
            self.inner.find_in_progress_attempt(session_id, user_id).await
        }

        async fn count_terminal_attempts(
            &self,
            session_id: SessionId,
            user_id: UserId,
        ) -> Result<u32, StorageError> {
            self.inner.count_terminal_attempts(session_id, user_id).await
        }

        async fn list_terminal_attempts(
            &self,
            session_id: SessionId,
            user_id: UserId,
        ) -> Result<Vec<TestAttempt>, StorageError> {
            self.inner.list_terminal_attempts(session_id, user_id).await
        }

        async fn create_attempt(
            &self,
            session_id: SessionId,
            user_id: UserId,
            started_at: DateTime<Utc>,
        ) -> Result<TestAttempt, StorageError> {
            self.inner.create_attempt(session_id, user_id, started_at).await
        }

        async fn get_attempt(&self, id: AttemptId) -> Result<TestAttempt, StorageError> {
            self.inner.get_attempt(id).await
        }

        async fn update_draft_answers(
            &self,
            id: AttemptId,
            answers: &AnswerMap,
        ) -> Result<(), StorageError> {
            self.inner.update_draft_answers(id, answers).await
        }

        async fn finalize_attempt(
            &self,
            id: AttemptId,
            outcome: &FinalizeOutcome,
        ) -> Result<bool, StorageError> {
            self.inner.finalize_attempt(id, outcome).await
        }

        async fn insert_question_attempts(
            &self,
            rows: &[QuestionAttemptRow],
        ) -> Result<(), StorageError> {
            self.inner.insert_question_attempts(rows).await
        }

        async fn submit_result(
            &self,
            id: AttemptId,
            outcome: &FinalizeOutcome,
            rows: &[QuestionAttemptRow],
        ) -> Result<bool, StorageError> {
            *self.calls.lock().unwrap() += 1;
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StorageError::Connection("simulated outage".into()));
            }
            self.inner.submit_result(id, outcome, rows).await
        }

        async fn mark_abandoned(
            &self,
            id: AttemptId,
            at: DateTime<Utc>,
        ) -> Result<(), StorageError> {
            self.inner.mark_abandoned(id, at).await
        }

        async fn list_question_attempts(
            &self,
            attempt_id: AttemptId,
        ) -> Result<Vec<QuestionAttemptRow>, StorageError> {
            self.inner.list_question_attempts(attempt_id).await
        }
    }

    #[tokio::test]
    async fn submit_retries_once_after_a_transient_failure() {
        let inner = InMemoryRepository::new();
        let flaky = Arc::new(FlakySubmitRepo::new(inner.clone(), 1));
        let mgr = AttemptManager::new(fixed_clock(), flaky.clone());

        let attempt = inner
            .create_attempt(SessionId::new(1), user(1), fixed_now())
            .await
            .unwrap();

        let finalize = mgr
            .submit(
                attempt.id(),
                AttemptStatus::Completed,
                &empty_outcome(70, true),
                60,
            )
            .await
            .unwrap();
        assert_eq!(finalize.score, 70);
        assert_eq!(*flaky.calls.lock().unwrap(), 2);

        let stored = inner.get_attempt(attempt.id()).await.unwrap();
        assert_eq!(stored.status(), AttemptStatus::Completed);
    }

    #[tokio::test]
    async fn submit_gives_up_after_bounded_retries() {
        let inner = InMemoryRepository::new();
        let flaky = Arc::new(FlakySubmitRepo::new(inner.clone(), 5));
        let mgr = AttemptManager::new(fixed_clock(), flaky.clone());

        let attempt = inner
            .create_attempt(SessionId::new(1), user(1), fixed_now())
            .await
            .unwrap();

        let err = mgr
            .submit(
                attempt.id(),
                AttemptStatus::Completed,
                &empty_outcome(70, true),
                60,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AttemptError::Storage(StorageError::Connection(_))));
        assert_eq!(*flaky.calls.lock().unwrap(), 2);

        // The attempt is untouched and can be submitted again later.
        let stored = inner.get_attempt(attempt.id()).await.unwrap();
        assert_eq!(stored.status(), AttemptStatus::InProgress);
    }
}
