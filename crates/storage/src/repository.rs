use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use assess_core::grading::QuestionAttempt;
use assess_core::model::{
    AnswerMap, AttemptId, AttemptStatus, Exercise, ExerciseId, ExerciseKind, SessionId,
    TestAttempt, TestSession, UserId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Persisted shape for a test attempt.
///
/// Mirrors the domain `TestAttempt` so repositories can serialize and
/// rehydrate without leaking storage concerns into the domain layer; the
/// draft map travels as its JSON wire form.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub id: AttemptId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<u8>,
    pub passed: Option<bool>,
    pub time_used_seconds: Option<u32>,
    pub draft_answers_json: String,
}

impl AttemptRecord {
    /// Capture an attempt for persistence.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the draft map cannot be
    /// rendered as JSON.
    pub fn from_attempt(attempt: &TestAttempt) -> Result<Self, StorageError> {
        Ok(Self {
            id: attempt.id(),
            session_id: attempt.session_id(),
            user_id: attempt.user_id(),
            status: attempt.status(),
            started_at: attempt.started_at(),
            completed_at: attempt.completed_at(),
            score: attempt.score(),
            passed: attempt.passed(),
            time_used_seconds: attempt.time_used_seconds(),
            draft_answers_json: attempt
                .draft_answers()
                .to_json()
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
        })
    }

    /// Convert the record back into a domain `TestAttempt`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the draft JSON is malformed
    /// or the persisted fields are incoherent.
    pub fn into_attempt(self) -> Result<TestAttempt, StorageError> {
        let draft = AnswerMap::from_json(&self.draft_answers_json)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        TestAttempt::from_persisted(
            self.id,
            self.session_id,
            self.user_id,
            self.status,
            self.started_at,
            self.completed_at,
            self.score,
            self.passed,
            self.time_used_seconds,
            draft,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// One audit row for the append-only question-attempt trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionAttemptRow {
    pub attempt_id: AttemptId,
    pub exercise_id: ExerciseId,
    pub question_index: u32,
    pub exercise_kind: ExerciseKind,
    pub selected_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}

impl QuestionAttemptRow {
    /// Attach a graded sub-item to its attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the composite question index
    /// does not fit the persisted width.
    pub fn from_graded(
        attempt_id: AttemptId,
        graded: &QuestionAttempt,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            attempt_id,
            exercise_id: graded.exercise_id,
            question_index: u32::try_from(graded.question_index)
                .map_err(|_| StorageError::Serialization("question_index overflow".into()))?,
            exercise_kind: graded.exercise_kind,
            selected_answer: graded.selected_answer.clone(),
            correct_answer: graded.correct_answer.clone(),
            is_correct: graded.is_correct,
        })
    }
}

/// Terminal grading payload applied to an attempt row at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub status: AttemptStatus,
    pub score: u8,
    pub passed: bool,
    pub time_used_seconds: u32,
    pub completed_at: DateTime<Utc>,
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for sessions and their exercise lists.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist or update a session definition.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn upsert_session(&self, session: &TestSession) -> Result<(), StorageError>;

    /// Fetch a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<TestSession, StorageError>;

    /// Persist or update one exercise at its display position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exercise cannot be stored.
    async fn upsert_exercise(
        &self,
        session_id: SessionId,
        position: u32,
        exercise: &Exercise,
    ) -> Result<(), StorageError>;

    /// Fetch a session's exercises in display order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_exercises(&self, session_id: SessionId) -> Result<Vec<Exercise>, StorageError>;
}

/// The persistence gateway for attempts and their audit trail.
///
/// `update_draft_answers` is a best-effort last-write-wins overwrite; the
/// caller decides what to do with failures. `submit_result` is the one
/// atomic terminal write: it finalizes the attempt row and appends the
/// audit rows together, conditional on the row still being in progress, and
/// reports whether this call won the finalize race — a second invocation is
/// a no-op returning `false`.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Find the (at most one) in-progress attempt for a (session, user) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn find_in_progress_attempt(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<Option<TestAttempt>, StorageError>;

    /// Count terminal (completed/timed-out/abandoned) attempts for a pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn count_terminal_attempts(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<u32, StorageError>;

    /// List terminal attempts for a pair, most recently completed first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_terminal_attempts(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<Vec<TestAttempt>, StorageError>;

    /// Create a fresh in-progress attempt with a storage-assigned ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if an in-progress attempt already
    /// exists for the pair, or other storage errors.
    async fn create_attempt(
        &self,
        session_id: SessionId,
        user_id: UserId,
        started_at: DateTime<Utc>,
    ) -> Result<TestAttempt, StorageError>;

    /// Fetch an attempt by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: AttemptId) -> Result<TestAttempt, StorageError>;

    /// Overwrite the draft snapshot of an in-progress attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown or terminal attempts,
    /// or other storage errors.
    async fn update_draft_answers(
        &self,
        id: AttemptId,
        answers: &AnswerMap,
    ) -> Result<(), StorageError>;

    /// Finalize the attempt row alone. Returns `false` when the row was
    /// already terminal.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown attempts, or other
    /// storage errors.
    async fn finalize_attempt(
        &self,
        id: AttemptId,
        outcome: &FinalizeOutcome,
    ) -> Result<bool, StorageError>;

    /// Append audit rows for graded sub-items.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn insert_question_attempts(
        &self,
        rows: &[QuestionAttemptRow],
    ) -> Result<(), StorageError>;

    /// Finalize and append the audit trail as one atomic write. Returns
    /// `false`, writing nothing, when the row was already terminal.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown attempts, or other
    /// storage errors.
    async fn submit_result(
        &self,
        id: AttemptId,
        outcome: &FinalizeOutcome,
        rows: &[QuestionAttemptRow],
    ) -> Result<bool, StorageError>;

    /// Retire a stale in-progress row superseded by recovery.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown attempts, or other
    /// storage errors.
    async fn mark_abandoned(&self, id: AttemptId, at: DateTime<Utc>) -> Result<(), StorageError>;

    /// Read back the audit trail for an attempt, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_question_attempts(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<QuestionAttemptRow>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    sessions: HashMap<SessionId, TestSession>,
    exercises: HashMap<SessionId, Vec<(u32, Exercise)>>,
    attempts: HashMap<AttemptId, TestAttempt>,
    question_attempts: Vec<QuestionAttemptRow>,
    next_attempt_id: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All tables live behind one lock so `submit_result` is atomic, matching
/// the transactional guarantee of the SQLite backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn upsert_session(&self, session: &TestSession) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.sessions.insert(session.id(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<TestSession, StorageError> {
        let state = self.lock()?;
        state.sessions.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn upsert_exercise(
        &self,
        session_id: SessionId,
        position: u32,
        exercise: &Exercise,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let list = state.exercises.entry(session_id).or_default();
        list.retain(|(_, existing)| existing.id() != exercise.id());
        list.push((position, exercise.clone()));
        list.sort_by_key(|(pos, _)| *pos);
        Ok(())
    }

    async fn list_exercises(&self, session_id: SessionId) -> Result<Vec<Exercise>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .exercises
            .get(&session_id)
            .map(|list| list.iter().map(|(_, ex)| ex.clone()).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn find_in_progress_attempt(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<Option<TestAttempt>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .attempts
            .values()
            .find(|a| {
                a.session_id() == session_id
                    && a.user_id() == user_id
                    && a.status() == AttemptStatus::InProgress
            })
            .cloned())
    }

    async fn count_terminal_attempts(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<u32, StorageError> {
        let state = self.lock()?;
        let count = state
            .attempts
            .values()
            .filter(|a| a.session_id() == session_id && a.user_id() == user_id && a.is_terminal())
            .count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("attempt count overflow".into()))
    }

    async fn list_terminal_attempts(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<Vec<TestAttempt>, StorageError> {
        let state = self.lock()?;
        let mut attempts: Vec<TestAttempt> = state
            .attempts
            .values()
            .filter(|a| a.session_id() == session_id && a.user_id() == user_id && a.is_terminal())
            .cloned()
            .collect();
        attempts.sort_by_key(|a| std::cmp::Reverse((a.completed_at(), a.id())));
        Ok(attempts)
    }

    async fn create_attempt(
        &self,
        session_id: SessionId,
        user_id: UserId,
        started_at: DateTime<Utc>,
    ) -> Result<TestAttempt, StorageError> {
        let mut state = self.lock()?;
        let duplicate = state.attempts.values().any(|a| {
            a.session_id() == session_id
                && a.user_id() == user_id
                && a.status() == AttemptStatus::InProgress
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }

        state.next_attempt_id += 1;
        let id = AttemptId::new(state.next_attempt_id);
        let attempt = TestAttempt::new(id, session_id, user_id, started_at);
        state.attempts.insert(id, attempt.clone());
        Ok(attempt)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<TestAttempt, StorageError> {
        let state = self.lock()?;
        state.attempts.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn update_draft_answers(
        &self,
        id: AttemptId,
        answers: &AnswerMap,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let attempt = state.attempts.get_mut(&id).ok_or(StorageError::NotFound)?;
        attempt
            .record_draft(answers.clone())
            .map_err(|_| StorageError::NotFound)
    }

    async fn finalize_attempt(
        &self,
        id: AttemptId,
        outcome: &FinalizeOutcome,
    ) -> Result<bool, StorageError> {
        let mut state = self.lock()?;
        let attempt = state.attempts.get_mut(&id).ok_or(StorageError::NotFound)?;
        if attempt.is_terminal() {
            return Ok(false);
        }
        attempt
            .finalize(
                outcome.status,
                outcome.score,
                outcome.passed,
                outcome.time_used_seconds,
                outcome.completed_at,
            )
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(true)
    }

    async fn insert_question_attempts(
        &self,
        rows: &[QuestionAttemptRow],
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.question_attempts.extend_from_slice(rows);
        Ok(())
    }

    async fn submit_result(
        &self,
        id: AttemptId,
        outcome: &FinalizeOutcome,
        rows: &[QuestionAttemptRow],
    ) -> Result<bool, StorageError> {
        let mut state = self.lock()?;
        let attempt = state.attempts.get_mut(&id).ok_or(StorageError::NotFound)?;
        if attempt.is_terminal() {
            return Ok(false);
        }
        attempt
            .finalize(
                outcome.status,
                outcome.score,
                outcome.passed,
                outcome.time_used_seconds,
                outcome.completed_at,
            )
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.question_attempts.extend_from_slice(rows);
        Ok(true)
    }

    async fn mark_abandoned(&self, id: AttemptId, at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let attempt = state.attempts.get_mut(&id).ok_or(StorageError::NotFound)?;
        // A row that went terminal in the meantime needs no recovery.
        if attempt.is_terminal() {
            return Ok(());
        }
        attempt
            .abandon(at)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn list_question_attempts(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<QuestionAttemptRow>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .question_attempts
            .iter()
            .filter(|row| row.attempt_id == attempt_id)
            .cloned()
            .collect())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self { sessions, attempts }
    }
}
