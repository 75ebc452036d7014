use chrono::{DateTime, Utc};

use assess_core::model::{AnswerMap, AttemptId, AttemptStatus, SessionId, TestAttempt, UserId};

use super::SqliteRepository;
use super::mapping::{attempt_id_from_i64, id_i64, map_attempt_row, map_question_attempt_row, ser};
use crate::repository::{AttemptRepository, FinalizeOutcome, QuestionAttemptRow, StorageError};

fn conn_err(e: sqlx::Error) -> StorageError {
    if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
        StorageError::Conflict
    } else {
        StorageError::Connection(e.to_string())
    }
}

impl SqliteRepository {
    async fn attempt_exists(&self, id: AttemptId) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM test_attempts WHERE id = ?1")
            .bind(id_i64("attempt_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(row.is_some())
    }
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn find_in_progress_attempt(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<Option<TestAttempt>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, session_id, user_id, status, started_at, completed_at,
                   score, passed, time_used_seconds, draft_answers
            FROM test_attempts
            WHERE session_id = ?1 AND user_id = ?2 AND status = 'in_progress'
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .bind(user_id.value().to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_attempt_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn count_terminal_attempts(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<u32, StorageError> {
        let row: (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM test_attempts
            WHERE session_id = ?1 AND user_id = ?2 AND status != 'in_progress'
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .bind(user_id.value().to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        u32::try_from(row.0).map_err(ser)
    }

    async fn list_terminal_attempts(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<Vec<TestAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, session_id, user_id, status, started_at, completed_at,
                   score, passed, time_used_seconds, draft_answers
            FROM test_attempts
            WHERE session_id = ?1 AND user_id = ?2 AND status != 'in_progress'
            ORDER BY completed_at DESC, id DESC
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .bind(user_id.value().to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }
        Ok(out)
    }

    async fn create_attempt(
        &self,
        session_id: SessionId,
        user_id: UserId,
        started_at: DateTime<Utc>,
    ) -> Result<TestAttempt, StorageError> {
        let empty_draft = AnswerMap::new().to_json().map_err(ser)?;

        let res = sqlx::query(
            r"
            INSERT INTO test_attempts (session_id, user_id, status, started_at, draft_answers)
            VALUES (?1, ?2, 'in_progress', ?3, ?4)
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .bind(user_id.value().to_string())
        .bind(started_at)
        .bind(empty_draft)
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        let id = attempt_id_from_i64(res.last_insert_rowid())?;
        Ok(TestAttempt::new(id, session_id, user_id, started_at))
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<TestAttempt, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, session_id, user_id, status, started_at, completed_at,
                   score, passed, time_used_seconds, draft_answers
            FROM test_attempts
            WHERE id = ?1
            ",
        )
        .bind(id_i64("attempt_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row)
    }

    async fn update_draft_answers(
        &self,
        id: AttemptId,
        answers: &AnswerMap,
    ) -> Result<(), StorageError> {
        let json = answers.to_json().map_err(ser)?;

        let res = sqlx::query(
            r"
            UPDATE test_attempts
            SET draft_answers = ?2
            WHERE id = ?1 AND status = 'in_progress'
            ",
        )
        .bind(id_i64("attempt_id", id.value())?)
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn finalize_attempt(
        &self,
        id: AttemptId,
        outcome: &FinalizeOutcome,
    ) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
            UPDATE test_attempts
            SET status = ?2, score = ?3, passed = ?4, time_used_seconds = ?5, completed_at = ?6
            WHERE id = ?1 AND status = 'in_progress'
            ",
        )
        .bind(id_i64("attempt_id", id.value())?)
        .bind(outcome.status.as_str())
        .bind(i64::from(outcome.score))
        .bind(i64::from(outcome.passed))
        .bind(i64::from(outcome.time_used_seconds))
        .bind(outcome.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            if self.attempt_exists(id).await? {
                return Ok(false);
            }
            return Err(StorageError::NotFound);
        }
        Ok(true)
    }

    async fn insert_question_attempts(
        &self,
        rows: &[QuestionAttemptRow],
    ) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for row in rows {
            sqlx::query(
                r"
                INSERT INTO question_attempts (
                    attempt_id, exercise_id, question_index, exercise_type,
                    selected_answer, correct_answer, is_correct
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(id_i64("attempt_id", row.attempt_id.value())?)
            .bind(id_i64("exercise_id", row.exercise_id.value())?)
            .bind(i64::from(row.question_index))
            .bind(row.exercise_kind.as_str())
            .bind(row.selected_answer.clone())
            .bind(row.correct_answer.clone())
            .bind(i64::from(row.is_correct))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn submit_result(
        &self,
        id: AttemptId,
        outcome: &FinalizeOutcome,
        rows: &[QuestionAttemptRow],
    ) -> Result<bool, StorageError> {
        let attempt_id = id_i64("attempt_id", id.value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // Conditional finalize decides the race: a row already terminal
        // means another code path submitted first, and nothing is written.
        let res = sqlx::query(
            r"
            UPDATE test_attempts
            SET status = ?2, score = ?3, passed = ?4, time_used_seconds = ?5, completed_at = ?6
            WHERE id = ?1 AND status = 'in_progress'
            ",
        )
        .bind(attempt_id)
        .bind(outcome.status.as_str())
        .bind(i64::from(outcome.score))
        .bind(i64::from(outcome.passed))
        .bind(i64::from(outcome.time_used_seconds))
        .bind(outcome.completed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM test_attempts WHERE id = ?1")
                .bind(attempt_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?
                .is_some();
            return if exists {
                Ok(false)
            } else {
                Err(StorageError::NotFound)
            };
        }

        for row in rows {
            sqlx::query(
                r"
                INSERT INTO question_attempts (
                    attempt_id, exercise_id, question_index, exercise_type,
                    selected_answer, correct_answer, is_correct
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(attempt_id)
            .bind(id_i64("exercise_id", row.exercise_id.value())?)
            .bind(i64::from(row.question_index))
            .bind(row.exercise_kind.as_str())
            .bind(row.selected_answer.clone())
            .bind(row.correct_answer.clone())
            .bind(i64::from(row.is_correct))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(true)
    }

    async fn mark_abandoned(&self, id: AttemptId, at: DateTime<Utc>) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE test_attempts
            SET status = ?2, completed_at = ?3
            WHERE id = ?1 AND status = 'in_progress'
            ",
        )
        .bind(id_i64("attempt_id", id.value())?)
        .bind(AttemptStatus::Abandoned.as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        // A row that went terminal in the meantime needs no recovery.
        if res.rows_affected() == 0 && !self.attempt_exists(id).await? {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_question_attempts(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<QuestionAttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT attempt_id, exercise_id, question_index, exercise_type,
                   selected_answer, correct_answer, is_correct
            FROM question_attempts
            WHERE attempt_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("attempt_id", attempt_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_attempt_row(&row)?);
        }
        Ok(out)
    }
}
