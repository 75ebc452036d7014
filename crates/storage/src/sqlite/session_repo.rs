use assess_core::model::{Exercise, SessionId, TestSession};

use super::SqliteRepository;
use super::mapping::{id_i64, map_exercise_row, map_session_row, ser};
use crate::repository::{SessionRepository, StorageError};

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn upsert_session(&self, session: &TestSession) -> Result<(), StorageError> {
        let max_attempts = session
            .max_attempts()
            .map(i64::from);

        sqlx::query(
            r"
            INSERT INTO test_sessions (id, title, time_limit_minutes, passing_score, max_attempts)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                time_limit_minutes = excluded.time_limit_minutes,
                passing_score = excluded.passing_score,
                max_attempts = excluded.max_attempts
            ",
        )
        .bind(id_i64("session_id", session.id().value())?)
        .bind(session.title().to_string())
        .bind(i64::from(session.time_limit_minutes()))
        .bind(i64::from(session.passing_score()))
        .bind(max_attempts)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<TestSession, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, time_limit_minutes, passing_score, max_attempts
            FROM test_sessions WHERE id = ?1
            ",
        )
        .bind(id_i64("session_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_session_row(&row)
    }

    async fn upsert_exercise(
        &self,
        session_id: SessionId,
        position: u32,
        exercise: &Exercise,
    ) -> Result<(), StorageError> {
        let content_json = serde_json::to_string(exercise.content()).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO exercises (id, session_id, position, title, content)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id, session_id) DO UPDATE SET
                position = excluded.position,
                title = excluded.title,
                content = excluded.content
            ",
        )
        .bind(id_i64("exercise_id", exercise.id().value())?)
        .bind(id_i64("session_id", session_id.value())?)
        .bind(i64::from(position))
        .bind(exercise.title().to_string())
        .bind(content_json)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_exercises(&self, session_id: SessionId) -> Result<Vec<Exercise>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, content
            FROM exercises
            WHERE session_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_exercise_row(&row)?);
        }
        Ok(out)
    }
}
