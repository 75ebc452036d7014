use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (test sessions, exercises, test attempts,
/// question attempts, and indexes).
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS test_sessions (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    time_limit_minutes INTEGER NOT NULL CHECK (time_limit_minutes > 0),
                    passing_score INTEGER NOT NULL CHECK (passing_score BETWEEN 0 AND 100),
                    max_attempts INTEGER CHECK (max_attempts IS NULL OR max_attempts > 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS exercises (
                    id INTEGER NOT NULL,
                    session_id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    PRIMARY KEY (id, session_id),
                    FOREIGN KEY (session_id) REFERENCES test_sessions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS test_attempts (
                    id INTEGER PRIMARY KEY,
                    session_id INTEGER NOT NULL,
                    user_id TEXT NOT NULL,
                    status TEXT NOT NULL
                        CHECK (status IN ('in_progress', 'completed', 'timed_out', 'abandoned')),
                    started_at TEXT NOT NULL,
                    completed_at TEXT,
                    score INTEGER CHECK (score IS NULL OR score BETWEEN 0 AND 100),
                    passed INTEGER,
                    time_used_seconds INTEGER CHECK (time_used_seconds IS NULL OR time_used_seconds >= 0),
                    draft_answers TEXT NOT NULL,
                    FOREIGN KEY (session_id) REFERENCES test_sessions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS question_attempts (
                    id INTEGER PRIMARY KEY,
                    attempt_id INTEGER NOT NULL,
                    exercise_id INTEGER NOT NULL,
                    question_index INTEGER NOT NULL CHECK (question_index >= 0),
                    exercise_type TEXT NOT NULL,
                    selected_answer TEXT,
                    correct_answer TEXT NOT NULL,
                    is_correct INTEGER NOT NULL,
                    FOREIGN KEY (attempt_id) REFERENCES test_attempts(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // At most one in-progress attempt per (session, user) pair.
        sqlx::query(
            r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_attempts_one_in_progress
                    ON test_attempts (session_id, user_id)
                    WHERE status = 'in_progress';
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempts_session_user_status
                    ON test_attempts (session_id, user_id, status);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_exercises_session_position
                    ON exercises (session_id, position);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_question_attempts_attempt
                    ON question_attempts (attempt_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
