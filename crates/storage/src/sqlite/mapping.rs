use sqlx::Row;
use std::str::FromStr;

use assess_core::model::{
    AnswerMap, AttemptId, AttemptStatus, Exercise, ExerciseContent, ExerciseId, ExerciseKind,
    SessionId, TestAttempt, TestSession, UserId,
};

use crate::repository::{QuestionAttemptRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    Ok(SessionId::new(i64_to_u64("session_id", v)?))
}

pub(crate) fn exercise_id_from_i64(v: i64) -> Result<ExerciseId, StorageError> {
    Ok(ExerciseId::new(i64_to_u64("exercise_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

pub(crate) fn user_id_from_str(s: &str) -> Result<UserId, StorageError> {
    UserId::from_str(s).map_err(ser)
}

fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<TestSession, StorageError> {
    let id = session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let time_limit_minutes = u32_from_i64(
        "time_limit_minutes",
        row.try_get::<i64, _>("time_limit_minutes").map_err(ser)?,
    )?;
    let passing_score = u8_from_i64(
        "passing_score",
        row.try_get::<i64, _>("passing_score").map_err(ser)?,
    )?;
    let max_attempts = row
        .try_get::<Option<i64>, _>("max_attempts")
        .map_err(ser)?
        .map(|v| u32_from_i64("max_attempts", v))
        .transpose()?;

    TestSession::new(id, title, time_limit_minutes, passing_score, max_attempts).map_err(ser)
}

pub(crate) fn map_exercise_row(row: &sqlx::sqlite::SqliteRow) -> Result<Exercise, StorageError> {
    let id = exercise_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let content_json: String = row.try_get("content").map_err(ser)?;
    let content: ExerciseContent = serde_json::from_str(&content_json).map_err(ser)?;
    Ok(Exercise::new(id, title, content))
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<TestAttempt, StorageError> {
    let id = attempt_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let session_id = session_id_from_i64(row.try_get::<i64, _>("session_id").map_err(ser)?)?;
    let user_id = user_id_from_str(row.try_get::<String, _>("user_id").map_err(ser)?.as_str())?;
    let status =
        AttemptStatus::parse(row.try_get::<String, _>("status").map_err(ser)?.as_str())
            .map_err(ser)?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;
    let score = row
        .try_get::<Option<i64>, _>("score")
        .map_err(ser)?
        .map(|v| u8_from_i64("score", v))
        .transpose()?;
    let passed = row
        .try_get::<Option<i64>, _>("passed")
        .map_err(ser)?
        .map(|v| v != 0);
    let time_used_seconds = row
        .try_get::<Option<i64>, _>("time_used_seconds")
        .map_err(ser)?
        .map(|v| u32_from_i64("time_used_seconds", v))
        .transpose()?;
    let draft_answers =
        AnswerMap::from_json(row.try_get::<String, _>("draft_answers").map_err(ser)?.as_str())
            .map_err(ser)?;

    TestAttempt::from_persisted(
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
    )
    .map_err(ser)
}

pub(crate) fn map_question_attempt_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<QuestionAttemptRow, StorageError> {
    let kind_str: String = row.try_get("exercise_type").map_err(ser)?;
    let exercise_kind = ExerciseKind::parse(&kind_str)
        .ok_or_else(|| StorageError::Serialization(format!("invalid exercise type: {kind_str}")))?;

    Ok(QuestionAttemptRow {
        attempt_id: attempt_id_from_i64(row.try_get::<i64, _>("attempt_id").map_err(ser)?)?,
        exercise_id: exercise_id_from_i64(row.try_get::<i64, _>("exercise_id").map_err(ser)?)?,
        question_index: u32_from_i64(
            "question_index",
            row.try_get::<i64, _>("question_index").map_err(ser)?,
        )?,
        exercise_kind,
        selected_answer: row.try_get("selected_answer").map_err(ser)?,
        correct_answer: row.try_get("correct_answer").map_err(ser)?,
        is_correct: row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
    })
}
