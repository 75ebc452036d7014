use std::sync::Arc;

use chrono::Duration;
use tracing::error;

use assess_core::Clock;
use assess_core::model::{AttemptStatus, SessionId, TestAttempt, UserId};
use storage::repository::{AttemptRepository, SessionRepository, Storage, StorageError};

use crate::error::AttemptError;

use super::autosave::AutosavePolicy;
use super::manager::{AttemptManager, StartOutcome};
use super::player::{ActiveAttempt, FinalizedResult};
use super::view::PlayerView;

/// What loading a session resolved to.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The attempt cap is exhausted; carries the terminal attempts so their
    /// scores can be shown.
    LimitReached(Vec<TestAttempt>),
    /// A started or resumed attempt, ready for ticks and edits.
    Active(Box<ActiveAttempt>),
}

/// Result of one 1-second tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub remaining_seconds: u64,
    /// An autosave slot was consumed this tick (the write itself is
    /// best-effort and may have been dropped).
    pub saved: bool,
    /// The countdown crossed zero and the attempt was auto-submitted; the
    /// result is on the player.
    pub timed_out: bool,
}

/// Orchestrates the attempt loop: load, periodic ticks, and submission.
///
/// Owns the clock and the persistence gateway; the host page owns rendering
/// and drives [`tick`] once per second plus [`flush_draft`] from its unload
/// hook.
///
/// [`tick`]: AttemptLoopService::tick
/// [`flush_draft`]: AttemptLoopService::flush_draft
#[derive(Clone)]
pub struct AttemptLoopService {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    manager: AttemptManager,
    autosave_interval: Duration,
}

impl AttemptLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            sessions,
            manager: AttemptManager::new(clock, attempts),
            autosave_interval: Duration::seconds(super::autosave::DEFAULT_AUTOSAVE_INTERVAL_SECONDS),
        }
    }

    /// Convenience wiring from an aggregated storage backend.
    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(clock, storage.sessions.clone(), storage.attempts.clone())
    }

    #[must_use]
    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    /// Load the session and resolve the user's attempt.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotFound` when the session does not exist and
    /// `AttemptError::Storage` for other gateway failures.
    pub async fn load(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<LoadOutcome, AttemptError> {
        let session = self.sessions.get_session(session_id).await.map_err(|e| match e {
            StorageError::NotFound => AttemptError::NotFound,
            other => AttemptError::Storage(other),
        })?;
        let exercises = self.sessions.list_exercises(session_id).await?;

        match self
            .manager
            .start(session_id, user_id, session.max_attempts())
            .await?
        {
            StartOutcome::LimitReached(attempts) => Ok(LoadOutcome::LimitReached(attempts)),
            StartOutcome::Started(attempt) | StartOutcome::Resumed(attempt) => {
                let autosave = AutosavePolicy::new().with_interval(self.autosave_interval);
                Ok(LoadOutcome::Active(Box::new(ActiveAttempt::new(
                    session, exercises, attempt, autosave,
                ))))
            }
        }
    }

    /// Load for the embedding page: any failure collapses into the terminal
    /// "not found" screen, with the underlying error logged. No retry.
    pub async fn load_view(&self, session_id: SessionId, user_id: UserId) -> PlayerView {
        match self.load(session_id, user_id).await {
            Ok(outcome) => outcome.view(self.clock.now()),
            Err(err) => {
                error!(%session_id, error = %err, "session load failed");
                PlayerView::NotFound
            }
        }
    }

    /// Advance the countdown and the autosave schedule by one tick.
    ///
    /// On expiry — observed live or on the first tick after a reload — the
    /// attempt is graded and auto-submitted with status `timed_out`. The
    /// countdown latch plus the idempotent terminal write keep a racing
    /// second trigger from re-finalizing or duplicating audit rows.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` only from the timeout submission path;
    /// autosave failures are swallowed.
    pub async fn tick(&self, player: &mut ActiveAttempt) -> Result<TickOutcome, AttemptError> {
        let now = self.clock.now();
        if player.is_complete() {
            return Ok(TickOutcome {
                remaining_seconds: 0,
                saved: false,
                timed_out: false,
            });
        }

        let countdown = player.countdown_tick(now);
        if countdown.timed_out {
            self.finalize(player, AttemptStatus::TimedOut).await?;
            return Ok(TickOutcome {
                remaining_seconds: 0,
                saved: false,
                timed_out: true,
            });
        }

        let mut saved = false;
        if player.autosave_due(now) {
            player.mark_autosave_attempted(now);
            self.manager
                .save_draft(player.attempt_id(), player.snapshot())
                .await;
            saved = true;
        }

        Ok(TickOutcome {
            remaining_seconds: countdown.remaining_seconds,
            saved,
            timed_out: false,
        })
    }

    /// Manual submission before expiry.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AlreadyFinalized` if a result already exists
    /// (for instance the timeout path fired first), or storage errors after
    /// the bounded retry is exhausted — in which case the player stays
    /// active and submission can be attempted again.
    pub async fn submit(&self, player: &mut ActiveAttempt) -> Result<FinalizedResult, AttemptError> {
        if player.is_complete() {
            return Err(AttemptError::AlreadyFinalized);
        }
        self.finalize(player, AttemptStatus::Completed).await
    }

    /// Best-effort final draft save for the page-unload hook. Failures are
    /// logged and swallowed; there is nothing else to clean up.
    pub async fn flush_draft(&self, player: &ActiveAttempt) {
        if player.is_complete() {
            return;
        }
        self.manager
            .save_draft(player.attempt_id(), player.snapshot())
            .await;
    }

    async fn finalize(
        &self,
        player: &mut ActiveAttempt,
        status: AttemptStatus,
    ) -> Result<FinalizedResult, AttemptError> {
        let now = self.clock.now();
        let outcome = player.grade();
        let time_used_seconds =
            u32::try_from(player.time_used_seconds(now)).unwrap_or(u32::MAX);

        let finalize = self
            .manager
            .submit(player.attempt_id(), status, &outcome, time_used_seconds)
            .await?;

        let result = FinalizedResult {
            status,
            outcome,
            time_used_seconds,
            completed_at: finalize.completed_at,
        };
        player.finalize_local(result.clone())?;
        Ok(result)
    }
}
