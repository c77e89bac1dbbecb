use crate::{
    config::{
        DEFAULT_BATCH_LIMIT,
        DEFAULT_POINTS_PER_SOUL,
    },
    Result,
    error::BatchError,
    events::BatchConfirmedEvent,
    session::SessionKey,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
    warn,
};


#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSettings {
    pub batch_limit: u32,
    pub points_per_soul: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_BATCH_LIMIT,
            points_per_soul: DEFAULT_POINTS_PER_SOUL,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoulBatchState {
    /// Souls the ledger has acknowledged for the active session.
    pub confirmed_count: u64,
    /// Session point total reported by the latest confirmation.
    pub confirmed_points: u64,
    pub queued_count: u32,
    pub queued_points: u64,
    pub pending_submission: bool,
    /// Souls collected while a submission is in flight. They join the queue
    /// once the in-flight batch is confirmed or fails.
    pub held_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchPhase {
    Idle,
    Accumulating,
    Submitting,
}

/// A ledger write the caller must issue on behalf of the reconciler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchRequest {
    pub key: SessionKey,
    pub count: u32,
    pub forced: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    Applied {
        cleared: u32,
        total_points: u64,
        /// Set when the souls held behind the confirmed batch already fill
        /// the next one.
        next: Option<BatchRequest>,
    },
    /// The confirmation belongs to another player or an abandoned session.
    Stale,
}

/// Optimistic soul counter for one `(player, session)` pair.
///
/// The reconciler does no I/O. Operations that need a ledger write return a
/// [`BatchRequest`]; the caller reports the outcome back through
/// [`SoulBatch::submission_failed`] or a later confirmation event.
#[derive(Clone, Debug)]
pub struct SoulBatch {
    settings: BatchSettings,
    session: Option<SessionKey>,
    state: SoulBatchState,
}

impl SoulBatch {
    pub fn new(settings: BatchSettings) -> Self {
        Self {
            settings,
            session: None,
            state: SoulBatchState::default(),
        }
    }

    pub fn settings(&self) -> BatchSettings {
        self.settings
    }

    pub fn session(&self) -> Option<&SessionKey> {
        self.session.as_ref()
    }

    pub fn state(&self) -> &SoulBatchState {
        &self.state
    }

    pub fn phase(&self) -> BatchPhase {
        if self.state.pending_submission {
            BatchPhase::Submitting
        } else if self.state.queued_count > 0 || self.state.held_count > 0 {
            BatchPhase::Accumulating
        } else {
            BatchPhase::Idle
        }
    }

    /// Count shown to the player: confirmed souls plus everything collected
    /// locally that the ledger has not confirmed yet.
    pub fn optimistic_count(&self) -> u64 {
        self.state.confirmed_count
            + u64::from(self.state.queued_count)
            + u64::from(self.state.held_count)
    }

    pub fn optimistic_points(&self) -> u64 {
        self.state.confirmed_points
            + (u64::from(self.state.queued_count) + u64::from(self.state.held_count))
                * self.settings.points_per_soul
    }

    /// Binds the reconciler to a new session, discarding anything queued for
    /// the previous one.
    pub fn start_session(&mut self, key: SessionKey) {
        if let Some(previous) = &self.session
            && (self.state.queued_count > 0 || self.state.held_count > 0)
        {
            warn!(
                %previous,
                queued = self.state.queued_count,
                held = self.state.held_count,
                "discarding unconfirmed souls from previous session"
            );
        }
        info!(session = %key, "soul batch session started");
        self.session = Some(key);
        self.state = SoulBatchState::default();
    }

    pub fn reset(&mut self) {
        if let Some(key) = self.session.take() {
            info!(session = %key, "soul batch session reset");
        }
        self.state = SoulBatchState::default();
    }

    /// Seeds or refreshes the ledger-confirmed count and point total. Ledger
    /// truth wins even when it is lower than the local value.
    pub fn refresh_confirmed(
        &mut self,
        key: &SessionKey,
        confirmed: u64,
        confirmed_points: u64,
    ) -> bool {
        if self.session.as_ref() != Some(key) {
            debug!(session = %key, "ignoring confirmed count for inactive session");
            return false;
        }
        if confirmed < self.state.confirmed_count {
            warn!(
                session = %key,
                local = self.state.confirmed_count,
                ledger = confirmed,
                "ledger reports fewer confirmed souls than expected"
            );
        }
        self.state.confirmed_count = confirmed;
        self.state.confirmed_points = confirmed_points;
        true
    }

    /// Records one collected soul. Returns the batch to submit when the queue
    /// reaches the batch limit.
    pub fn collect_soul(&mut self) -> Result<Option<BatchRequest>> {
        let key = self.session.clone().ok_or(BatchError::NoActiveSession)?;
        if self.state.pending_submission {
            self.state.held_count += 1;
            return Ok(None);
        }
        self.state.queued_count += 1;
        self.state.queued_points += self.settings.points_per_soul;
        if self.state.queued_count >= self.settings.batch_limit {
            debug!(session = %key, count = self.state.queued_count, "batch limit reached");
            return Ok(Some(self.begin_submission(key, false)));
        }
        Ok(None)
    }

    pub fn submit_batch(&mut self) -> Result<BatchRequest> {
        let key = self.session.clone().ok_or(BatchError::NoActiveSession)?;
        if self.state.pending_submission {
            return Err(BatchError::SubmissionPending);
        }
        if self.state.queued_count == 0 {
            return Err(BatchError::EmptyQueue);
        }
        Ok(self.begin_submission(key, false))
    }

    /// Submits whatever is queued regardless of the batch limit. An empty
    /// queue yields no request.
    pub fn force_flush(&mut self) -> Result<Option<BatchRequest>> {
        let key = self.session.clone().ok_or(BatchError::NoActiveSession)?;
        if self.state.pending_submission {
            return Err(BatchError::SubmissionPending);
        }
        if self.state.queued_count == 0 {
            return Ok(None);
        }
        Ok(Some(self.begin_submission(key, true)))
    }

    fn begin_submission(&mut self, key: SessionKey, forced: bool) -> BatchRequest {
        self.state.pending_submission = true;
        BatchRequest {
            key,
            count: self.state.queued_count,
            forced,
        }
    }

    /// The ledger write never landed. Queued souls are kept and the queue
    /// reopens for collection and retry.
    pub fn submission_failed(&mut self, key: &SessionKey) -> bool {
        if self.session.as_ref() != Some(key) || !self.state.pending_submission {
            return false;
        }
        self.state.pending_submission = false;
        self.release_held();
        warn!(
            session = %key,
            queued = self.state.queued_count,
            "batch submission failed, keeping queued souls"
        );
        true
    }

    pub fn on_batch_confirmed(&mut self, event: &BatchConfirmedEvent) -> Reconciliation {
        let Some(key) = self.session.clone() else {
            debug!(session_id = event.session_id, "confirmation without active session");
            return Reconciliation::Stale;
        };
        if !key.matches(&event.player, event.session_id) {
            debug!(
                active = %key,
                session_id = event.session_id,
                "discarding stale batch confirmation"
            );
            return Reconciliation::Stale;
        }
        let cleared = self.state.queued_count;
        self.state.confirmed_count += u64::from(cleared);
        self.state.confirmed_points = event.total_points;
        self.state.queued_count = 0;
        self.state.queued_points = 0;
        self.state.pending_submission = false;
        self.release_held();
        info!(session = %key, cleared, total_points = event.total_points, "batch confirmed");
        let next = (self.state.queued_count >= self.settings.batch_limit).then(|| {
            debug!(
                session = %key,
                count = self.state.queued_count,
                "held souls fill next batch"
            );
            self.begin_submission(key, false)
        });
        Reconciliation::Applied {
            cleared,
            total_points: event.total_points,
            next,
        }
    }

    fn release_held(&mut self) {
        let held = std::mem::take(&mut self.state.held_count);
        self.state.queued_count += held;
        self.state.queued_points += u64::from(held) * self.settings.points_per_soul;
    }
}
