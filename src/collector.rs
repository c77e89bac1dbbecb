use crate::{
    Result,
    achievements::{
        AchievementRecord,
        Catalog,
        CategoryProgress,
        UnlockTimeline,
    },
    batch::{
        BatchPhase,
        BatchRequest,
        Reconciliation,
        SoulBatch,
        SoulBatchState,
    },
    cache::TtlCache,
    config::GameConfig,
    error::{
        BatchError,
        LedgerError,
    },
    events::LedgerEvent,
    ledger::{
        EventSource,
        SessionSouls,
        SoulLedger,
    },
    session::{
        SessionKey,
        identity_key,
    },
};
use chrono::{
    DateTime,
    Utc,
};
use fuels::types::U256;
use serde::Serialize;
use tracing::{
    debug,
    info,
    warn,
};

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectOutcome {
    Queued { queued: u32 },
    /// Collected while a batch is in flight; joins the next batch.
    Held { held: u32 },
    Submitted { count: u32, points_awarded: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session: SessionKey,
    pub confirmed_count: u64,
    pub confirmed_points: u64,
    /// Souls that never reached ledger confirmation.
    pub unconfirmed: u32,
}

/// Drives a [`SoulBatch`] against a ledger: issues the writes it asks for,
/// feeds ledger events back in delivery order and caches ledger reads.
pub struct SoulCollector<Ledger, Events> {
    ledger: Ledger,
    events: Events,
    batch: SoulBatch,
    catalog: Catalog,
    timeline: UnlockTimeline,
    flags_cache: TtlCache<String, U256>,
    souls_cache: TtlCache<String, SessionSouls>,
    last_collection: Option<DateTime<Utc>>,
}

impl<Ledger, Events> SoulCollector<Ledger, Events> {
    pub fn new(ledger: Ledger, events: Events, config: &GameConfig) -> Self {
        Self {
            ledger,
            events,
            batch: SoulBatch::new(config.batch_settings()),
            catalog: Catalog::builtin(),
            timeline: UnlockTimeline::new(),
            flags_cache: TtlCache::new(config.cache_ttl()),
            souls_cache: TtlCache::new(config.cache_ttl()),
            last_collection: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn timeline(&self) -> &UnlockTimeline {
        &self.timeline
    }

    pub fn session(&self) -> Option<&SessionKey> {
        self.batch.session()
    }

    pub fn state(&self) -> &SoulBatchState {
        self.batch.state()
    }

    pub fn phase(&self) -> BatchPhase {
        self.batch.phase()
    }

    pub fn optimistic_count(&self) -> u64 {
        self.batch.optimistic_count()
    }

    pub fn optimistic_points(&self) -> u64 {
        self.batch.optimistic_points()
    }

    pub fn last_collection(&self) -> Option<DateTime<Utc>> {
        self.last_collection
    }
}

impl<Ledger: SoulLedger, Events: EventSource> SoulCollector<Ledger, Events> {
    /// Starts a session and seeds the confirmed count from the ledger.
    pub async fn start_session(&mut self, key: SessionKey) -> Result<()> {
        self.batch.start_session(key.clone());
        self.last_collection = None;
        self.souls_cache.invalidate_all();
        self.flags_cache.invalidate(&identity_key(&key.player));
        self.timeline.clear();
        self.refresh_confirmed(&key).await?;
        Ok(())
    }

    /// Counts one soul. When the batch limit is reached the batch is
    /// submitted; a failed submission is returned as an error but the soul
    /// stays counted.
    pub async fn collect_soul(&mut self) -> Result<CollectOutcome> {
        let Some(request) = self.batch.collect_soul()? else {
            let state = self.batch.state();
            let outcome = if state.pending_submission {
                CollectOutcome::Held {
                    held: state.held_count,
                }
            } else {
                CollectOutcome::Queued {
                    queued: state.queued_count,
                }
            };
            return Ok(outcome);
        };
        let count = request.count;
        let points_awarded = self.send(request).await?;
        Ok(CollectOutcome::Submitted {
            count,
            points_awarded,
        })
    }

    /// Submits the current queue. Returns the points the ledger awarded.
    pub async fn submit_batch(&mut self) -> Result<u64> {
        let request = self.batch.submit_batch()?;
        self.send(request).await
    }

    /// Submits whatever is queued regardless of the batch limit.
    pub async fn force_flush(&mut self) -> Result<Option<u64>> {
        match self.batch.force_flush()? {
            Some(request) => Ok(Some(self.send(request).await?)),
            None => Ok(None),
        }
    }

    /// Flushes the queue, drains the ledger and resets the session. On error
    /// the session stays active so the caller can retry.
    pub async fn end_session(&mut self) -> Result<SessionSummary> {
        let key = self
            .batch
            .session()
            .cloned()
            .ok_or(BatchError::NoActiveSession)?;
        // Souls held behind an in-flight batch need a second round.
        for _ in 0..2 {
            self.sync_events().await?;
            match self.batch.force_flush() {
                Ok(Some(request)) => {
                    self.send(request).await?;
                }
                Ok(None) => {}
                Err(BatchError::SubmissionPending) => {
                    debug!(session = %key, "batch still in flight at session end");
                }
                Err(e) => return Err(e),
            }
            self.ledger.force_flush(&key).await?;
            self.sync_events().await?;
            if self.batch.phase() == BatchPhase::Idle {
                break;
            }
        }

        let state = self.batch.state();
        let summary = SessionSummary {
            session: key,
            confirmed_count: state.confirmed_count,
            confirmed_points: state.confirmed_points,
            unconfirmed: state.queued_count + state.held_count,
        };
        if summary.unconfirmed > 0 {
            warn!(
                session = %summary.session,
                unconfirmed = summary.unconfirmed,
                "session ended with unconfirmed souls"
            );
        }
        info!(
            session = %summary.session,
            confirmed = summary.confirmed_count,
            points = summary.confirmed_points,
            "session ended"
        );
        self.batch.reset();
        Ok(summary)
    }

    async fn send(&mut self, request: BatchRequest) -> Result<u64> {
        let BatchRequest { key, count, forced } = request;
        match self.ledger.batch_submit(&key, count).await {
            Ok(points_awarded) => {
                info!(session = %key, count, forced, points_awarded, "soul batch submitted");
                self.souls_cache.invalidate(&key.cache_key());
                Ok(points_awarded)
            }
            Err(source) => {
                warn!(session = %key, count, %source, "soul batch submission failed");
                self.batch.submission_failed(&key);
                Err(BatchError::SubmissionFailed { count, source })
            }
        }
    }

    /// Applies every event the ledger has already delivered.
    pub async fn sync_events(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Some(event) = self.events.try_next_event() {
            self.handle_event(event).await?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Waits for the next ledger event and applies it.
    pub async fn next_event(&mut self) -> Result<LedgerEvent> {
        let event = self.events.next_event().await?;
        self.handle_event(event.clone()).await?;
        Ok(event)
    }

    pub async fn handle_event(&mut self, event: LedgerEvent) -> Result<()> {
        let Some(key) = self.batch.session().cloned() else {
            debug!(?event, "ledger event without active session");
            return Ok(());
        };
        if event.player() != &key.player {
            debug!(?event, "ignoring ledger event for another player");
            return Ok(());
        }
        self.timeline.record_event(&self.catalog, &event);
        match &event {
            LedgerEvent::SoulCollected(collected) => {
                if collected.session_id == key.session_id {
                    self.last_collection = Some(collected.timestamp);
                }
            }
            LedgerEvent::BatchConfirmed(confirmed) => {
                let reconciliation = self.batch.on_batch_confirmed(confirmed);
                if let Reconciliation::Applied { next, .. } = reconciliation {
                    self.souls_cache.invalidate(&key.cache_key());
                    self.refresh_confirmed(&key).await?;
                    if let Some(request) = next {
                        self.send(request).await?;
                    }
                }
            }
            LedgerEvent::ExperienceGained(_)
            | LedgerEvent::LevelUp(_)
            | LedgerEvent::AchievementUnlocked(_) => {
                self.flags_cache.invalidate(&identity_key(&key.player));
            }
        }
        Ok(())
    }

    async fn refresh_confirmed(&mut self, key: &SessionKey) -> Result<(), LedgerError> {
        let souls = self.session_souls_for(key).await?;
        if souls.last_collection.is_some() {
            self.last_collection = souls.last_collection;
        }
        self.batch.refresh_confirmed(key, souls.confirmed, souls.confirmed_points);
        Ok(())
    }

    async fn session_souls_for(&mut self, key: &SessionKey) -> Result<SessionSouls, LedgerError> {
        let cache_key = key.cache_key();
        if let Some(cached) = self.souls_cache.get(&cache_key) {
            return Ok(cached);
        }
        let souls = self.ledger.session_souls(key).await?;
        self.souls_cache.insert(cache_key, souls.clone());
        Ok(souls)
    }

    pub async fn session_souls(&mut self) -> Result<SessionSouls> {
        let key = self
            .batch
            .session()
            .cloned()
            .ok_or(BatchError::NoActiveSession)?;
        Ok(self.session_souls_for(&key).await?)
    }

    /// Current ledger flags for the active player, served from cache while
    /// fresh. Newly seen unlocks are dated on the timeline.
    pub async fn achievement_flags(&mut self) -> Result<U256> {
        let key = self
            .batch
            .session()
            .cloned()
            .ok_or(BatchError::NoActiveSession)?;
        let cache_key = identity_key(&key.player);
        if let Some(flags) = self.flags_cache.get(&cache_key) {
            return Ok(flags);
        }
        let flags = self.ledger.achievement_flags(&key.player).await?;
        self.flags_cache.insert(cache_key, flags);
        self.timeline.observe_flags(&self.catalog, flags, Utc::now());
        Ok(flags)
    }

    pub async fn achievements(&mut self) -> Result<Vec<AchievementRecord>> {
        let flags = self.achievement_flags().await?;
        Ok(self.catalog.decode_all(flags))
    }

    pub async fn achievement_progress(&mut self) -> Result<(f64, Vec<CategoryProgress>)> {
        let flags = self.achievement_flags().await?;
        Ok((
            self.catalog.progress_percentage(flags),
            self.catalog.category_progress(flags),
        ))
    }
}
