use super::{
    ChannelEventSource,
    SessionSouls,
    SoulLedger,
};
use crate::{
    config::DEFAULT_POINTS_PER_SOUL,
    error::LedgerError,
    events::LedgerEvent,
    session::{
        SessionKey,
        identity_key,
    },
};
use chrono::Utc;
use fuels::types::{
    Identity,
    U256,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};
use tokio::sync::mpsc;

const XP_PER_LEVEL: u64 = 100;

#[derive(Debug, Default)]
struct LedgerBook {
    sessions: HashMap<String, SessionSouls>,
    flags: HashMap<String, U256>,
    experience: HashMap<String, u64>,
    failures_to_inject: u32,
    submissions: u32,
}

/// Local stand-in for the on-chain game contracts.
///
/// With `confirm_immediately` set, every accepted batch is confirmed right
/// away. Otherwise batches wait in `pending_batch` until `force_flush`.
#[derive(Clone)]
pub struct InMemoryLedger {
    book: Arc<Mutex<LedgerBook>>,
    events: mpsc::UnboundedSender<LedgerEvent>,
    points_per_soul: u64,
    confirm_immediately: bool,
}

impl InMemoryLedger {
    pub fn new_with_events() -> (Self, ChannelEventSource) {
        Self::with_points_per_soul(DEFAULT_POINTS_PER_SOUL)
    }

    pub fn with_points_per_soul(points_per_soul: u64) -> (Self, ChannelEventSource) {
        let (source, events) = ChannelEventSource::new_with_sender();
        let ledger = Self {
            book: Arc::new(Mutex::new(LedgerBook::default())),
            events,
            points_per_soul,
            confirm_immediately: true,
        };
        (ledger, source)
    }

    pub fn deferred_confirmations(mut self) -> Self {
        self.confirm_immediately = false;
        self
    }

    /// Makes the next `count` batch submissions fail before touching state.
    pub fn fail_next_submissions(&self, count: u32) -> Result<(), LedgerError> {
        self.book()?.failures_to_inject = count;
        Ok(())
    }

    /// Number of accepted batch writes.
    pub fn submissions(&self) -> Result<u32, LedgerError> {
        Ok(self.book()?.submissions)
    }

    pub fn set_achievement_flags(
        &self,
        player: &Identity,
        flags: U256,
    ) -> Result<(), LedgerError> {
        self.book()?.flags.insert(identity_key(player), flags);
        Ok(())
    }

    pub fn unlock_achievement(&self, player: &Identity, flag_bit: u8) -> Result<(), LedgerError> {
        let mut words = [0u64; 4];
        words[usize::from(flag_bit / 64)] = 1u64 << (flag_bit % 64);
        {
            let mut book = self.book()?;
            let flags = book
                .flags
                .entry(identity_key(player))
                .or_insert_with(U256::zero);
            *flags = *flags | U256(words);
        }
        self.emit(LedgerEvent::achievement_unlocked(
            player.clone(),
            flag_bit,
            Utc::now(),
        ));
        Ok(())
    }

    /// Adds experience and emits `LevelUp` whenever a level boundary is
    /// crossed.
    pub fn grant_experience(&self, player: &Identity, amount: u64) -> Result<u32, LedgerError> {
        let (before, after) = {
            let mut book = self.book()?;
            let total = book.experience.entry(identity_key(player)).or_default();
            let before = *total;
            *total += amount;
            (before, *total)
        };
        let now = Utc::now();
        self.emit(LedgerEvent::experience_gained(player.clone(), amount, now));
        let old_level = level_for(before);
        let new_level = level_for(after);
        if new_level > old_level {
            self.emit(LedgerEvent::level_up(player.clone(), new_level, now));
        }
        Ok(new_level)
    }

    fn book(&self) -> Result<MutexGuard<'_, LedgerBook>, LedgerError> {
        self.book
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger state poisoned".to_string()))
    }

    fn emit(&self, event: LedgerEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("no event subscriber, dropping ledger event");
        }
    }
}

fn level_for(experience: u64) -> u32 {
    u32::try_from(experience / XP_PER_LEVEL + 1).unwrap_or(u32::MAX)
}

impl SoulLedger for InMemoryLedger {
    async fn session_souls(&self, key: &SessionKey) -> Result<SessionSouls, LedgerError> {
        Ok(self
            .book()?
            .sessions
            .get(&key.cache_key())
            .cloned()
            .unwrap_or_default())
    }

    async fn batch_submit(&self, key: &SessionKey, count: u32) -> Result<u64, LedgerError> {
        let now = Utc::now();
        let points_total = {
            let mut book = self.book()?;
            if book.failures_to_inject > 0 {
                book.failures_to_inject -= 1;
                return Err(LedgerError::Rejected(format!(
                    "injected failure for {count} soul(s)"
                )));
            }
            book.submissions += 1;
            let souls = book.sessions.entry(key.cache_key()).or_default();
            souls.last_collection = Some(now);
            if self.confirm_immediately {
                souls.confirmed += u64::from(count);
                souls.confirmed_points = souls.confirmed * self.points_per_soul;
                Some(souls.confirmed_points)
            } else {
                souls.pending_batch += count;
                None
            }
        };
        tracing::debug!(session = %key, count, "ledger accepted soul batch");
        self.emit(LedgerEvent::soul_collected(
            key.player.clone(),
            key.session_id,
            count,
            now,
        ));
        if let Some(total_points) = points_total {
            self.emit(LedgerEvent::batch_confirmed(
                key.player.clone(),
                key.session_id,
                total_points,
            ));
        }
        Ok(u64::from(count) * self.points_per_soul)
    }

    async fn force_flush(&self, key: &SessionKey) -> Result<(), LedgerError> {
        let total_points = {
            let mut book = self.book()?;
            let Some(souls) = book.sessions.get_mut(&key.cache_key()) else {
                return Ok(());
            };
            if souls.pending_batch == 0 {
                return Ok(());
            }
            souls.confirmed += u64::from(std::mem::take(&mut souls.pending_batch));
            souls.confirmed_points = souls.confirmed * self.points_per_soul;
            souls.confirmed_points
        };
        self.emit(LedgerEvent::batch_confirmed(
            key.player.clone(),
            key.session_id,
            total_points,
        ));
        Ok(())
    }

    async fn achievement_flags(&self, player: &Identity) -> Result<U256, LedgerError> {
        Ok(self
            .book()?
            .flags
            .get(&identity_key(player))
            .copied()
            .unwrap_or_else(U256::zero))
    }
}
