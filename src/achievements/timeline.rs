use super::{
    catalog::Catalog,
    decoder::AchievementRecord,
};
use crate::events::LedgerEvent;
use chrono::{
    DateTime,
    Utc,
};
use fuels::types::U256;
use std::collections::BTreeMap;

/// Best-effort unlock dates. The ledger only stores unlock bits, so an
/// unlock is dated by the most recent progression event seen before the
/// flags changed.
#[derive(Clone, Debug, Default)]
pub struct UnlockTimeline {
    last_flags: Option<U256>,
    last_progress_at: Option<DateTime<Utc>>,
    unlocked_at: BTreeMap<u32, DateTime<Utc>>,
}

impl UnlockTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_flags(&self) -> Option<U256> {
        self.last_flags
    }

    pub fn unlocked_at(&self, id: u32) -> Option<DateTime<Utc>> {
        self.unlocked_at.get(&id).copied()
    }

    pub fn dated_unlocks(&self) -> impl Iterator<Item = (u32, DateTime<Utc>)> + '_ {
        self.unlocked_at.iter().map(|(id, at)| (*id, *at))
    }

    pub fn record_event(&mut self, catalog: &Catalog, event: &LedgerEvent) {
        if let Some(at) = event.progress_timestamp() {
            self.last_progress_at = Some(self.last_progress_at.map_or(at, |prev| prev.max(at)));
        }
        if let LedgerEvent::AchievementUnlocked(unlock) = event
            && let Some(def) = catalog.by_bit(unlock.flag_bit)
        {
            self.unlocked_at.entry(def.id).or_insert(unlock.timestamp);
        }
    }

    /// Compares `flags` with the previous observation and dates anything new.
    /// The first observation only sets the baseline.
    pub fn observe_flags(
        &mut self,
        catalog: &Catalog,
        flags: U256,
        observed_at: DateTime<Utc>,
    ) -> Vec<AchievementRecord> {
        let Some(previous) = self.last_flags.replace(flags) else {
            return Vec::new();
        };
        let fresh = catalog.newly_unlocked(previous, flags);
        let stamp = self.last_progress_at.unwrap_or(observed_at);
        for record in &fresh {
            self.unlocked_at.entry(record.id).or_insert(stamp);
            tracing::info!(achievement = record.key, %stamp, "achievement unlocked");
        }
        fresh
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::achievements::catalog::bits;
    use chrono::TimeZone;
    use fuels::types::{
        Address,
        Identity,
    };

    fn player() -> Identity {
        Identity::Address(Address::from([3u8; 32]))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn bit(position: u8) -> U256 {
        let mut words = [0u64; 4];
        words[usize::from(position / 64)] = 1u64 << (position % 64);
        U256(words)
    }

    #[test]
    fn observe_flags__first_observation_is_baseline() {
        let catalog = Catalog::builtin();
        let mut timeline = UnlockTimeline::new();

        let fresh = timeline.observe_flags(&catalog, bit(bits::FIRST_BLOOD), at(10));

        assert!(fresh.is_empty());
        assert_eq!(timeline.unlocked_at(0), None);
        assert_eq!(timeline.last_flags(), Some(bit(bits::FIRST_BLOOD)));
    }

    #[test]
    fn observe_flags__dates_new_unlock_with_latest_progress_event() {
        // given
        let catalog = Catalog::builtin();
        let mut timeline = UnlockTimeline::new();
        timeline.observe_flags(&catalog, U256::zero(), at(0));
        timeline.record_event(&catalog, &LedgerEvent::experience_gained(player(), 50, at(100)));
        timeline.record_event(&catalog, &LedgerEvent::level_up(player(), 5, at(120)));

        // when
        let fresh = timeline.observe_flags(&catalog, bit(bits::APPRENTICE), at(500));

        // then
        assert_eq!(fresh.len(), 1);
        assert_eq!(timeline.unlocked_at(u32::from(bits::APPRENTICE)), Some(at(120)));
    }

    #[test]
    fn observe_flags__falls_back_to_observation_time() {
        let catalog = Catalog::builtin();
        let mut timeline = UnlockTimeline::new();
        timeline.observe_flags(&catalog, U256::zero(), at(0));

        timeline.observe_flags(&catalog, bit(bits::NIGHT_OWL), at(42));

        assert_eq!(timeline.unlocked_at(u32::from(bits::NIGHT_OWL)), Some(at(42)));
    }

    #[test]
    fn record_event__explicit_unlock_event_wins_over_inference() {
        // given
        let catalog = Catalog::builtin();
        let mut timeline = UnlockTimeline::new();
        timeline.observe_flags(&catalog, U256::zero(), at(0));

        // when
        timeline.record_event(
            &catalog,
            &LedgerEvent::achievement_unlocked(player(), bits::LUCKY_SEVEN, at(77)),
        );
        timeline.observe_flags(&catalog, bit(bits::LUCKY_SEVEN), at(900));

        // then
        assert_eq!(timeline.unlocked_at(u32::from(bits::LUCKY_SEVEN)), Some(at(77)));
        assert_eq!(timeline.dated_unlocks().count(), 1);
    }
}
