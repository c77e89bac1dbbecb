use super::{
    AchievementCategory,
    catalog::{
        AchievementDef,
        Catalog,
    },
};
use fuels::types::U256;
use serde::Serialize;

/// Catalog entry with its unlock state for one flags value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AchievementRecord {
    pub id: u32,
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub requirement: &'static str,
    pub category: AchievementCategory,
    pub flag_bit: u8,
    pub unlocked: bool,
}

impl AchievementRecord {
    fn decode(def: &AchievementDef, flags: U256) -> Self {
        Self {
            id: def.id,
            key: def.key,
            name: def.name,
            description: def.description,
            requirement: def.requirement,
            category: def.category,
            flag_bit: def.flag_bit,
            unlocked: is_unlocked(flags, def.flag_bit),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryProgress {
    pub category: AchievementCategory,
    pub unlocked: usize,
    pub total: usize,
}

pub fn is_unlocked(flags: U256, flag_bit: u8) -> bool {
    flags.bit(usize::from(flag_bit))
}

pub fn decode_all(flags: U256) -> Vec<AchievementRecord> {
    Catalog::builtin().decode_all(flags)
}

pub fn filter_by_category(
    flags: U256,
    category: AchievementCategory,
) -> Vec<AchievementRecord> {
    Catalog::builtin().filter_by_category(flags, category)
}

pub fn progress_percentage(flags: U256) -> f64 {
    Catalog::builtin().progress_percentage(flags)
}

impl Catalog {
    /// Every catalog entry with its unlock state, ordered by id. Bits without
    /// a catalog entry are ignored.
    pub fn decode_all(&self, flags: U256) -> Vec<AchievementRecord> {
        self.entries()
            .iter()
            .map(|def| AchievementRecord::decode(def, flags))
            .collect()
    }

    pub fn filter_by_category(
        &self,
        flags: U256,
        category: AchievementCategory,
    ) -> Vec<AchievementRecord> {
        self.decode_all(flags)
            .into_iter()
            .filter(|record| record.category == category)
            .collect()
    }

    pub fn unlocked_count(&self, flags: U256) -> usize {
        self.entries()
            .iter()
            .filter(|def| is_unlocked(flags, def.flag_bit))
            .count()
    }

    pub fn progress_percentage(&self, flags: U256) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.unlocked_count(flags) as f64 / self.len() as f64 * 100.0
    }

    pub fn category_progress(&self, flags: U256) -> Vec<CategoryProgress> {
        AchievementCategory::ALL
            .into_iter()
            .map(|category| {
                let in_category = self
                    .entries()
                    .iter()
                    .filter(|def| def.category == category);
                let total = in_category.clone().count();
                let unlocked = in_category
                    .filter(|def| is_unlocked(flags, def.flag_bit))
                    .count();
                CategoryProgress {
                    category,
                    unlocked,
                    total,
                }
            })
            .collect()
    }

    /// Records unlocked in `current` but not in `previous`.
    pub fn newly_unlocked(&self, previous: U256, current: U256) -> Vec<AchievementRecord> {
        self.entries()
            .iter()
            .filter(|def| {
                is_unlocked(current, def.flag_bit) && !is_unlocked(previous, def.flag_bit)
            })
            .map(|def| AchievementRecord::decode(def, current))
            .collect()
    }
}
