//! Achievement metadata and decoding of the ledger's 256-bit unlock flags.
//!
//! The ledger stores one bit per achievement. Names, descriptions and
//! thresholds live in the client-side [`catalog`].

use crate::error::CatalogError;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};

pub mod catalog;
pub mod decoder;
pub mod timeline;

pub use catalog::{
    ACHIEVEMENTS,
    AchievementDef,
    Catalog,
};
pub use decoder::{
    AchievementRecord,
    CategoryProgress,
    decode_all,
    filter_by_category,
    is_unlocked,
    progress_percentage,
};
pub use timeline::UnlockTimeline;

/// Width of each category's reserved bit range.
pub const CATEGORY_BITS: u8 = 16;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    Battle,
    Souls,
    Exploration,
    Level,
    Nft,
    Session,
    Special,
}

impl AchievementCategory {
    pub const ALL: [AchievementCategory; 7] = [
        AchievementCategory::Battle,
        AchievementCategory::Souls,
        AchievementCategory::Exploration,
        AchievementCategory::Level,
        AchievementCategory::Nft,
        AchievementCategory::Session,
        AchievementCategory::Special,
    ];

    pub const fn first_bit(self) -> u8 {
        match self {
            AchievementCategory::Battle => 0,
            AchievementCategory::Souls => 16,
            AchievementCategory::Exploration => 32,
            AchievementCategory::Level => 48,
            AchievementCategory::Nft => 64,
            AchievementCategory::Session => 80,
            AchievementCategory::Special => 96,
        }
    }

    pub const fn last_bit(self) -> u8 {
        self.first_bit() + CATEGORY_BITS - 1
    }

    pub const fn contains_bit(self, bit: u8) -> bool {
        bit >= self.first_bit() && bit <= self.last_bit()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AchievementCategory::Battle => "battle",
            AchievementCategory::Souls => "souls",
            AchievementCategory::Exploration => "exploration",
            AchievementCategory::Level => "level",
            AchievementCategory::Nft => "nft",
            AchievementCategory::Session => "session",
            AchievementCategory::Special => "special",
        }
    }
}

impl fmt::Display for AchievementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementCategory {
    type Err = CatalogError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase();
        AchievementCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| CatalogError::UnknownCategory(raw.to_string()))
    }
}
