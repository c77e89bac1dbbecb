use super::AchievementCategory::{
    self,
    Battle,
    Exploration,
    Level,
    Nft,
    Session,
    Souls,
    Special,
};
use crate::error::CatalogError;
use std::{
    borrow::Cow,
    collections::HashMap,
};

/// Bit positions of the built-in achievements inside the ledger flags.
pub mod bits {
    pub const FIRST_BLOOD: u8 = 0;
    pub const MONSTER_SLAYER: u8 = 1;
    pub const DEMON_HUNTER: u8 = 2;
    pub const BOSS_BREAKER: u8 = 3;
    pub const UNTOUCHABLE: u8 = 4;
    pub const COMBO_MASTER: u8 = 5;

    pub const SOUL_SEEKER: u8 = 16;
    pub const SOUL_GATHERER: u8 = 17;
    pub const SOUL_HARVESTER: u8 = 18;
    pub const SOUL_REAPER: u8 = 19;
    pub const BATCH_RUNNER: u8 = 20;

    pub const WANDERER: u8 = 32;
    pub const CARTOGRAPHER: u8 = 33;
    pub const INTO_THE_DARK: u8 = 34;
    pub const SECRET_KEEPER: u8 = 35;

    pub const APPRENTICE: u8 = 48;
    pub const ADEPT: u8 = 49;
    pub const VETERAN: u8 = 50;
    pub const MASTER: u8 = 51;
    pub const LEGEND: u8 = 52;

    pub const COLLECTOR: u8 = 64;
    pub const CURATOR: u8 = 65;
    pub const HOARDER: u8 = 66;

    pub const FIRST_SCREAM: u8 = 80;
    pub const REGULAR: u8 = 81;
    pub const DEVOTED: u8 = 82;
    pub const MARATHON: u8 = 83;

    pub const EARLY_ADOPTER: u8 = 96;
    pub const NIGHT_OWL: u8 = 97;
    pub const SPEED_DEMON: u8 = 98;
    pub const LUCKY_SEVEN: u8 = 101;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AchievementDef {
    pub id: u32,
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub requirement: &'static str,
    pub category: AchievementCategory,
    pub flag_bit: u8,
}

// Built-in achievements use their flag bit as the stable id.
const fn entry(
    flag_bit: u8,
    key: &'static str,
    name: &'static str,
    description: &'static str,
    requirement: &'static str,
    category: AchievementCategory,
) -> AchievementDef {
    AchievementDef {
        id: flag_bit as u32,
        key,
        name,
        description,
        requirement,
        category,
        flag_bit,
    }
}

/// Built-in catalog, ordered by id.
pub const ACHIEVEMENTS: [AchievementDef; 31] = [
    entry(
        bits::FIRST_BLOOD,
        "FIRST_BLOOD",
        "First Blood",
        "Defeat your first enemy",
        "Defeat 1 enemy",
        Battle,
    ),
    entry(
        bits::MONSTER_SLAYER,
        "MONSTER_SLAYER",
        "Monster Slayer",
        "Defeat ten enemies",
        "Defeat 10 enemies",
        Battle,
    ),
    entry(
        bits::DEMON_HUNTER,
        "DEMON_HUNTER",
        "Demon Hunter",
        "Defeat a hundred enemies",
        "Defeat 100 enemies",
        Battle,
    ),
    entry(
        bits::BOSS_BREAKER,
        "BOSS_BREAKER",
        "Boss Breaker",
        "Bring down a boss",
        "Defeat 1 boss",
        Battle,
    ),
    entry(
        bits::UNTOUCHABLE,
        "UNTOUCHABLE",
        "Untouchable",
        "Win a battle without taking damage",
        "Win 1 flawless battle",
        Battle,
    ),
    entry(
        bits::COMBO_MASTER,
        "COMBO_MASTER",
        "Combo Master",
        "Chain a long combo",
        "Land a 10-hit combo",
        Battle,
    ),
    entry(
        bits::SOUL_SEEKER,
        "SOUL_SEEKER",
        "Soul Seeker",
        "Collect your first soul",
        "Collect 1 soul",
        Souls,
    ),
    entry(
        bits::SOUL_GATHERER,
        "SOUL_GATHERER",
        "Soul Gatherer",
        "Collect a hundred souls",
        "Collect 100 souls",
        Souls,
    ),
    entry(
        bits::SOUL_HARVESTER,
        "SOUL_HARVESTER",
        "Soul Harvester",
        "Collect a thousand souls",
        "Collect 1,000 souls",
        Souls,
    ),
    entry(
        bits::SOUL_REAPER,
        "SOUL_REAPER",
        "Soul Reaper",
        "Collect ten thousand souls",
        "Collect 10,000 souls",
        Souls,
    ),
    entry(
        bits::BATCH_RUNNER,
        "BATCH_RUNNER",
        "Batch Runner",
        "Have a soul batch confirmed on chain",
        "Confirm 1 batch",
        Souls,
    ),
    entry(
        bits::WANDERER,
        "WANDERER",
        "Wanderer",
        "Explore the haunted grounds",
        "Visit 5 locations",
        Exploration,
    ),
    entry(
        bits::CARTOGRAPHER,
        "CARTOGRAPHER",
        "Cartographer",
        "Map every region",
        "Visit all regions",
        Exploration,
    ),
    entry(
        bits::INTO_THE_DARK,
        "INTO_THE_DARK",
        "Into the Dark",
        "Descend into the crypt",
        "Enter the crypt",
        Exploration,
    ),
    entry(
        bits::SECRET_KEEPER,
        "SECRET_KEEPER",
        "Secret Keeper",
        "Discover a hidden room",
        "Find 1 hidden room",
        Exploration,
    ),
    entry(bits::APPRENTICE, "APPRENTICE", "Apprentice", "Reach level 5", "Level 5", Level),
    entry(bits::ADEPT, "ADEPT", "Adept", "Reach level 10", "Level 10", Level),
    entry(bits::VETERAN, "VETERAN", "Veteran", "Reach level 25", "Level 25", Level),
    entry(bits::MASTER, "MASTER", "Master", "Reach level 50", "Level 50", Level),
    entry(bits::LEGEND, "LEGEND", "Legend", "Reach level 100", "Level 100", Level),
    entry(bits::COLLECTOR, "COLLECTOR", "Collector", "Mint your first NFT", "Own 1 NFT", Nft),
    entry(bits::CURATOR, "CURATOR", "Curator", "Build a small collection", "Own 5 NFTs", Nft),
    entry(bits::HOARDER, "HOARDER", "Hoarder", "Build a vault of relics", "Own 25 NFTs", Nft),
    entry(
        bits::FIRST_SCREAM,
        "FIRST_SCREAM",
        "First Scream",
        "Finish your first session",
        "Complete 1 session",
        Session,
    ),
    entry(bits::REGULAR, "REGULAR", "Regular", "Keep coming back", "Complete 10 sessions", Session),
    entry(
        bits::DEVOTED,
        "DEVOTED",
        "Devoted",
        "Haunt the game for good",
        "Complete 50 sessions",
        Session,
    ),
    entry(
        bits::MARATHON,
        "MARATHON",
        "Marathon",
        "Play every day for a week",
        "7-day streak",
        Session,
    ),
    entry(
        bits::EARLY_ADOPTER,
        "EARLY_ADOPTER",
        "Early Adopter",
        "Joined during the first season",
        "Play in season 1",
        Special,
    ),
    entry(
        bits::NIGHT_OWL,
        "NIGHT_OWL",
        "Night Owl",
        "Play in the witching hours",
        "Play between 00:00 and 04:00",
        Special,
    ),
    entry(
        bits::SPEED_DEMON,
        "SPEED_DEMON",
        "Speed Demon",
        "Reap fast in a single session",
        "Collect 100 souls in 1 session",
        Special,
    ),
    entry(
        bits::LUCKY_SEVEN,
        "LUCKY_SEVEN",
        "Lucky Seven",
        "Hit the lucky number",
        "Collect exactly 777 souls",
        Special,
    ),
];

const fn is_well_formed(entries: &[AchievementDef]) -> bool {
    let mut i = 0;
    while i < entries.len() {
        let current = &entries[i];
        if !current.category.contains_bit(current.flag_bit) {
            return false;
        }
        if i > 0 && entries[i - 1].id >= current.id {
            return false;
        }
        let mut j = i + 1;
        while j < entries.len() {
            if entries[j].flag_bit == current.flag_bit {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(
    is_well_formed(&ACHIEVEMENTS),
    "built-in achievements need ascending unique ids and unique in-range bits"
);

/// Validated set of achievement definitions, always ordered by id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    entries: Cow<'static, [AchievementDef]>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            entries: Cow::Borrowed(&ACHIEVEMENTS),
        }
    }

    pub fn new(mut entries: Vec<AchievementDef>) -> Result<Self, CatalogError> {
        entries.sort_by_key(|def| def.id);
        let mut bit_owners: HashMap<u8, u32> = HashMap::new();
        for (index, def) in entries.iter().enumerate() {
            if index > 0 && entries[index - 1].id == def.id {
                return Err(CatalogError::DuplicateId { id: def.id });
            }
            if !def.category.contains_bit(def.flag_bit) {
                return Err(CatalogError::BitOutsideCategory {
                    id: def.id,
                    bit: def.flag_bit,
                    category: def.category,
                });
            }
            if let Some(first) = bit_owners.insert(def.flag_bit, def.id) {
                return Err(CatalogError::DuplicateBit {
                    bit: def.flag_bit,
                    first,
                    second: def.id,
                });
            }
        }
        Ok(Self {
            entries: Cow::Owned(entries),
        })
    }

    pub fn entries(&self) -> &[AchievementDef] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_id(&self, id: u32) -> Option<&AchievementDef> {
        self.entries
            .binary_search_by_key(&id, |def| def.id)
            .ok()
            .map(|index| &self.entries[index])
    }

    pub fn by_bit(&self, flag_bit: u8) -> Option<&AchievementDef> {
        self.entries.iter().find(|def| def.flag_bit == flag_bit)
    }

    pub fn by_key(&self, key: &str) -> Option<&AchievementDef> {
        self.entries.iter().find(|def| def.key.eq_ignore_ascii_case(key))
    }
}
