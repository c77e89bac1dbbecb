use chrono::{
    DateTime,
    Utc,
};
use fuels::types::Identity;
use serde::{
    Deserialize,
    Serialize,
};

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub enum LedgerEvent {
    SoulCollected(SoulCollectedEvent),
    BatchConfirmed(BatchConfirmedEvent),
    ExperienceGained(ExperienceGainedEvent),
    LevelUp(LevelUpEvent),
    AchievementUnlocked(AchievementUnlockedEvent),
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct SoulCollectedEvent {
    pub player: Identity,
    pub session_id: u64,
    pub count: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfirmedEvent {
    pub player: Identity,
    pub session_id: u64,
    pub total_points: u64,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceGainedEvent {
    pub player: Identity,
    pub amount: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct LevelUpEvent {
    pub player: Identity,
    pub new_level: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct AchievementUnlockedEvent {
    pub player: Identity,
    pub flag_bit: u8,
    pub timestamp: DateTime<Utc>,
}

impl LedgerEvent {
    pub fn soul_collected(
        player: Identity,
        session_id: u64,
        count: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        LedgerEvent::SoulCollected(SoulCollectedEvent {
            player,
            session_id,
            count,
            timestamp,
        })
    }

    pub fn batch_confirmed(player: Identity, session_id: u64, total_points: u64) -> Self {
        LedgerEvent::BatchConfirmed(BatchConfirmedEvent {
            player,
            session_id,
            total_points,
        })
    }

    pub fn experience_gained(
        player: Identity,
        amount: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        LedgerEvent::ExperienceGained(ExperienceGainedEvent {
            player,
            amount,
            timestamp,
        })
    }

    pub fn level_up(player: Identity, new_level: u32, timestamp: DateTime<Utc>) -> Self {
        LedgerEvent::LevelUp(LevelUpEvent {
            player,
            new_level,
            timestamp,
        })
    }

    pub fn achievement_unlocked(
        player: Identity,
        flag_bit: u8,
        timestamp: DateTime<Utc>,
    ) -> Self {
        LedgerEvent::AchievementUnlocked(AchievementUnlockedEvent {
            player,
            flag_bit,
            timestamp,
        })
    }

    pub fn player(&self) -> &Identity {
        match self {
            LedgerEvent::SoulCollected(event) => &event.player,
            LedgerEvent::BatchConfirmed(event) => &event.player,
            LedgerEvent::ExperienceGained(event) => &event.player,
            LedgerEvent::LevelUp(event) => &event.player,
            LedgerEvent::AchievementUnlocked(event) => &event.player,
        }
    }

    /// Timestamp of progression events used to date achievement unlocks.
    pub fn progress_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            LedgerEvent::ExperienceGained(event) => Some(event.timestamp),
            LedgerEvent::LevelUp(event) => Some(event.timestamp),
            _ => None,
        }
    }
}
