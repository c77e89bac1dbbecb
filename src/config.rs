use crate::{
    batch::BatchSettings,
    error::ConfigError,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::Path,
    time::Duration,
};

pub const DEFAULT_BATCH_LIMIT: u32 = 10;
pub const DEFAULT_POINTS_PER_SOUL: u64 = 10;
pub const DEFAULT_CACHE_TTL_MS: u64 = 5_000;

/// Game-balance knobs. Every field has a default so partial config files are
/// accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub batch_limit: u32,
    pub points_per_soul: u64,
    pub cache_ttl_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_BATCH_LIMIT,
            points_per_soul: DEFAULT_POINTS_PER_SOUL,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
        }
    }
}

impl GameConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&raw)?;
        tracing::info!(?path, ?config, "loaded game config");
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_limit == 0 {
            return Err(ConfigError::Invalid("batch_limit must be at least 1"));
        }
        if self.points_per_soul == 0 {
            return Err(ConfigError::Invalid("points_per_soul must be at least 1"));
        }
        Ok(())
    }

    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            batch_limit: self.batch_limit,
            points_per_soul: self.points_per_soul,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn from_json_str__fills_missing_fields_with_defaults() {
        // given
        let raw = r#"{ "batch_limit": 25 }"#;

        // when
        let config = GameConfig::from_json_str(raw).unwrap();

        // then
        assert_eq!(config.batch_limit, 25);
        assert_eq!(config.points_per_soul, DEFAULT_POINTS_PER_SOUL);
        assert_eq!(config.cache_ttl_ms, DEFAULT_CACHE_TTL_MS);
    }

    #[test]
    fn from_json_str__rejects_zero_batch_limit() {
        let raw = r#"{ "batch_limit": 0 }"#;

        let err = GameConfig::from_json_str(raw).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn from_json_str__rejects_malformed_json() {
        let err = GameConfig::from_json_str("{ batch_limit: ").unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load__reports_missing_file() {
        let err = GameConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
