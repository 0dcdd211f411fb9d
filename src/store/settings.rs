//! Per-user key-value settings

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::Difficulty;
use crate::game::roster::{DEFAULT_YARD_LINE, YARDS_PER_FIELD};

use super::highscores::normalize_username;

/// Keys a client may store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    Difficulty,
    YardLine,
    PlayerName,
}

impl SettingKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Difficulty => "difficulty",
            Self::YardLine => "yard_line",
            Self::PlayerName => "player_name",
        }
    }

    /// Canonical stored form of `raw`
    fn normalize(self, raw: &str) -> Result<String, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidValue {
            key: self.as_str(),
            reason: reason.to_string(),
        };
        match self {
            Self::Difficulty => raw
                .trim()
                .parse::<u8>()
                .ok()
                .and_then(Difficulty::from_level)
                .map(|d| d.level().to_string())
                .ok_or_else(|| invalid("expected 1, 2 or 3")),
            Self::YardLine => raw
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|y| y.is_finite() && (0.0..=YARDS_PER_FIELD).contains(y))
                .map(|y| y.round().to_string())
                .ok_or_else(|| invalid("expected a yard line between 0 and 100")),
            Self::PlayerName => normalize_username(raw).ok_or_else(|| invalid("name is empty")),
        }
    }
}

impl FromStr for SettingKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "difficulty" => Ok(Self::Difficulty),
            "yard_line" => Ok(Self::YardLine),
            "player_name" => Ok(Self::PlayerName),
            other => Err(StoreError::UnknownKey(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("unknown setting {0:?}")]
    UnknownKey(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// In-process settings, keyed by owner (user id or anonymous session id)
#[derive(Default)]
pub struct SettingsStore {
    entries: DashMap<String, BTreeMap<SettingKey, String>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: &str, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.parse::<SettingKey>()?;
        Ok(self
            .entries
            .get(owner)
            .and_then(|settings| settings.get(&key).cloned()))
    }

    pub fn list(&self, owner: &str) -> BTreeMap<&'static str, String> {
        self.entries
            .get(owner)
            .map(|settings| {
                settings
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Validate and store. Returns the stored (normalized) value.
    pub fn put(&self, owner: &str, key: &str, value: &str) -> Result<String, StoreError> {
        let key = key.parse::<SettingKey>()?;
        let value = key.normalize(value)?;
        self.entries
            .entry(owner.to_string())
            .or_default()
            .insert(key, value.clone());
        Ok(value)
    }

    /// Returns whether anything was removed
    pub fn delete(&self, owner: &str, key: &str) -> Result<bool, StoreError> {
        let key = key.parse::<SettingKey>()?;
        Ok(self
            .entries
            .get_mut(owner)
            .is_some_and(|mut settings| settings.remove(&key).is_some()))
    }

    /// Drop everything stored for `owner`
    pub fn forget(&self, owner: &str) -> bool {
        self.entries.remove(owner).is_some()
    }

    pub fn owners(&self) -> usize {
        self.entries.len()
    }

    pub fn difficulty(&self, owner: &str, fallback: Difficulty) -> Difficulty {
        self.typed(owner, SettingKey::Difficulty)
            .and_then(|raw| raw.parse::<u8>().ok())
            .and_then(Difficulty::from_level)
            .unwrap_or(fallback)
    }

    /// Persisted line of scrimmage, the 25 when unset
    pub fn yard_line(&self, owner: &str) -> f32 {
        self.typed(owner, SettingKey::YardLine)
            .and_then(|raw| raw.parse::<f32>().ok())
            .unwrap_or(DEFAULT_YARD_LINE)
    }

    pub fn save_yard_line(&self, owner: &str, yard_line: f32) -> Result<String, StoreError> {
        self.put(owner, SettingKey::YardLine.as_str(), &yard_line.to_string())
    }

    pub fn player_name(&self, owner: &str) -> Option<String> {
        self.typed(owner, SettingKey::PlayerName)
    }

    fn typed(&self, owner: &str, key: SettingKey) -> Option<String> {
        self.entries
            .get(owner)
            .and_then(|settings| settings.get(&key).cloned())
    }
}
