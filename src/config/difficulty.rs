//! Difficulty table keyed by integer level

use serde::{Deserialize, Serialize};

/// Selectable difficulty levels (persisted as 1, 2, 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

impl Difficulty {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Easy),
            2 => Some(Self::Medium),
            3 => Some(Self::Hard),
            _ => None,
        }
    }

    /// Parse a persisted level, falling back to Medium on anything unknown
    pub fn from_level_or_default(level: u8) -> Self {
        Self::from_level(level).unwrap_or_default()
    }

    pub fn level(self) -> u8 {
        match self {
            Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard => 3,
        }
    }

    pub fn config(self) -> DifficultyConfig {
        DifficultyConfig::for_difficulty(self)
    }
}

/// Per-difficulty tuning for the defense
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DifficultyConfig {
    /// Display name
    pub name: &'static str,
    /// Multiplier on every defender's base speed
    pub def_speed_mult: f32,
    /// Lower bound of the per-down rush delay (seconds)
    pub rush_delay_min: f32,
    /// Upper bound of the per-down rush delay (seconds)
    pub rush_delay_max: f32,
    /// How hard pass-rushers drive through blockers once the rush is on
    pub rush_push_through: f32,
    /// Seconds of sustained contact needed to finish a tackle
    pub tackle_hold: f32,
    /// Distance (px) from a bullet's line within which a defender swats it
    pub interception_radius: f32,
}

impl DifficultyConfig {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                name: "Easy",
                def_speed_mult: 0.9,
                rush_delay_min: 4.0,
                rush_delay_max: 8.0,
                rush_push_through: 0.4,
                tackle_hold: 1.2,
                interception_radius: 10.0,
            },
            Difficulty::Medium => Self {
                name: "Medium",
                def_speed_mult: 1.15,
                rush_delay_min: 2.0,
                rush_delay_max: 5.0,
                rush_push_through: 0.8,
                tackle_hold: 0.8,
                interception_radius: 20.0,
            },
            Difficulty::Hard => Self {
                name: "Hard",
                def_speed_mult: 1.35,
                rush_delay_min: 1.0,
                rush_delay_max: 2.5,
                rush_push_through: 1.0,
                tackle_hold: 0.4,
                interception_radius: 35.0,
            },
        }
    }
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self::for_difficulty(Difficulty::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_round_trip_and_fall_back() {
        for level in 1..=3 {
            let difficulty = Difficulty::from_level(level).unwrap();
            assert_eq!(difficulty.level(), level);
        }
        assert_eq!(Difficulty::from_level(0), None);
        assert_eq!(Difficulty::from_level_or_default(9).config().name, "Medium");
    }

    #[test]
    fn test_harder_levels_tighten_the_defense() {
        let easy = Difficulty::Easy.config();
        let hard = Difficulty::Hard.config();
        assert!(hard.def_speed_mult > easy.def_speed_mult);
        assert!(hard.tackle_hold < easy.tackle_hold);
        assert!(hard.interception_radius > easy.interception_radius);
        assert!(hard.rush_delay_max < easy.rush_delay_min);
    }
}
