//! Highscore table

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use super::supabase::{SupabaseClient, SupabaseError};

const TABLE: &str = "highscores";
pub const MAX_USERNAME_CHARS: usize = 16;
pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighscoreEntry {
    pub username: String,
    pub score: u32,
    /// YYYY-MM-DD
    pub date: String,
    /// HH:MM:SS
    pub time: String,
}

impl HighscoreEntry {
    /// Stamp a submission. `None` when the name is blank after trimming.
    pub fn stamped<Tz: TimeZone>(username: &str, score: u32, at: &DateTime<Tz>) -> Option<Self>
    where
        Tz::Offset: std::fmt::Display,
    {
        let username = normalize_username(username)?;
        Some(Self {
            username,
            score,
            date: at.format("%Y-%m-%d").to_string(),
            time: at.format("%H:%M:%S").to_string(),
        })
    }
}

/// Trim and cut to the display limit
pub fn normalize_username(raw: &str) -> Option<String> {
    let trimmed: String = raw.trim().chars().take(MAX_USERNAME_CHARS).collect();
    let trimmed = trimmed.trim_end().to_string();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[derive(Clone)]
pub struct HighscoreStore {
    client: SupabaseClient,
}

impl HighscoreStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Best scores first
    pub async fn fetch_highscores(&self, limit: usize) -> Result<Vec<HighscoreEntry>, SupabaseError> {
        let limit = limit.clamp(1, MAX_LIMIT);
        let query = format!("select=username,score,date,time&order=score.desc&limit={limit}");
        self.client.select(TABLE, &query).await
    }

    /// Returns the stored row, or `None` if the name was blank and nothing was written
    pub async fn submit_highscore(
        &self,
        username: &str,
        score: u32,
    ) -> Result<Option<HighscoreEntry>, SupabaseError> {
        let Some(entry) = HighscoreEntry::stamped(username, score, &chrono::Local::now()) else {
            return Ok(None);
        };
        self.client.insert(TABLE, &entry).await?;
        Ok(Some(entry))
    }
}
