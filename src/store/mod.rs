//! Persistence: Supabase-backed highscores and in-process settings

pub mod highscores;
pub mod settings;
pub mod supabase;

pub use highscores::{HighscoreEntry, HighscoreStore};
pub use settings::{SettingsStore, StoreError};
pub use supabase::{SupabaseClient, SupabaseError};
