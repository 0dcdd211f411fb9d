//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::SessionRegistry;
use crate::store::{HighscoreStore, SettingsStore, SupabaseClient};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub highscores: HighscoreStore,
    pub settings: Arc<SettingsStore>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let supabase = SupabaseClient::new(&config);

        Self {
            highscores: HighscoreStore::new(supabase),
            settings: Arc::new(SettingsStore::new()),
            sessions: Arc::new(SessionRegistry::new()),
            config,
        }
    }
}
