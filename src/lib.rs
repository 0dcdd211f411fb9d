//! Gridiron Server - authoritative play simulation for a route-drawing
//! football mini-game
//!
//! - `game`: the play engine and per-connection session loop
//! - `ws`: wire protocol and WebSocket plumbing
//! - `http`: health, highscore and settings routes
//! - `store`: Supabase highscores and per-user settings

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod store;
pub mod util;
pub mod ws;
