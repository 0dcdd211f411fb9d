//! Time utilities for play simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 60; // one tick per display frame
pub const SNAPSHOT_TPS: u32 = 30;

/// Largest frame delta the engine will integrate in one tick (seconds).
/// Longer stalls (tab backgrounding, scheduler hiccups) are truncated.
pub const MAX_FRAME_DELTA: f32 = 0.05;

/// Clamp a measured frame delta into `[0, MAX_FRAME_DELTA]`
pub fn clamp_frame_delta(seconds: f32) -> f32 {
    if seconds.is_finite() {
        seconds.clamp(0.0, MAX_FRAME_DELTA)
    } else {
        0.0
    }
}

/// Simulation clock.
///
/// Advanced only by the deltas the engine integrates, so every stun, tackle
/// and rush window measured against it stands still while play is paused.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    now: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation time in seconds
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn advance(&mut self, dt: f32) {
        self.now += f64::from(dt.max(0.0));
    }
}

/// Measures wall-clock frame deltas for the tick loop.
///
/// The baseline can be invalidated (on pause/resume) so the next frame
/// integrates nothing instead of the whole paused span.
#[derive(Debug, Clone, Default)]
pub struct FrameTimer {
    last_frame: Option<Instant>,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamped seconds since the previous frame (0 on the first frame)
    pub fn frame_delta(&mut self, now: Instant) -> f32 {
        let delta = self
            .last_frame
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_frame = Some(now);
        clamp_frame_delta(delta)
    }

    pub fn invalidate(&mut self) {
        self.last_frame = None;
    }
}
