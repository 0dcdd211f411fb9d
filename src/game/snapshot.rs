//! Snapshot building for network transmission

use crate::ws::protocol::{
    BallSnapshot, FieldSnapshot, GameEvent, PlaySnapshot, PlayerSnapshot, ServerMsg,
};

use super::flight::{jump_offset, throw_targets};
use super::play::GameState;

/// Builds render snapshots at a fixed tick interval
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot message
    pub fn build(&self, tick: u64, state: &GameState, events: Vec<GameEvent>) -> ServerMsg {
        ServerMsg::Snapshot(render(tick, state, events))
    }
}

/// Read-only view of the state; nothing here feeds back into the simulation
pub fn render(tick: u64, state: &GameState, events: Vec<GameEvent>) -> PlaySnapshot {
    let now = state.clock.now();
    let field = &state.field;

    let players = state
        .roster
        .players
        .iter()
        .map(|p| PlayerSnapshot {
            id: p.id,
            team: p.team,
            role: p.role,
            x: p.pos.x,
            y: p.pos.y,
            has_ball: p.has_ball,
            stunned: state.contact.is_stunned(p.id, now),
            jump_offset: jump_offset(p, now),
            path: if p.is_offense() {
                p.path.clone()
            } else {
                Vec::new()
            },
        })
        .collect();

    let ball = state.flight.as_ref().map(|f| BallSnapshot {
        x: f.pos.x,
        y: f.pos.y,
        shadow_x: f.shadow.x,
        shadow_y: f.shadow.y,
        kind: f.kind,
        progress: f.progress,
    });

    PlaySnapshot {
        tick,
        phase: state.phase,
        paused: state.paused,
        routing: state.is_routing(),
        timer_text: state.timer_text(),
        field: FieldSnapshot {
            width: field.width,
            height: field.height,
            top_y: field.top_y,
            bottom_y: field.bottom_y,
            pixels_per_yard: field.pixels_per_yard,
        },
        line_of_scrimmage_y: state.los_y,
        line_to_gain_y: state.downs.line_to_gain_y,
        downs: state.downs.panel(field, &state.stats),
        stats: state.stats,
        formation: state.formation,
        difficulty: state.config().name.to_string(),
        players,
        ball,
        throw_targets: throw_targets(&state.roster),
        events,
    }
}
