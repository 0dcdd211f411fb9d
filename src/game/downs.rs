//! Down and distance, scoring, tackles and the pass-rush clock

use serde::{Deserialize, Serialize};

use super::contact::ContactState;
use super::roster::{Field, PlayerId, Roster, DEFAULT_YARD_LINE};

/// Defender within this distance of the carrier is making a tackle
pub const TACKLE_DISTANCE: f32 = 22.0;
pub const TOUCHDOWN_POINTS: u32 = 7;
pub const YARDS_FOR_FIRST_DOWN: f32 = 10.0;
pub const MAX_DOWNS: u8 = 4;

/// Team score for the current game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub score: u32,
    pub touchdowns: u32,
}

/// How a down ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayOutcome {
    Tackled { first_down: bool },
    TurnoverOnDowns,
    Touchdown,
    Intercepted { by: PlayerId },
}

impl PlayOutcome {
    pub fn ends_game(self) -> bool {
        matches!(self, PlayOutcome::TurnoverOnDowns | PlayOutcome::Intercepted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownsState {
    pub down: u8,
    pub line_to_gain_y: f32,
    pub ball_spot_y: f32,
    pub play_ended: bool,
    pub game_over: bool,
}

impl DownsState {
    /// First and ten from `yard_line`
    pub fn new(field: &Field, yard_line: f32) -> Self {
        let ball_spot_y = field.yard_line_to_y(yard_line);
        Self {
            down: 1,
            line_to_gain_y: ball_spot_y - field.yards_to_px(YARDS_FOR_FIRST_DOWN),
            ball_spot_y,
            play_ended: false,
            game_over: false,
        }
    }

    fn first_down_at(&mut self, field: &Field, spot_y: f32) {
        self.down = 1;
        self.ball_spot_y = spot_y;
        self.line_to_gain_y = spot_y - field.yards_to_px(YARDS_FOR_FIRST_DOWN);
    }

    /// Spot the ball where the carrier went down
    pub fn apply_tackle(&mut self, field: &Field, spot_y: f32) -> PlayOutcome {
        self.play_ended = true;
        self.ball_spot_y = spot_y;
        if spot_y <= self.line_to_gain_y {
            self.first_down_at(field, spot_y);
            PlayOutcome::Tackled { first_down: true }
        } else if self.down >= MAX_DOWNS {
            self.game_over = true;
            PlayOutcome::TurnoverOnDowns
        } else {
            self.down += 1;
            PlayOutcome::Tackled { first_down: false }
        }
    }

    pub fn apply_touchdown(&mut self, field: &Field, stats: &mut Stats) -> PlayOutcome {
        self.play_ended = true;
        stats.score += TOUCHDOWN_POINTS;
        stats.touchdowns += 1;
        self.first_down_at(field, field.yard_line_to_y(DEFAULT_YARD_LINE));
        PlayOutcome::Touchdown
    }

    /// Interceptions end the game and wipe the score
    pub fn apply_interception(
        &mut self,
        field: &Field,
        stats: &mut Stats,
        by: PlayerId,
    ) -> PlayOutcome {
        self.play_ended = true;
        self.game_over = true;
        *stats = Stats::default();
        self.first_down_at(field, field.yard_line_to_y(DEFAULT_YARD_LINE));
        PlayOutcome::Intercepted { by }
    }

    /// Yard line the next snap happens at, rounded to a whole yard
    pub fn spot_yard_line(&self, field: &Field) -> f32 {
        field.y_to_yard_line(self.ball_spot_y).round()
    }

    pub fn panel(&self, field: &Field, stats: &Stats) -> DownsPanel {
        let ppy = field.pixels_per_yard;
        let goal_to_go = self.line_to_gain_y < field.top_y;
        let ordinal = match self.down {
            1 => "1st",
            2 => "2nd",
            3 => "3rd",
            _ => "4th",
        };
        let down = if goal_to_go {
            format!("{ordinal} & Goal")
        } else {
            ordinal.to_string()
        };
        let yards_to_go = if goal_to_go {
            ((self.ball_spot_y - field.top_y) / ppy).round().max(1.0)
        } else {
            ((self.ball_spot_y - self.line_to_gain_y) / ppy).round().max(0.0)
        };
        DownsPanel {
            down,
            yards_to_go: yards_to_go as u32,
            ball_on: field.y_to_yard_line(self.ball_spot_y).round() as u32,
            score: stats.score,
        }
    }
}

/// Scoreboard text for the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownsPanel {
    pub down: String,
    pub yards_to_go: u32,
    pub ball_on: u32,
    pub score: u32,
}

/// Per-down clock gating the pass rush
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RushClock {
    pub elapsed: f32,
    pub delay: f32,
}

impl RushClock {
    pub fn reset(&mut self, delay: f32) {
        self.elapsed = 0.0;
        self.delay = delay;
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    pub fn is_active(&self) -> bool {
        self.elapsed >= self.delay
    }
}

/// Track defenders in tackle range of the offensive carrier. Returns true once
/// any of them has held on for `hold_secs` (scaled by the carrier's role).
pub fn check_tackle(roster: &Roster, contact: &mut ContactState, now: f64, hold_secs: f32) -> bool {
    let Some(carrier) = roster.players.iter().find(|p| p.has_ball && p.is_offense()) else {
        return false;
    };
    let needed = f64::from(hold_secs * carrier.role.tackle_hold_multiplier());

    let in_range: Vec<PlayerId> = roster
        .players
        .iter()
        .filter(|d| d.is_defense() && d.pos.distance_to(carrier.pos) <= TACKLE_DISTANCE)
        .map(|d| d.id)
        .collect();
    contact.track_tackle_contact(&in_range, now);

    // Small epsilon: the hold is accumulated from f32 frame deltas
    in_range.iter().any(|&id| {
        contact
            .tackle_started(id)
            .is_some_and(|started| now - started + 1e-6 >= needed)
    })
}

/// Offensive carrier reached the goal line
pub fn check_touchdown(roster: &Roster, field: &Field) -> bool {
    roster
        .players
        .iter()
        .any(|p| p.has_ball && p.is_offense() && p.pos.y <= field.top_y)
}
