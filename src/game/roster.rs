//! Roster and field model: entities, role tables, yard-line conversion

use serde::{Deserialize, Serialize};
use std::fmt;

/// Depth of each end zone in pixels
pub const ENDZONE_HEIGHT: f32 = 50.0;
/// Goal line to goal line
pub const YARDS_PER_FIELD: f32 = 100.0;
/// Where the ball is spotted after a score, an interception, or a fresh game
pub const DEFAULT_YARD_LINE: f32 = 25.0;
/// Offensive players are scaled by this on top of their role speed
pub const OFFENSE_SPEED_MULT: f32 = 1.1;

const MIN_FIELD_WIDTH: f32 = 320.0;
const MIN_FIELD_HEIGHT: f32 = 520.0;
/// Players are never laid out closer than this to a sideline
const SIDELINE_MARGIN: f32 = 35.0;

pub type PlayerId = u32;

/// A point on the playing surface, in pixels. Y grows toward the offense's own end zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Offense,
    Defense,
}

/// Closed set of positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "QB")]
    Qb,
    #[serde(rename = "RB")]
    Rb,
    #[serde(rename = "FB")]
    Fb,
    #[serde(rename = "WR")]
    Wr,
    #[serde(rename = "TE")]
    Te,
    #[serde(rename = "OL")]
    Ol,
    #[serde(rename = "DL")]
    Dl,
    #[serde(rename = "LB")]
    Lb,
    #[serde(rename = "MLB")]
    Mlb,
    #[serde(rename = "CB")]
    Cb,
    #[serde(rename = "S")]
    S,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Qb => "QB",
            Role::Rb => "RB",
            Role::Fb => "FB",
            Role::Wr => "WR",
            Role::Te => "TE",
            Role::Ol => "OL",
            Role::Dl => "DL",
            Role::Lb => "LB",
            Role::Mlb => "MLB",
            Role::Cb => "CB",
            Role::S => "S",
        }
    }

    /// Baseline speed in yards per second
    pub fn base_speed_yps(self) -> f32 {
        match self {
            Role::Qb => 5.8,
            Role::Rb => 6.4,
            Role::Fb => 6.0,
            Role::Wr => 6.7,
            Role::Te => 6.1,
            Role::Ol => 5.6,
            Role::Dl => 5.4,
            Role::Lb => 6.1,
            Role::Mlb => 6.0,
            Role::Cb => 6.6,
            Role::S => 6.4,
        }
    }

    /// Base push force in a contact contest. Linemen strongest, cover men weakest.
    pub fn push_force(self) -> f32 {
        match self {
            Role::Ol | Role::Dl => 1.3,
            Role::Fb => 1.1,
            Role::Te => 1.05,
            Role::Mlb | Role::Lb => 1.0,
            Role::Rb => 0.95,
            Role::S => 0.85,
            Role::Qb => 0.8,
            Role::Wr | Role::Cb => 0.7,
        }
    }

    /// Scales the difficulty's tackle hold when this role carries the ball
    pub fn tackle_hold_multiplier(self) -> f32 {
        match self {
            Role::Qb => 0.7,
            Role::Rb | Role::Fb => 1.2,
            Role::Wr => 1.25,
            Role::Te => 1.15,
            Role::Ol | Role::Dl | Role::Lb | Role::Mlb | Role::Cb | Role::S => 1.0,
        }
    }

    /// Defenders that get the rush speed and push bonuses once the rush is on
    pub fn is_rusher(self) -> bool {
        matches!(self, Role::Dl | Role::Mlb | Role::S)
    }

    /// Offensive roles that leap for a descending lob
    pub fn can_auto_jump(self) -> bool {
        matches!(self, Role::Wr | Role::Te | Role::Rb | Role::Qb)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Jump animation state for a receiver contesting a lob
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JumpState {
    pub is_jumping: bool,
    pub started_at: f64,
    pub cooldown_until: f64,
}

/// One entity on the field
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub team: Team,
    pub role: Role,
    pub pos: Point,
    /// Where the player lines up; restored at the start of every down
    pub start: Point,
    /// Formation X, kept across line-of-scrimmage changes
    pub base_x: f32,
    /// Formation depth relative to the line of scrimmage
    pub base_y_offset: f32,
    pub path: Vec<Point>,
    pub path_index: usize,
    pub speed_yps: f32,
    pub has_ball: bool,
    pub jump: JumpState,
}

impl Player {
    pub fn new(id: PlayerId, team: Team, role: Role, x: f32, y_offset: f32) -> Self {
        Self {
            id,
            team,
            role,
            pos: Point::new(x, y_offset),
            start: Point::new(x, y_offset),
            base_x: x,
            base_y_offset: y_offset,
            path: Vec::new(),
            path_index: 0,
            speed_yps: role.base_speed_yps(),
            has_ball: role == Role::Qb,
            jump: JumpState::default(),
        }
    }

    pub fn is_offense(&self) -> bool {
        self.team == Team::Offense
    }

    pub fn is_defense(&self) -> bool {
        self.team == Team::Defense
    }

    /// Back to the spot, route and flags cleared
    pub fn reset(&mut self) {
        self.pos = self.start;
        self.path.clear();
        self.path_index = 0;
        self.has_ball = self.role == Role::Qb;
        self.jump = JumpState::default();
    }
}

/// Playing surface dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Field {
    pub width: f32,
    pub height: f32,
    /// Goal line the offense is attacking
    pub top_y: f32,
    /// Offense's own goal line
    pub bottom_y: f32,
    pub play_height: f32,
    pub pixels_per_yard: f32,
}

impl Field {
    pub fn new(width: f32, height: f32) -> Self {
        let width = width.max(MIN_FIELD_WIDTH);
        let height = height.max(MIN_FIELD_HEIGHT);
        let top_y = ENDZONE_HEIGHT;
        let bottom_y = height - ENDZONE_HEIGHT;
        let play_height = bottom_y - top_y;
        Self {
            width,
            height,
            top_y,
            bottom_y,
            play_height,
            pixels_per_yard: play_height / YARDS_PER_FIELD,
        }
    }

    /// Recompute every derived dimension for a new surface size
    pub fn resize(&mut self, width: f32, height: f32) {
        *self = Self::new(width, height);
    }

    pub fn yard_line_to_y(&self, yard_line: f32) -> f32 {
        let clamped = yard_line.clamp(0.0, YARDS_PER_FIELD);
        self.bottom_y - (clamped / YARDS_PER_FIELD) * self.play_height
    }

    pub fn y_to_yard_line(&self, y: f32) -> f32 {
        let clamped = y.clamp(self.top_y, self.bottom_y);
        (self.bottom_y - clamped) / self.play_height * YARDS_PER_FIELD
    }

    pub fn yards_to_px(&self, yards: f32) -> f32 {
        yards * self.pixels_per_yard
    }
}

impl Default for Field {
    fn default() -> Self {
        Self::new(540.0, 900.0)
    }
}

/// Malformed rosters are rejected before a play can start
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RosterError {
    #[error("roster has no offensive quarterback")]
    MissingQuarterback,

    #[error("roster has more than one offensive quarterback")]
    MultipleQuarterbacks,

    #[error("roster has no {0:?} players")]
    EmptyTeam(Team),

    #[error("duplicate player id {0}")]
    DuplicateId(PlayerId),
}

/// Depth of each role relative to the line of scrimmage (negative = downfield)
fn role_y_offset(role: Role) -> f32 {
    match role {
        Role::Qb => 70.0,
        Role::Rb => 120.0,
        Role::Fb => 95.0,
        Role::Wr | Role::Te | Role::Ol => 20.0,
        Role::Dl => -40.0,
        Role::Lb => -80.0,
        Role::Mlb => -90.0,
        Role::Cb => -140.0,
        Role::S => -200.0,
    }
}

/// All 22 players of a down
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub players: Vec<Player>,
}

impl Roster {
    pub fn new(players: Vec<Player>) -> Self {
        Self { players }
    }

    /// Standard 11-on-11 alignment, scaled to the field width.
    /// Y positions are offsets until [`Roster::apply_formation_to_line`] runs.
    pub fn build(field: &Field) -> Self {
        let width = field.width;
        let clamp_x = |x: f32| x.clamp(SIDELINE_MARGIN, width - SIDELINE_MARGIN);

        let line_left = width * 0.315;
        let line_right = width * 0.685;
        let line_xs: Vec<f32> = (0..5)
            .map(|i| line_left + (line_right - line_left) * (i as f32 / 4.0))
            .collect();

        let te_inset = width * 0.065;
        let wr_inset = width * 0.148;
        let te_left = clamp_x(line_left - te_inset);
        let te_right = clamp_x(line_right + te_inset);
        let wr_left = clamp_x(line_left - wr_inset);
        let wr_right = clamp_x(line_right + wr_inset);
        let center = width * 0.5;

        let mut next_id: PlayerId = 1;
        let mut players = Vec::with_capacity(22);
        let mut push = |team: Team, role: Role, x: f32| {
            players.push(Player::new(next_id, team, role, x, role_y_offset(role)));
            next_id += 1;
        };

        push(Team::Offense, Role::Qb, center);
        push(Team::Offense, Role::Rb, center);
        push(Team::Offense, Role::Wr, wr_left);
        push(Team::Offense, Role::Wr, wr_right);
        push(Team::Offense, Role::Te, te_left);
        push(Team::Offense, Role::Te, te_right);
        for &x in &line_xs {
            push(Team::Offense, Role::Ol, x);
        }

        push(Team::Defense, Role::Mlb, center);
        push(Team::Defense, Role::Lb, te_left);
        push(Team::Defense, Role::Lb, te_right);
        push(Team::Defense, Role::Cb, wr_left);
        push(Team::Defense, Role::Cb, wr_right);
        push(Team::Defense, Role::S, center);
        for &x in &line_xs {
            push(Team::Defense, Role::Dl, x);
        }

        Self { players }
    }

    /// Fail fast on rosters the engine cannot run a play with
    pub fn validate(&self) -> Result<(), RosterError> {
        let mut seen = std::collections::HashSet::new();
        for player in &self.players {
            if !seen.insert(player.id) {
                return Err(RosterError::DuplicateId(player.id));
            }
        }
        for team in [Team::Offense, Team::Defense] {
            if !self.players.iter().any(|p| p.team == team) {
                return Err(RosterError::EmptyTeam(team));
            }
        }
        match self
            .players
            .iter()
            .filter(|p| p.is_offense() && p.role == Role::Qb)
            .count()
        {
            0 => Err(RosterError::MissingQuarterback),
            1 => Ok(()),
            _ => Err(RosterError::MultipleQuarterbacks),
        }
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn quarterback(&self) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.is_offense() && p.role == Role::Qb)
    }

    /// Players of one team and role, left to right
    pub fn by_role_sorted(&self, team: Team, role: Role) -> Vec<&Player> {
        let mut players: Vec<&Player> = self
            .players
            .iter()
            .filter(|p| p.team == team && p.role == role)
            .collect();
        players.sort_by(|a, b| a.pos.x.total_cmp(&b.pos.x));
        players
    }

    /// Re-base every player's stored offset onto a new line of scrimmage
    pub fn apply_formation_to_line(&mut self, line_y: f32) {
        for player in &mut self.players {
            player.pos = Point::new(player.base_x, line_y + player.base_y_offset);
            player.start = player.pos;
        }
    }

    /// Role speeds, with defenders scaled by the difficulty multiplier
    pub fn apply_speeds(&mut self, defense_multiplier: f32) {
        for player in &mut self.players {
            let mult = match player.team {
                Team::Offense => OFFENSE_SPEED_MULT,
                Team::Defense => defense_multiplier,
            };
            player.speed_yps = player.role.base_speed_yps() * mult;
        }
    }

    /// Hand the ball to exactly one player (or nobody)
    pub fn give_ball_to(&mut self, id: Option<PlayerId>) {
        for player in &mut self.players {
            player.has_ball = Some(player.id) == id;
        }
    }

    pub fn carrier_count(&self) -> usize {
        self.players.iter().filter(|p| p.has_ball).count()
    }
}

/// Offensive alignment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formation {
    #[default]
    Standard,
    IFormation,
    Shotgun,
    Trips,
    Empty,
}

impl Formation {
    pub const ALL: [Formation; 5] = [
        Formation::Standard,
        Formation::IFormation,
        Formation::Shotgun,
        Formation::Trips,
        Formation::Empty,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Formation::Standard => "Standard",
            Formation::IFormation => "I-Formation (FB)",
            Formation::Shotgun => "Shotgun",
            Formation::Trips => "Trips Right",
            Formation::Empty => "Empty Set",
        }
    }
}

/// One alignment spot: absolute X, depth relative to the line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub x: f32,
    pub y_offset: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormationLayout {
    pub qb: Option<Slot>,
    pub rb: Option<Slot>,
    pub fb: Option<Slot>,
    pub wr: Vec<Slot>,
    pub te: Vec<Slot>,
    pub ol: Vec<Slot>,
}

impl FormationLayout {
    pub fn for_formation(formation: Formation, field: &Field) -> Self {
        let center = field.width * 0.5;
        let spacing = field.width * 0.093;
        let te_inset = field.width * 0.065;
        let wr_inset = field.width * 0.148;
        let max_x = field.width - SIDELINE_MARGIN;
        let slot = |x: f32, y_offset: f32| Slot {
            x: x.clamp(SIDELINE_MARGIN, max_x),
            y_offset,
        };

        let ol = (-2..=2)
            .map(|i| slot(center + spacing * i as f32, 20.0))
            .collect();
        let wr_left = center - spacing * 2.0 - wr_inset;
        let wr_right = center + spacing * 2.0 + wr_inset;
        let te_left = center - spacing * 2.0 - te_inset;
        let te_right = center + spacing * 2.0 + te_inset;

        match formation {
            Formation::Standard => Self {
                qb: Some(slot(center, 70.0)),
                rb: Some(slot(center, 120.0)),
                fb: None,
                wr: vec![slot(wr_left, 20.0), slot(wr_right, 20.0)],
                te: vec![slot(te_left, 20.0), slot(te_right, 20.0)],
                ol,
            },
            Formation::IFormation => Self {
                qb: Some(slot(center, 70.0)),
                rb: Some(slot(center, 140.0)),
                fb: Some(slot(center, 95.0)),
                wr: vec![slot(wr_left, 20.0), slot(wr_right, 20.0)],
                te: vec![slot(te_left, 20.0)],
                ol,
            },
            Formation::Shotgun => Self {
                qb: Some(slot(center, 110.0)),
                rb: Some(slot(center - spacing * 1.5, 110.0)),
                fb: None,
                wr: vec![slot(wr_left, 20.0), slot(wr_right, 20.0)],
                te: vec![slot(te_left, 20.0), slot(te_right, 20.0)],
                ol,
            },
            Formation::Trips => {
                // Stack inward from the sideline, tighter on narrow fields
                let outer = (wr_right + 120.0).min(max_x);
                let step = ((outer - (center + spacing * 2.0)) / 3.0).min(60.0);
                Self {
                    qb: Some(slot(center, 70.0)),
                    rb: Some(slot(center, 120.0)),
                    fb: None,
                    wr: (0..3)
                        .rev()
                        .map(|i| slot(outer - step * i as f32, 20.0))
                        .collect(),
                    te: vec![slot(te_left, 20.0)],
                    ol,
                }
            }
            Formation::Empty => Self {
                qb: Some(slot(center, 110.0)),
                rb: None,
                fb: None,
                wr: vec![
                    slot(wr_left, 20.0),
                    slot(wr_left + 60.0, 20.0),
                    slot(wr_right - 60.0, 20.0),
                    slot(wr_right, 20.0),
                ],
                te: vec![slot(te_left, 20.0)],
                ol,
            },
        }
    }
}

impl Roster {
    /// Align the offense in a preset around `line_y`. Players with no slot in
    /// the preset keep their previous spot.
    pub fn apply_formation(&mut self, formation: Formation, field: &Field, line_y: f32) {
        let layout = FormationLayout::for_formation(formation, field);

        // An FB only exists while the I-Formation is selected
        for player in &mut self.players {
            if player.is_offense() && player.role == Role::Fb {
                player.role = Role::Te;
            }
        }

        let ids_for = |roster: &Roster, role: Role| -> Vec<PlayerId> {
            roster
                .players
                .iter()
                .filter(|p| p.is_offense() && p.role == role)
                .map(|p| p.id)
                .collect()
        };
        let qbs = ids_for(self, Role::Qb);
        let rbs = ids_for(self, Role::Rb);
        let wrs = ids_for(self, Role::Wr);
        let tes = ids_for(self, Role::Te);
        let ols = ids_for(self, Role::Ol);

        let mut place = |roster: &mut Roster, id: PlayerId, slot: Slot| {
            if let Some(player) = roster.get_mut(id) {
                player.base_x = slot.x;
                player.base_y_offset = slot.y_offset;
                player.pos = Point::new(slot.x, line_y + slot.y_offset);
                player.start = player.pos;
            }
        };

        if let (Some(slot), Some(&id)) = (layout.qb, qbs.first()) {
            place(self, id, slot);
        }
        if let (Some(slot), Some(&id)) = (layout.rb, rbs.first()) {
            place(self, id, slot);
        }

        let mut fb_id = None;
        if let Some(slot) = layout.fb {
            fb_id = rbs.get(1).or_else(|| tes.get(1)).copied();
            if let Some(id) = fb_id {
                place(self, id, slot);
                if let Some(player) = self.get_mut(id) {
                    player.role = Role::Fb;
                    player.speed_yps = Role::Fb.base_speed_yps() * OFFENSE_SPEED_MULT;
                }
            }
        } else {
            for &id in &tes {
                if let Some(player) = self.get_mut(id) {
                    player.speed_yps = Role::Te.base_speed_yps() * OFFENSE_SPEED_MULT;
                }
            }
        }

        for (slot, &id) in layout.ol.iter().zip(&ols) {
            place(self, id, *slot);
        }
        for (slot, &id) in layout.wr.iter().zip(&wrs) {
            place(self, id, *slot);
        }
        let remaining_tes = tes.iter().filter(|&&id| Some(id) != fb_id);
        for (slot, &id) in layout.te.iter().zip(remaining_tes) {
            place(self, id, *slot);
        }
    }
}
