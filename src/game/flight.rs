//! Throw legality, ball flight, interceptions and contested catches

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use super::contact::ContactState;
use super::roster::{Player, PlayerId, Point, Role, Roster, Team};

/// Holding a throw gesture at least this long makes it a lob
pub const LOB_HOLD_MS: u64 = 400;

const BULLET_SPEED: f32 = 0.03;
const LOB_SPEED: f32 = 0.012;
const LOB_ARC_HEIGHT: f32 = 120.0;

/// Forward throws must leave from at or behind the line (px of slack)
const LINE_SLACK: f32 = 2.0;
/// Targets this much deeper than the carrier make a backward pass
const BACKWARD_SLACK: f32 = 2.0;

/// Lob arc below this height can be reached by defenders
const REACHABLE_HEIGHT: f32 = 35.0;
const SHADOW_REACH: f32 = 20.0;
/// DL only get a hand on a lob right off the passer's hand
const DL_WINDOW_END: f32 = 0.2;
const EARLY_WINDOW_END: f32 = 0.12;
const EARLY_WINDOW_RADIUS: f32 = 24.0;
const LATE_WINDOW_START: f32 = 0.65;
const TIGHT_COVERAGE_MAX: f32 = 18.0;
const TIGHT_COVERAGE_SCALE: f32 = 0.6;

pub const JUMP_COOLDOWN_SECS: f64 = 0.9;
pub const JUMP_DURATION_SECS: f64 = 0.35;
pub const JUMP_PEAK_PX: f32 = 16.0;
const JUMP_WINDOW_START: f32 = 0.7;
const JUMP_HEIGHT_SLACK: f32 = 10.0;
const JUMP_REACH: f32 = 30.0;
/// Distance bonus a leaping receiver gets in a contested catch
const JUMP_CATCH_BONUS: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrowKind {
    Bullet,
    Lob,
}

impl ThrowKind {
    pub fn from_hold_ms(held_ms: u64) -> Self {
        if held_ms >= LOB_HOLD_MS {
            ThrowKind::Lob
        } else {
            ThrowKind::Bullet
        }
    }
}

/// Why an attempted throw was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ThrowRejection {
    #[error("play is not live")]
    NotLive,

    #[error("game is paused")]
    Paused,

    #[error("no offensive ball carrier")]
    NoCarrier,

    #[error("target {0} is not on the roster")]
    UnknownTarget(PlayerId),

    #[error("target is not on offense")]
    TargetNotOffense,

    #[error("carrier cannot throw to themselves")]
    TargetIsCarrier,

    #[error("a ball is already in the air")]
    FlightInProgress,

    #[error("carrier is past the line of scrimmage")]
    BeyondLine,

    #[error("quarterback target is already downfield")]
    QuarterbackDownfield,

    #[error("no throw target in slot {0}")]
    EmptySlot(u8),
}

/// An airborne ball. Exists only between a legal throw and its resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct BallFlight {
    pub kind: ThrowKind,
    pub start: Point,
    /// Rendered ball position (lifted by the arc)
    pub pos: Point,
    /// Ground projection of the ball
    pub shadow: Point,
    pub target: PlayerId,
    pub interceptor: Option<PlayerId>,
    pub progress: f32,
    pub speed: f32,
    pub arc_height: f32,
}

impl BallFlight {
    pub fn new(kind: ThrowKind, start: Point, target: PlayerId, interceptor: Option<PlayerId>) -> Self {
        let (speed, arc_height) = match kind {
            ThrowKind::Bullet => (BULLET_SPEED, 0.0),
            ThrowKind::Lob => (LOB_SPEED, LOB_ARC_HEIGHT),
        };
        Self {
            kind,
            start,
            pos: start,
            shadow: start,
            target,
            interceptor,
            progress: 0.0,
            speed,
            arc_height,
        }
    }

    pub fn arc_offset(&self) -> f32 {
        (PI * self.progress).sin() * self.arc_height
    }
}

/// How a flight ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightOutcome {
    Caught(PlayerId),
    Intercepted(PlayerId),
}

/// Play state a throw is checked against
#[derive(Debug, Clone, Copy)]
pub struct ThrowGate {
    pub live: bool,
    pub paused: bool,
    pub flight_active: bool,
    pub los_y: f32,
    pub interception_radius: f32,
}

pub fn point_to_segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Closest non-DL, non-stunned defender within `radius` of the throw line
pub fn interceptor_on_line(
    roster: &Roster,
    contact: &ContactState,
    now: f64,
    start: Point,
    end: Point,
    radius: f32,
) -> Option<PlayerId> {
    roster
        .players
        .iter()
        .filter(|d| d.is_defense() && d.role != Role::Dl && !contact.is_stunned(d.id, now))
        .map(|d| (d.id, point_to_segment_distance(d.pos, start, end)))
        .filter(|&(_, dist)| dist < radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

/// Validate a throw and build its flight. Nothing is mutated, so a
/// rejection leaves the play exactly as it was.
pub fn plan_throw(
    roster: &Roster,
    contact: &ContactState,
    now: f64,
    gate: ThrowGate,
    target_id: PlayerId,
    kind: ThrowKind,
) -> Result<BallFlight, ThrowRejection> {
    if !gate.live {
        return Err(ThrowRejection::NotLive);
    }
    if gate.paused {
        return Err(ThrowRejection::Paused);
    }
    let carrier = roster
        .players
        .iter()
        .find(|p| p.has_ball && p.is_offense())
        .ok_or(ThrowRejection::NoCarrier)?;
    let target = roster
        .get(target_id)
        .ok_or(ThrowRejection::UnknownTarget(target_id))?;
    if !target.is_offense() {
        return Err(ThrowRejection::TargetNotOffense);
    }
    if target.id == carrier.id {
        return Err(ThrowRejection::TargetIsCarrier);
    }
    if gate.flight_active {
        return Err(ThrowRejection::FlightInProgress);
    }

    let backward = target.pos.y > carrier.pos.y + BACKWARD_SLACK;
    if !backward {
        if carrier.pos.y < gate.los_y - LINE_SLACK {
            return Err(ThrowRejection::BeyondLine);
        }
        if target.role == Role::Qb && target.pos.y < gate.los_y - LINE_SLACK {
            return Err(ThrowRejection::QuarterbackDownfield);
        }
    }

    let interceptor = match kind {
        ThrowKind::Bullet => interceptor_on_line(
            roster,
            contact,
            now,
            carrier.pos,
            target.pos,
            gate.interception_radius,
        ),
        ThrowKind::Lob => None,
    };
    Ok(BallFlight::new(kind, carrier.pos, target.id, interceptor))
}

/// Eligible keyboard throw targets: WRs, TEs, RBs (each left to right), then
/// the QB when someone else has the ball.
pub fn throw_targets(roster: &Roster) -> Vec<PlayerId> {
    let mut targets: Vec<PlayerId> = [Role::Wr, Role::Te, Role::Rb]
        .into_iter()
        .flat_map(|role| roster.by_role_sorted(Team::Offense, role))
        .map(|p| p.id)
        .collect();

    let carrier_is_qb = roster
        .players
        .iter()
        .find(|p| p.has_ball)
        .map(|p| p.role == Role::Qb);
    if carrier_is_qb == Some(false) {
        if let Some(qb) = roster.quarterback() {
            if !qb.has_ball {
                targets.push(qb.id);
            }
        }
    }
    targets
}

fn trigger_jump(player: &mut Player, now: f64) {
    if !player.is_offense() || !player.role.can_auto_jump() {
        return;
    }
    if now < player.jump.cooldown_until {
        return;
    }
    player.jump.is_jumping = true;
    player.jump.started_at = now;
    player.jump.cooldown_until = now + JUMP_COOLDOWN_SECS;
}

/// End jump animations that have run their course
pub fn settle_jumps(roster: &mut Roster, now: f64) {
    for player in &mut roster.players {
        if player.jump.is_jumping && now - player.jump.started_at >= JUMP_DURATION_SECS {
            player.jump.is_jumping = false;
        }
    }
}

/// Vertical lift of a jumping player for rendering
pub fn jump_offset(player: &Player, now: f64) -> f32 {
    if !player.jump.is_jumping {
        return 0.0;
    }
    let t = ((now - player.jump.started_at) / JUMP_DURATION_SECS).clamp(0.0, 1.0) as f32;
    (PI * t).sin() * JUMP_PEAK_PX
}

/// The receiver wins ties; a leaping receiver also gets a reach bonus
fn contested_winner(interceptor: &Player, receiver: &Player, ground: Point) -> PlayerId {
    let def_dist = interceptor.pos.distance_to(ground);
    let mut off_dist = receiver.pos.distance_to(ground);
    if receiver.jump.is_jumping {
        off_dist = (off_dist - JUMP_CATCH_BONUS).max(0.0);
    }
    if off_dist <= def_dist {
        receiver.id
    } else {
        interceptor.id
    }
}

/// Advance the ball one tick. Returns the outcome once progress reaches 1;
/// the new carrier (either side) already holds the ball then.
pub fn advance_flight(
    flight: &mut BallFlight,
    roster: &mut Roster,
    contact: &ContactState,
    now: f64,
    interception_radius: f32,
) -> Option<FlightOutcome> {
    let mut progress = (flight.progress + flight.speed).min(1.0);
    flight.progress = progress;

    let end_id = match flight.kind {
        ThrowKind::Lob => flight.target,
        ThrowKind::Bullet => flight.interceptor.unwrap_or(flight.target),
    };
    let end = roster.get(end_id).map(|p| p.pos).unwrap_or(flight.shadow);
    let arc = flight.arc_offset();
    flight.shadow = flight.start.lerp(end, progress);
    flight.pos = Point::new(flight.shadow.x, flight.shadow.y - arc);

    if flight.kind == ThrowKind::Lob && arc < REACHABLE_HEIGHT {
        let target_pos = roster.get(flight.target).map(|p| p.pos);
        let tight_radius = TIGHT_COVERAGE_MAX.min(interception_radius * TIGHT_COVERAGE_SCALE);
        let picked = roster
            .players
            .iter()
            .filter(|d| d.is_defense())
            .filter(|d| !(d.role == Role::Dl && progress > DL_WINDOW_END))
            .filter(|d| !contact.is_stunned(d.id, now))
            .find(|d| {
                let early = progress < EARLY_WINDOW_END
                    && d.pos.distance_to(flight.start) < EARLY_WINDOW_RADIUS;
                let late = progress > LATE_WINDOW_START
                    && target_pos.is_some_and(|t| d.pos.distance_to(t) < tight_radius);
                d.pos.distance_to(flight.shadow) < SHADOW_REACH && (early || late)
            })
            .map(|d| d.id);
        if let Some(id) = picked {
            flight.interceptor = Some(id);
            progress = 1.0;
            flight.progress = 1.0;
        }
    }

    if flight.kind == ThrowKind::Lob
        && progress > JUMP_WINDOW_START
        && arc < REACHABLE_HEIGHT + JUMP_HEIGHT_SLACK
    {
        let shadow = flight.shadow;
        for player in &mut roster.players {
            if player.pos.distance_to(shadow) <= JUMP_REACH {
                trigger_jump(player, now);
            }
        }
    }

    if progress < 1.0 {
        return None;
    }

    let winner = match flight.interceptor {
        Some(interceptor_id) => {
            let interceptor = roster.get(interceptor_id);
            let receiver = roster.get(flight.target).filter(|r| r.is_offense());
            match (flight.kind, interceptor, receiver) {
                (ThrowKind::Lob, Some(d), Some(r)) => contested_winner(d, r, flight.shadow),
                _ => interceptor_id,
            }
        }
        None => flight.target,
    };

    let intercepted = roster.get(winner).is_some_and(|p| p.is_defense());
    roster.give_ball_to(Some(winner));
    Some(if intercepted {
        FlightOutcome::Intercepted(winner)
    } else {
        FlightOutcome::Caught(winner)
    })
}
