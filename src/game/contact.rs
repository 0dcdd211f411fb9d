//! Pairwise contact: separation, edge-triggered stuns, force contests

use std::collections::{HashMap, HashSet};

use super::roster::{Player, PlayerId, Point, Role, Roster, Team};

/// Players closer than this are touching
pub const COLLISION_DISTANCE: f32 = 30.0;
/// Seconds a defender is frozen after first contact with a blocker
pub const STUN_SECONDS: f64 = 0.9;

/// A ball carrier shoves blocking teammates out of the way
const CARRIER_CLEAR_FACTOR: f32 = 3.0;
/// Two non-carrying teammates slide past each other
const TEAMMATE_SLIDE_FACTOR: f32 = 0.5;
/// Defender leverage against the carrier (both move the same way)
const CARRIER_DEFENDER_YIELD: f32 = 0.35;
const CARRIER_DRIFT: f32 = 0.15;

/// Support cone behind a pushing player
const SUPPORT_MIN_DEPTH: f32 = 4.0;
const SUPPORT_MAX_DEPTH: f32 = 26.0;
const SUPPORT_LATERAL: f32 = 14.0;
const OFFENSE_STACK_BOOST: f32 = 1.6;
const DEFENSE_SUPPORT_STEP: f32 = 0.3;
const SUPPORT_CAP: f32 = 1.6;
const STUNNED_FORCE: f32 = 0.25;
const DL_MIN_PUSH: f32 = 0.4;
const DL_PUSH_SCALE: f32 = 0.7;

/// Unordered pair key
fn pair_key(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Contact, stun and tackle bookkeeping carried between ticks.
/// All timestamps are simulation-clock seconds.
#[derive(Debug, Clone, Default)]
pub struct ContactState {
    touching: HashSet<(PlayerId, PlayerId)>,
    stun_until: HashMap<PlayerId, f64>,
    tackle_started: HashMap<PlayerId, f64>,
}

impl ContactState {
    pub fn is_stunned(&self, id: PlayerId, now: f64) -> bool {
        self.stun_until.get(&id).is_some_and(|&until| until > now)
    }

    /// Stun unless already stunned. Returns whether a new stun was applied.
    pub fn stun(&mut self, id: PlayerId, now: f64) -> bool {
        if self.is_stunned(id, now) {
            return false;
        }
        self.stun_until.insert(id, now + STUN_SECONDS);
        true
    }

    pub fn stunned_until(&self, id: PlayerId) -> Option<f64> {
        self.stun_until.get(&id).copied()
    }

    /// When a defender first got within tackle range of the carrier
    pub fn tackle_started(&self, id: PlayerId) -> Option<f64> {
        self.tackle_started.get(&id).copied()
    }

    /// Start (or keep) tackle timers for defenders in range; drop the rest
    pub fn track_tackle_contact(&mut self, in_range: &[PlayerId], now: f64) {
        self.tackle_started.retain(|id, _| in_range.contains(id));
        for &id in in_range {
            self.tackle_started.entry(id).or_insert(now);
        }
    }

    pub fn clear(&mut self) {
        self.touching.clear();
        self.stun_until.clear();
        self.tackle_started.clear();
    }
}

/// Difficulty inputs for a contact pass
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactParams {
    pub rush_active: bool,
    pub push_through: f32,
}

/// Teammates lined up behind `player`, opposite to its push direction `dir`
fn supporters(roster: &Roster, player: &Player, dir: Point) -> usize {
    roster
        .players
        .iter()
        .filter(|t| t.id != player.id && t.team == player.team)
        .filter(|t| {
            let dx = t.pos.x - player.pos.x;
            let dy = t.pos.y - player.pos.y;
            let depth = -(dx * dir.x + dy * dir.y);
            let lateral = (dx * -dir.y + dy * dir.x).abs();
            depth > SUPPORT_MIN_DEPTH && depth <= SUPPORT_MAX_DEPTH && lateral <= SUPPORT_LATERAL
        })
        .count()
}

/// Effective push of `player` driving along `dir`
pub fn push_force(
    roster: &Roster,
    player: &Player,
    dir: Point,
    stunned: bool,
    params: ContactParams,
) -> f32 {
    let backers = supporters(roster, player, dir);
    let support = match player.team {
        Team::Offense if backers > 0 => OFFENSE_STACK_BOOST,
        Team::Offense => 1.0,
        Team::Defense => (1.0 + DEFENSE_SUPPORT_STEP * backers as f32).min(SUPPORT_CAP),
    };
    let mut force = player.role.push_force() * support;

    if player.is_defense() {
        if stunned {
            force *= STUNNED_FORCE;
        } else if player.role == Role::Dl {
            force *= 1.0 + DL_MIN_PUSH.max(params.push_through * DL_PUSH_SCALE);
        } else if params.rush_active && player.role.is_rusher() {
            force *= 1.0 + params.push_through;
        }
    }
    force
}

/// Resolve every touching pair once. Positions are corrected in place and
/// the touching set is replaced with this tick's contacts.
pub fn resolve_contacts(
    roster: &mut Roster,
    state: &mut ContactState,
    now: f64,
    params: ContactParams,
) {
    let mut current = HashSet::new();
    let count = roster.players.len();

    for i in 0..count {
        for j in (i + 1)..count {
            let (a, b) = (&roster.players[i], &roster.players[j]);
            let dx = b.pos.x - a.pos.x;
            let dy = b.pos.y - a.pos.y;
            let dist = dx.hypot(dy);
            if dist == 0.0 || dist >= COLLISION_DISTANCE {
                continue;
            }

            let key = pair_key(a.id, b.id);
            current.insert(key);
            let was_touching = state.touching.contains(&key);
            let overlap = (COLLISION_DISTANCE - dist) / 2.0;
            let n = Point::new(dx / dist, dy / dist);
            let carrier_involved = a.has_ball || b.has_ball;

            if !carrier_involved && !was_touching && a.team != b.team {
                for p in [a, b] {
                    if p.is_defense() {
                        state.stun(p.id, now);
                    }
                }
            }

            // (shift for a, shift for b) along n
            let (shift_a, shift_b) = if a.team == b.team {
                if a.has_ball {
                    (0.0, overlap * CARRIER_CLEAR_FACTOR)
                } else if b.has_ball {
                    (-overlap * CARRIER_CLEAR_FACTOR, 0.0)
                } else {
                    (
                        -overlap * TEAMMATE_SLIDE_FACTOR,
                        overlap * TEAMMATE_SLIDE_FACTOR,
                    )
                }
            } else if b.has_ball {
                (-overlap * CARRIER_DEFENDER_YIELD, -overlap * CARRIER_DRIFT)
            } else if a.has_ball {
                (overlap * CARRIER_DRIFT, overlap * CARRIER_DEFENDER_YIELD)
            } else {
                let a_stunned = a.is_defense() && state.is_stunned(a.id, now);
                let b_stunned = b.is_defense() && state.is_stunned(b.id, now);
                let force_a = push_force(roster, a, n, a_stunned, params);
                let force_b = push_force(roster, b, Point::new(-n.x, -n.y), b_stunned, params);
                let total = force_a + force_b;
                let span = overlap * 2.0;
                if total > 0.0 {
                    (-span * force_b / total, span * force_a / total)
                } else {
                    (-overlap, overlap)
                }
            };

            let pa = &mut roster.players[i].pos;
            pa.x += n.x * shift_a;
            pa.y += n.y * shift_a;
            let pb = &mut roster.players[j].pos;
            pb.x += n.x * shift_b;
            pb.y += n.y * shift_b;
        }
    }

    state.touching = current;
}
