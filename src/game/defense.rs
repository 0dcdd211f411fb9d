//! Defensive policy: coverage assignments, scheme-driven targeting, pursuit

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::contact::ContactState;
use super::motion::step_toward;
use super::roster::{Field, Player, PlayerId, Point, Role, Roster, Team};

/// Rushers run this much faster once the rush clock has elapsed
pub const RUSH_SPEED_MULT: f32 = 1.5;

/// Zone defenders never anchor closer to the goal line than this
const ZONE_TOP_MARGIN: f32 = 30.0;
/// Zone anchors sit at least this far downfield of the line
const ZONE_BOTTOM_DEPTH: f32 = 80.0;
const ZONE_ANCHOR_DEPTH: f32 = 140.0;
/// A receiver this far past the anchor breaks the zone
const ZONE_BREAK_DEPTH: f32 = 60.0;
const ZONE_SHADE: f32 = 0.35;
const ZONE_CUSHION: f32 = 40.0;
/// Where an unassigned defender drifts to
const IDLE_DEPTH: f32 = 60.0;
/// A carrying QB this far past the line counts as a scramble
const SCRAMBLE_MARGIN: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    #[default]
    Man,
    Zone,
    Blitz,
}

impl Scheme {
    /// Map a uniform roll in [0, 1) onto the three schemes
    pub fn from_roll(roll: f64) -> Self {
        if roll < 0.34 {
            Scheme::Man
        } else if roll < 0.67 {
            Scheme::Zone
        } else {
            Scheme::Blitz
        }
    }
}

/// Pair each coverage defender (CBs, then LBs, by X) with the nearest
/// unclaimed receiver (WRs, then TEs, then RBs, by X). Once every receiver is
/// claimed the nearest receiver is used regardless.
pub fn coverage_assignments(roster: &Roster) -> HashMap<PlayerId, PlayerId> {
    let receivers: Vec<&Player> = [Role::Wr, Role::Te, Role::Rb]
        .into_iter()
        .flat_map(|role| roster.by_role_sorted(Team::Offense, role))
        .collect();
    let defenders: Vec<&Player> = [Role::Cb, Role::Lb]
        .into_iter()
        .flat_map(|role| roster.by_role_sorted(Team::Defense, role))
        .collect();

    let mut assignments = HashMap::new();
    if receivers.is_empty() {
        return assignments;
    }

    let mut claimed = HashSet::new();
    for defender in defenders {
        let nearest = |skip_claimed: bool| {
            receivers
                .iter()
                .filter(|r| !skip_claimed || !claimed.contains(&r.id))
                .min_by(|a, b| {
                    defender
                        .pos
                        .distance_to(a.pos)
                        .total_cmp(&defender.pos.distance_to(b.pos))
                })
                .map(|r| r.id)
        };
        if let Some(receiver) = nearest(true).or_else(|| nearest(false)) {
            assignments.insert(defender.id, receiver);
            claimed.insert(receiver);
        }
    }
    assignments
}

/// Everything target selection reads, gathered once per tick
#[derive(Debug, Clone, Default)]
pub struct DefenseContext {
    pub scheme: Scheme,
    pub los_y: f32,
    pub zone_top: f32,
    pub zone_bottom: f32,
    pub rush_active: bool,
    /// A pass was thrown this play, or one is in the air
    pub ball_thrown: bool,
    pub qb_running: bool,
    /// Carrier, else the receiver of an airborne ball, else the QB
    pub chase_target: Option<Point>,
    pub qb: Option<Point>,
    /// The two defenders deepest downfield (they keep coverage in a blitz)
    pub deepest: HashSet<PlayerId>,
    /// Defender id to the current position of its assigned receiver
    pub assigned: HashMap<PlayerId, Point>,
}

impl DefenseContext {
    pub fn build(
        roster: &Roster,
        field: &Field,
        scheme: Scheme,
        los_y: f32,
        rush_active: bool,
        ball_thrown: bool,
        flight_target: Option<PlayerId>,
    ) -> Self {
        let carrier = roster.players.iter().find(|p| p.has_ball);
        let qb = roster.quarterback().map(|p| p.pos);
        let chase_target = carrier
            .map(|p| p.pos)
            .or_else(|| flight_target.and_then(|id| roster.get(id)).map(|p| p.pos))
            .or(qb);
        let qb_running = carrier
            .map(|p| p.is_offense() && p.role == Role::Qb && p.pos.y < los_y - SCRAMBLE_MARGIN)
            .unwrap_or(false);

        let mut by_depth: Vec<&Player> = roster.players.iter().filter(|p| p.is_defense()).collect();
        by_depth.sort_by(|a, b| a.pos.y.total_cmp(&b.pos.y));
        let deepest = by_depth.iter().take(2).map(|p| p.id).collect();

        let assigned = coverage_assignments(roster)
            .into_iter()
            .filter_map(|(def, rec)| roster.get(rec).map(|r| (def, r.pos)))
            .collect();

        Self {
            scheme,
            los_y,
            zone_top: field.top_y + ZONE_TOP_MARGIN,
            zone_bottom: los_y - ZONE_BOTTOM_DEPTH,
            rush_active,
            ball_thrown,
            qb_running,
            chase_target,
            qb,
            deepest,
            assigned,
        }
    }
}

/// Where one defender heads this tick. Pure decision over role, scheme and phase.
pub fn resolve_target(defender: &Player, ctx: &DefenseContext) -> Point {
    let idle = Point::new(defender.pos.x, ctx.los_y - IDLE_DEPTH);

    if defender.role == Role::Dl {
        return ctx.chase_target.unwrap_or(idle);
    }
    if ctx.ball_thrown || ctx.qb_running {
        if let Some(target) = ctx.chase_target {
            return target;
        }
    }

    let holds_zone = ctx.scheme == Scheme::Zone
        || (ctx.scheme == Scheme::Blitz && ctx.deepest.contains(&defender.id));
    if holds_zone {
        return zone_target(defender, ctx);
    }

    let target = match (ctx.scheme, defender.role) {
        (_, Role::Cb | Role::Lb) => ctx.assigned.get(&defender.id).copied(),
        (Scheme::Blitz, Role::Mlb | Role::S) => ctx.qb.or(ctx.chase_target),
        (_, Role::Mlb | Role::S) if ctx.rush_active => ctx.qb.or(ctx.chase_target),
        (_, Role::Mlb | Role::S) => ctx.chase_target,
        _ => None,
    };
    target.unwrap_or(idle)
}

fn zone_target(defender: &Player, ctx: &DefenseContext) -> Point {
    let anchor_x = defender.start.x;
    let anchor_y = defender
        .start
        .y
        .min(ctx.los_y - ZONE_ANCHOR_DEPTH)
        .min(ctx.zone_bottom)
        .max(ctx.zone_top);

    match ctx.assigned.get(&defender.id) {
        Some(&receiver) if receiver.y < anchor_y - ZONE_BREAK_DEPTH => receiver,
        Some(&receiver) => Point::new(
            anchor_x + (receiver.x - anchor_x) * ZONE_SHADE,
            anchor_y.min(receiver.y + ZONE_CUSHION),
        ),
        None => Point::new(anchor_x, anchor_y),
    }
}

/// Move every non-stunned defender toward its resolved target
pub fn move_defense(
    roster: &mut Roster,
    field: &Field,
    ctx: &DefenseContext,
    contact: &ContactState,
    now: f64,
    dt: f32,
) {
    for defender in roster.players.iter_mut().filter(|p| p.is_defense()) {
        if contact.is_stunned(defender.id, now) {
            continue;
        }
        let target = resolve_target(defender, ctx);
        if defender.pos.distance_to(target) == 0.0 {
            continue;
        }
        let boost = if ctx.rush_active && defender.role.is_rusher() {
            RUSH_SPEED_MULT
        } else {
            1.0
        };
        let step = defender.speed_yps * field.pixels_per_yard * boost * dt;
        defender.pos = step_toward(defender.pos, target, step).0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defender(id: PlayerId, role: Role, x: f32, y: f32) -> Player {
        let mut p = Player::new(id, Team::Defense, role, x, y);
        p.pos = Point::new(x, y);
        p.start = p.pos;
        p
    }

    fn offense(id: PlayerId, role: Role, x: f32, y: f32) -> Player {
        let mut p = Player::new(id, Team::Offense, role, x, y);
        p.pos = Point::new(x, y);
        p.start = p.pos;
        p
    }

    fn base_ctx() -> DefenseContext {
        DefenseContext {
            los_y: 600.0,
            zone_top: 80.0,
            zone_bottom: 520.0,
            chase_target: Some(Point::new(270.0, 670.0)),
            qb: Some(Point::new(270.0, 670.0)),
            ..DefenseContext::default()
        }
    }

    #[test]
    fn test_scheme_roll_thirds() {
        assert_eq!(Scheme::from_roll(0.0), Scheme::Man);
        assert_eq!(Scheme::from_roll(0.5), Scheme::Zone);
        assert_eq!(Scheme::from_roll(0.99), Scheme::Blitz);
    }

    #[test]
    fn test_coverage_pairs_nearest_and_falls_back() {
        let roster = Roster::new(vec![
            offense(1, Role::Qb, 270.0, 670.0),
            offense(2, Role::Wr, 60.0, 620.0),
            offense(3, Role::Wr, 480.0, 620.0),
            defender(10, Role::Cb, 70.0, 460.0),
            defender(11, Role::Cb, 470.0, 460.0),
            defender(12, Role::Lb, 400.0, 520.0),
        ]);
        let assignments = coverage_assignments(&roster);
        assert_eq!(assignments[&10], 2);
        assert_eq!(assignments[&11], 3);
        // Both receivers claimed: the LB takes the nearest anyway
        assert_eq!(assignments[&12], 3);
    }

    #[test]
    fn test_dl_always_chases() {
        let ctx = DefenseContext {
            scheme: Scheme::Zone,
            ..base_ctx()
        };
        let dl = defender(10, Role::Dl, 270.0, 560.0);
        assert_eq!(resolve_target(&dl, &ctx), Point::new(270.0, 670.0));
    }

    #[test]
    fn test_thrown_ball_overrides_scheme() {
        let mut ctx = DefenseContext {
            scheme: Scheme::Zone,
            ball_thrown: true,
            chase_target: Some(Point::new(100.0, 300.0)),
            ..base_ctx()
        };
        ctx.assigned.insert(10, Point::new(60.0, 500.0));
        let cb = defender(10, Role::Cb, 70.0, 460.0);
        assert_eq!(resolve_target(&cb, &ctx), Point::new(100.0, 300.0));
    }

    #[test]
    fn test_zone_shades_until_receiver_goes_deep() {
        let mut ctx = DefenseContext {
            scheme: Scheme::Zone,
            ..base_ctx()
        };
        let cb = defender(10, Role::Cb, 100.0, 460.0);

        ctx.assigned.insert(10, Point::new(200.0, 580.0));
        let shaded = resolve_target(&cb, &ctx);
        assert!((shaded.x - 135.0).abs() < 1e-4);
        assert_eq!(shaded.y, 460.0);

        ctx.assigned.insert(10, Point::new(200.0, 380.0));
        assert_eq!(resolve_target(&cb, &ctx), Point::new(200.0, 380.0));

        ctx.assigned.clear();
        assert_eq!(resolve_target(&cb, &ctx), Point::new(100.0, 460.0));
    }

    #[test]
    fn test_blitz_sends_safety_at_quarterback_unless_deepest() {
        let mut ctx = DefenseContext {
            scheme: Scheme::Blitz,
            ..base_ctx()
        };
        let safety = defender(10, Role::S, 270.0, 400.0);
        assert_eq!(resolve_target(&safety, &ctx), Point::new(270.0, 670.0));

        ctx.deepest.insert(10);
        let target = resolve_target(&safety, &ctx);
        assert_eq!(target.y, 400.0_f32.min(600.0 - 140.0).max(80.0));
    }

    #[test]
    fn test_man_cb_without_assignment_drifts_to_idle_depth() {
        let ctx = base_ctx();
        let cb = defender(10, Role::Cb, 70.0, 460.0);
        assert_eq!(resolve_target(&cb, &ctx), Point::new(70.0, 540.0));
    }

    #[test]
    fn test_stunned_defender_holds_still() {
        let field = Field::default();
        let mut roster = Roster::new(vec![
            offense(1, Role::Qb, 270.0, 670.0),
            defender(10, Role::Dl, 270.0, 560.0),
        ]);
        let mut contact = ContactState::default();
        contact.stun(10, 0.0);
        let ctx = DefenseContext::build(&roster, &field, Scheme::Man, 600.0, false, false, None);
        move_defense(&mut roster, &field, &ctx, &contact, 0.1, 0.1);
        assert_eq!(roster.get(10).unwrap().pos, Point::new(270.0, 560.0));

        move_defense(&mut roster, &field, &ctx, &contact, 5.0, 0.1);
        assert!(roster.get(10).unwrap().pos.y > 560.0);
    }
}
