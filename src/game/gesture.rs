//! Pointer gesture classification: tap-to-throw versus drag-to-route

use super::flight::ThrowKind;
use super::roster::{PlayerId, Point, Roster};

/// A press must land this close to an offensive player to grab them
pub const PICK_RADIUS: f32 = 32.0;
/// Dragging further than this turns a press into route drawing
pub const DRAG_THRESHOLD: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Pending,
    Route,
}

#[derive(Debug, Clone, Copy)]
struct Active {
    player: PlayerId,
    origin: Point,
    started_ms: u64,
    mode: Mode,
}

/// What the engine should do in response to a gesture event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    Ignored,
    Grabbed(PlayerId),
    /// Start a fresh route: from the player's spot to the first drag point
    BeginRoute { player: PlayerId, to: Point },
    ExtendRoute { player: PlayerId, to: Point },
    FinishRoute(PlayerId),
    Throw { target: PlayerId, kind: ThrowKind },
}

#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    active: Option<Active>,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_routing(&self) -> bool {
        matches!(self.active, Some(Active { mode: Mode::Route, .. }))
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn start(&mut self, roster: &Roster, at: Point, now_ms: u64) -> GestureAction {
        let closest = roster
            .players
            .iter()
            .filter(|p| p.is_offense())
            .map(|p| (p.id, p.pos.distance_to(at)))
            .filter(|&(_, d)| d < PICK_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match closest {
            Some((player, _)) => {
                self.active = Some(Active {
                    player,
                    origin: at,
                    started_ms: now_ms,
                    mode: Mode::Pending,
                });
                GestureAction::Grabbed(player)
            }
            None => GestureAction::Ignored,
        }
    }

    pub fn moved(&mut self, at: Point) -> GestureAction {
        let Some(active) = self.active.as_mut() else {
            return GestureAction::Ignored;
        };
        match active.mode {
            Mode::Pending if active.origin.distance_to(at) >= DRAG_THRESHOLD => {
                active.mode = Mode::Route;
                GestureAction::BeginRoute {
                    player: active.player,
                    to: at,
                }
            }
            Mode::Pending => GestureAction::Ignored,
            Mode::Route => GestureAction::ExtendRoute {
                player: active.player,
                to: at,
            },
        }
    }

    /// Release. A tap throws to the grabbed player; `held_ms` overrides the
    /// hold duration measured from `start` when the client supplies one.
    pub fn end(&mut self, now_ms: u64, held_ms: Option<u64>) -> GestureAction {
        let Some(active) = self.active.take() else {
            return GestureAction::Ignored;
        };
        match active.mode {
            Mode::Route => GestureAction::FinishRoute(active.player),
            Mode::Pending => {
                let held = held_ms.unwrap_or_else(|| now_ms.saturating_sub(active.started_ms));
                GestureAction::Throw {
                    target: active.player,
                    kind: ThrowKind::from_hold_ms(held),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::roster::{Player, Role, Team};

    fn roster() -> Roster {
        let mut wr = Player::new(2, Team::Offense, Role::Wr, 100.0, 0.0);
        wr.pos = Point::new(100.0, 600.0);
        let mut cb = Player::new(10, Team::Defense, Role::Cb, 100.0, 0.0);
        cb.pos = Point::new(100.0, 560.0);
        Roster::new(vec![wr, cb])
    }

    #[test]
    fn test_tap_throws_and_hold_lobs() {
        let roster = roster();
        let mut tracker = GestureTracker::new();
        assert_eq!(tracker.start(&roster, Point::new(105.0, 600.0), 1_000), GestureAction::Grabbed(2));
        assert_eq!(
            tracker.end(1_150, None),
            GestureAction::Throw { target: 2, kind: ThrowKind::Bullet }
        );

        tracker.start(&roster, Point::new(100.0, 590.0), 2_000);
        assert_eq!(
            tracker.end(2_450, None),
            GestureAction::Throw { target: 2, kind: ThrowKind::Lob }
        );
        assert_eq!(tracker.end(3_000, None), GestureAction::Ignored);
    }

    #[test]
    fn test_drag_becomes_route() {
        let roster = roster();
        let mut tracker = GestureTracker::new();
        tracker.start(&roster, Point::new(100.0, 600.0), 0);
        assert_eq!(tracker.moved(Point::new(100.0, 595.0)), GestureAction::Ignored);
        assert!(!tracker.is_routing());

        let to = Point::new(100.0, 580.0);
        assert_eq!(tracker.moved(to), GestureAction::BeginRoute { player: 2, to });
        assert!(tracker.is_routing());
        let next = Point::new(110.0, 560.0);
        assert_eq!(tracker.moved(next), GestureAction::ExtendRoute { player: 2, to: next });
        assert_eq!(tracker.end(900, None), GestureAction::FinishRoute(2));
        assert!(!tracker.is_routing());
    }

    #[test]
    fn test_press_on_defender_or_empty_grass_is_ignored() {
        let roster = roster();
        let mut tracker = GestureTracker::new();
        assert_eq!(tracker.start(&roster, Point::new(100.0, 560.0), 0), GestureAction::Ignored);
        assert_eq!(tracker.start(&roster, Point::new(400.0, 100.0), 0), GestureAction::Ignored);
        assert_eq!(tracker.moved(Point::new(0.0, 0.0)), GestureAction::Ignored);
    }

    #[test]
    fn test_client_hold_overrides_server_timing() {
        let roster = roster();
        let mut tracker = GestureTracker::new();
        tracker.start(&roster, Point::new(100.0, 600.0), 0);
        assert_eq!(
            tracker.end(10, Some(500)),
            GestureAction::Throw { target: 2, kind: ThrowKind::Lob }
        );
    }
}
