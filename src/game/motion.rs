//! Waypoint following for offensive players

use super::roster::{Field, Player, Point, Roster};

/// Ball carriers run at this fraction of their speed
pub const CARRIER_SPEED_FACTOR: f32 = 0.85;

/// Move `pos` up to `step` pixels toward `target`.
/// Returns the new position and whether the target was reached.
pub fn step_toward(pos: Point, target: Point, step: f32) -> (Point, bool) {
    let dist = pos.distance_to(target);
    if dist <= step || dist == 0.0 {
        return (target, true);
    }
    let t = step / dist;
    (pos.lerp(target, t), false)
}

/// Pixels a player may cover this tick
pub fn step_length(player: &Player, field: &Field, dt: f32) -> f32 {
    let carry = if player.has_ball {
        CARRIER_SPEED_FACTOR
    } else {
        1.0
    };
    player.speed_yps * field.pixels_per_yard * carry * dt
}

/// Advance one player along its drawn route. A route needs at least two
/// points, and the cursor never passes the last one, so a finished route
/// pins the player in place.
pub fn follow_path(player: &mut Player, field: &Field, dt: f32) {
    if player.path.len() < 2 || player.path_index >= player.path.len() {
        return;
    }
    let last = player.path.len() - 1;

    let mut target = player.path[player.path_index];
    if player.pos.distance_to(target) == 0.0 {
        player.path_index = (player.path_index + 1).min(last);
        target = player.path[player.path_index];
        if player.pos.distance_to(target) == 0.0 {
            return;
        }
    }

    let step = step_length(player, field, dt);
    let (next, arrived) = step_toward(player.pos, target, step);
    player.pos = next;
    if arrived {
        player.path_index = (player.path_index + 1).min(last);
    }
}

/// Move every offensive player with a route
pub fn advance_offense(roster: &mut Roster, field: &Field, dt: f32) {
    for player in roster.players.iter_mut().filter(|p| p.is_offense()) {
        follow_path(player, field, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::roster::{Role, Team};

    fn receiver_with_route(route: Vec<Point>) -> Player {
        let mut player = Player::new(1, Team::Offense, Role::Wr, 100.0, 0.0);
        player.pos = Point::new(100.0, 500.0);
        player.has_ball = false;
        player.path = route;
        player
    }

    #[test]
    fn test_step_toward_snaps_when_close() {
        let (pos, arrived) = step_toward(Point::new(0.0, 0.0), Point::new(3.0, 4.0), 10.0);
        assert!(arrived);
        assert_eq!(pos, Point::new(3.0, 4.0));

        let (pos, arrived) = step_toward(Point::new(0.0, 0.0), Point::new(30.0, 40.0), 5.0);
        assert!(!arrived);
        assert!((pos.x - 3.0).abs() < 1e-4 && (pos.y - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_route_converges_and_pins_to_last_waypoint() {
        let field = Field::default();
        let mut player = receiver_with_route(vec![
            Point::new(100.0, 500.0),
            Point::new(100.0, 400.0),
            Point::new(200.0, 400.0),
        ]);

        for _ in 0..600 {
            follow_path(&mut player, &field, 1.0 / 60.0);
        }
        assert_eq!(player.pos, Point::new(200.0, 400.0));
        assert_eq!(player.path_index, 2);

        follow_path(&mut player, &field, 1.0 / 60.0);
        assert_eq!(player.pos, Point::new(200.0, 400.0));
        assert_eq!(player.path_index, 2);
    }

    #[test]
    fn test_carrier_moves_slower() {
        let field = Field::default();
        let mut runner = receiver_with_route(vec![Point::new(100.0, 500.0), Point::new(100.0, 0.0)]);
        let mut carrier = runner.clone();
        carrier.has_ball = true;

        follow_path(&mut runner, &field, 0.1);
        follow_path(&mut carrier, &field, 0.1);
        let runner_dist = 500.0 - runner.pos.y;
        let carrier_dist = 500.0 - carrier.pos.y;
        assert!((carrier_dist / runner_dist - CARRIER_SPEED_FACTOR).abs() < 1e-4);
    }

    #[test]
    fn test_single_point_route_means_no_motion() {
        let field = Field::default();
        let mut player = receiver_with_route(vec![Point::new(100.0, 300.0)]);
        follow_path(&mut player, &field, 0.1);
        assert_eq!(player.pos, Point::new(100.0, 500.0));
    }

    #[test]
    fn test_coincident_waypoint_advances_cursor_without_stalling() {
        let field = Field::default();
        let mut player = receiver_with_route(vec![
            Point::new(100.0, 500.0),
            Point::new(100.0, 400.0),
        ]);
        follow_path(&mut player, &field, 0.1);
        assert_eq!(player.path_index, 1);
        assert!(player.pos.y < 500.0);
    }
}
