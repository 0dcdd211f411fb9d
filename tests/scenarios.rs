//! End-to-end play scenarios against the engine

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio_test::{assert_err, assert_ok};

use gridiron_server::config::Difficulty;
use gridiron_server::game::contact::{resolve_contacts, ContactParams, ContactState};
use gridiron_server::game::defense::Scheme;
use gridiron_server::game::downs::{DownsState, PlayOutcome, Stats, MAX_DOWNS};
use gridiron_server::game::flight::{ThrowKind, ThrowRejection};
use gridiron_server::game::motion::{follow_path, step_length};
use gridiron_server::game::roster::{Field, Player, PlayerId, Point, Role, Roster, Team};
use gridiron_server::game::sampler::{FixedSampler, SeededSampler};
use gridiron_server::game::{GameState, PlayPhase};
use gridiron_server::ws::protocol::GameEvent;

const DT: f32 = 1.0 / 60.0;

fn player(id: PlayerId, team: Team, role: Role) -> Player {
    Player::new(id, team, role, 270.0, 0.0)
}

/// Live game over a hand-built roster, every player placed at `spots`
fn live_game(players: Vec<Player>, spots: &[Point], yard_line: f32, rush_delay: f32) -> GameState {
    let mut state = GameState::with_roster(
        Field::default(),
        Roster::new(players),
        Difficulty::Medium,
        yard_line,
        Box::new(FixedSampler::new(Scheme::Man, rush_delay)),
    )
    .expect("valid roster");
    for (p, &spot) in state.roster.players.iter_mut().zip(spots) {
        p.pos = spot;
        p.start = spot;
    }
    state.phase = PlayPhase::Live;
    state
}

fn run_until_not_live(state: &mut GameState, max_ticks: usize) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for _ in 0..max_ticks {
        events.extend(state.tick(DT));
        if !state.is_live() {
            break;
        }
    }
    events
}

#[test]
fn route_converges_in_predicted_ticks_regardless_of_waypoint_density() {
    let field = Field::default();
    let start = Point::new(100.0, 600.0);
    let end = Point::new(100.0, 300.0);

    let ticks_for = |path: Vec<Point>| {
        let mut wr = player(1, Team::Offense, Role::Wr);
        wr.has_ball = false;
        wr.speed_yps = 7.0;
        wr.pos = start;
        wr.path = path;
        let mut ticks: usize = 0;
        while wr.pos != end {
            follow_path(&mut wr, &field, DT);
            ticks += 1;
            assert!(ticks < 10_000, "route never finished");
        }
        (ticks, step_length(&wr, &field, DT))
    };

    let (sparse, step) = ticks_for(vec![start, end]);
    let expected = (start.distance_to(end) / step).ceil() as usize;
    assert!(sparse.abs_diff(expected) <= 1, "{sparse} vs {expected}");

    let dense: Vec<Point> = (0..=6)
        .map(|i| start.lerp(end, i as f32 / 6.0))
        .collect();
    let (dense_ticks, _) = ticks_for(dense);
    assert!(dense_ticks.abs_diff(sparse) <= 5, "{dense_ticks} vs {sparse}");
}

#[test]
fn ball_has_at_most_one_holder_through_whole_games() {
    for seed in 0..4u64 {
        let mut state = GameState::new(
            Field::default(),
            Difficulty::from_level_or_default((seed % 3 + 1) as u8),
            25.0,
            Box::new(SeededSampler::new(seed)),
        )
        .expect("default roster");

        for play in 0..4 {
            while state.phase == PlayPhase::Prep {
                state.tick(DT);
            }
            for tick in 0..1_200 {
                if tick == 30 {
                    let held = if play % 2 == 0 { 0 } else { 600 };
                    let _ = state.key_throw(1 + (play % 3) as u8, held);
                }
                state.tick(DT);
                let carriers = state.roster.carrier_count();
                if state.is_live() {
                    let expected = if state.flight.is_some() { 0 } else { 1 };
                    assert_eq!(carriers, expected, "seed {seed} play {play} tick {tick}");
                } else {
                    assert!(carriers <= 1);
                    break;
                }
            }
            if !state.next_play() {
                break;
            }
        }
    }
}

#[test]
fn downs_progress_monotonically() {
    let field = Field::default();
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for _ in 0..50 {
        let mut downs = DownsState::new(&field, rng.gen_range(5.0..60.0));
        while !downs.game_over {
            let before = downs;
            let spot = before.ball_spot_y - field.yards_to_px(rng.gen_range(-3.0..14.0));
            let outcome = downs.apply_tackle(&field, spot);

            if spot <= before.line_to_gain_y {
                assert_eq!(outcome, PlayOutcome::Tackled { first_down: true });
                assert_eq!(downs.down, 1);
                assert_eq!(downs.line_to_gain_y, spot - field.yards_to_px(10.0));
            } else if before.down == MAX_DOWNS {
                assert_eq!(outcome, PlayOutcome::TurnoverOnDowns);
                assert!(downs.game_over);
            } else {
                assert_eq!(downs.down, before.down + 1);
                assert_eq!(downs.line_to_gain_y, before.line_to_gain_y);
            }
            assert!(downs.down <= MAX_DOWNS);
        }
    }
}

#[test]
fn continuous_contact_stuns_once_until_players_separate() {
    let mut roster = Roster::new(vec![
        player(1, Team::Offense, Role::Te),
        player(2, Team::Defense, Role::Lb),
    ]);
    roster.give_ball_to(None);
    let mut contact = ContactState::default();
    let params = ContactParams::default();
    let mut stuns = 0;
    let mut now = 0.0;

    let touch = |roster: &mut Roster, contact: &mut ContactState, now: f64, gap: f32| {
        roster.players[0].pos = Point::new(200.0, 400.0);
        roster.players[1].pos = Point::new(200.0, 400.0 - gap);
        let before = contact.stunned_until(2);
        resolve_contacts(roster, contact, now, params);
        contact.stunned_until(2) != before
    };

    for _ in 0..300 {
        now += f64::from(DT);
        stuns += usize::from(touch(&mut roster, &mut contact, now, 18.0));
    }
    assert_eq!(stuns, 1);

    now += f64::from(DT);
    assert!(!touch(&mut roster, &mut contact, now, 80.0));
    for _ in 0..300 {
        now += f64::from(DT);
        stuns += usize::from(touch(&mut roster, &mut contact, now, 18.0));
    }
    assert_eq!(stuns, 2);
}

#[test]
fn quarterback_is_tackled_after_role_scaled_hold() {
    // Ball spotted at y = 300 so the tackle lands short of the line to gain
    let mut state = live_game(
        vec![player(1, Team::Offense, Role::Qb), player(2, Team::Defense, Role::Dl)],
        &[Point::new(200.0, 300.0), Point::new(200.0, 500.0)],
        68.75,
        0.0,
    );
    assert_eq!(state.los_y, 300.0);
    let hold = f64::from(state.config().tackle_hold * Role::Qb.tackle_hold_multiplier());
    assert!((hold - 0.56).abs() < 1e-6);

    let mut first_contact = None;
    let mut events = Vec::new();
    for _ in 0..1_000 {
        events.extend(state.tick(DT));
        if !state.is_live() {
            break;
        }
        let gap = state.roster.players[0]
            .pos
            .distance_to(state.roster.players[1].pos);
        if gap <= 22.0 && first_contact.is_none() {
            first_contact = Some(state.clock.now());
        }
    }

    let first_contact = first_contact.expect("defender reached the quarterback");
    let held_for = state.clock.now() - first_contact;
    assert!(
        (hold - 2.0 * f64::from(DT)..=hold + 2.0 * f64::from(DT)).contains(&held_for),
        "held for {held_for}"
    );
    assert_eq!(state.phase, PlayPhase::Dead);
    assert_eq!(state.last_outcome, Some(PlayOutcome::Tackled { first_down: false }));
    assert_eq!(state.downs.down, 2);
    assert!(events.contains(&GameEvent::PlayEnded {
        outcome: PlayOutcome::Tackled { first_down: false }
    }));
}

#[test]
fn bullet_through_coverage_is_intercepted_and_ends_game() {
    let mut state = live_game(
        vec![
            player(1, Team::Offense, Role::Qb),
            player(2, Team::Offense, Role::Wr),
            player(3, Team::Defense, Role::Cb),
        ],
        &[
            Point::new(270.0, 700.0),
            Point::new(270.0, 400.0),
            Point::new(270.0, 550.0),
        ],
        18.75,
        10.0,
    );
    state.stats = Stats { score: 14, touchdowns: 2 };
    assert_eq!(state.config().interception_radius, 20.0);

    let event = assert_ok!(state.attempt_throw(2, ThrowKind::Bullet));
    assert_eq!(event, GameEvent::Throw { from: 1, target: 2, kind: ThrowKind::Bullet });
    assert_eq!(state.flight.as_ref().and_then(|f| f.interceptor), Some(3));
    assert_eq!(state.roster.carrier_count(), 0);

    let events = run_until_not_live(&mut state, 200);
    assert!(events.contains(&GameEvent::PlayEnded {
        outcome: PlayOutcome::Intercepted { by: 3 }
    }));
    assert_eq!(state.phase, PlayPhase::GameOver);
    assert!(state.downs.game_over);
    assert_eq!(state.stats, Stats::default());
    assert!(state.roster.get(3).is_some_and(|cb| cb.has_ball));
    assert_eq!(state.timer_text(), "INTERCEPTED - GAME OVER");
}

#[test]
fn game_over_freezes_everything_until_new_game() {
    let mut state = live_game(
        vec![
            player(1, Team::Offense, Role::Qb),
            player(2, Team::Offense, Role::Wr),
            player(3, Team::Defense, Role::Cb),
        ],
        &[
            Point::new(270.0, 700.0),
            Point::new(270.0, 400.0),
            Point::new(270.0, 550.0),
        ],
        18.75,
        10.0,
    );
    assert_ok!(state.attempt_throw(2, ThrowKind::Bullet));
    run_until_not_live(&mut state, 200);
    assert_eq!(state.phase, PlayPhase::GameOver);

    let frozen: Vec<Point> = state.roster.players.iter().map(|p| p.pos).collect();
    let clock = state.clock.now();
    for _ in 0..120 {
        assert!(state.tick(DT).is_empty());
    }
    assert_eq!(frozen, state.roster.players.iter().map(|p| p.pos).collect::<Vec<_>>());
    assert_eq!(state.clock.now(), clock);

    assert_eq!(
        assert_err!(state.attempt_throw(1, ThrowKind::Lob)),
        ThrowRejection::NotLive
    );
    assert!(state.gesture_start(Point::new(270.0, 400.0), 0).is_none());
    assert!(!state.gestures.is_routing());
    assert!(!state.next_play());

    state.new_game(25.0);
    assert_eq!(state.phase, PlayPhase::Prep);
    assert!(!state.downs.game_over);
    assert_eq!(state.downs.down, 1);
    assert_eq!(state.roster.carrier_count(), 1);
    assert!(state.roster.quarterback().is_some_and(|qb| qb.has_ball));
}

#[test]
fn resize_after_turnover_on_downs_keeps_the_game_over() {
    let mut state = live_game(
        vec![player(1, Team::Offense, Role::Qb), player(2, Team::Defense, Role::Dl)],
        &[Point::new(200.0, 300.0), Point::new(200.0, 500.0)],
        68.75,
        0.0,
    );
    state.downs.down = MAX_DOWNS;
    state.stats = Stats { score: 21, touchdowns: 3 };

    let events = run_until_not_live(&mut state, 1_000);
    assert!(events.contains(&GameEvent::PlayEnded {
        outcome: PlayOutcome::TurnoverOnDowns
    }));
    assert_eq!(state.phase, PlayPhase::GameOver);
    let yard_line = state.yard_line();
    let panel = state.downs.panel(&state.field, &state.stats);

    for (width, height) in [(540.0, 900.0), (800.0, 1250.0)] {
        state.resize(width, height, 30.0);
        assert_eq!(state.phase, PlayPhase::GameOver);
        assert!(state.downs.game_over);
        assert_eq!(state.downs.down, MAX_DOWNS);
        assert_eq!(state.stats, Stats { score: 21, touchdowns: 3 });
        assert_eq!(state.yard_line(), yard_line);
        assert_eq!(state.downs.panel(&state.field, &state.stats), panel);
        assert_eq!(state.los_y, state.downs.ball_spot_y);
    }

    for _ in 0..400 {
        assert!(state.tick(DT).is_empty());
    }
    assert_eq!(state.phase, PlayPhase::GameOver);
    assert_eq!(state.timer_text(), "GAME OVER");

    state.new_game(30.0);
    assert_eq!(state.phase, PlayPhase::Prep);
    assert_eq!(state.stats, Stats::default());
    assert_eq!(state.yard_line(), 30.0);
}

#[test]
fn carrier_reaching_goal_line_scores_and_respots_at_the_25() {
    let mut state = live_game(
        vec![player(1, Team::Offense, Role::Qb), player(2, Team::Defense, Role::Cb)],
        &[Point::new(270.0, 58.0), Point::new(20.0, 820.0)],
        90.0,
        10.0,
    );
    let qb = &mut state.roster.players[0];
    qb.path = vec![Point::new(270.0, 58.0), Point::new(270.0, 20.0)];

    let events = run_until_not_live(&mut state, 120);
    assert!(events.contains(&GameEvent::PlayEnded {
        outcome: PlayOutcome::Touchdown
    }));
    assert!(state.roster.players[0].pos.y <= state.field.top_y);
    assert_eq!(state.stats, Stats { score: 7, touchdowns: 1 });
    assert_eq!(state.downs.down, 1);
    assert_eq!(state.yard_line(), 25.0);
    assert_eq!(state.phase, PlayPhase::Dead);
    assert_eq!(state.timer_text(), "TOUCHDOWN!");

    assert!(state.next_play());
    assert_eq!(state.los_y, state.field.yard_line_to_y(25.0));
    assert_eq!(state.prep_remaining, 6.0);
}

#[test]
fn paused_play_keeps_stun_window_frozen() {
    let mut state = live_game(
        vec![
            player(1, Team::Offense, Role::Qb),
            player(2, Team::Offense, Role::Ol),
            player(3, Team::Defense, Role::Lb),
        ],
        &[
            Point::new(270.0, 750.0),
            Point::new(100.0, 400.0),
            Point::new(100.0, 382.0),
        ],
        18.75,
        10.0,
    );
    let events = state.tick(DT);
    assert!(events.contains(&GameEvent::Stun { player: 3 }));
    let until = state.contact.stunned_until(3).expect("stunned");

    state.pause();
    for _ in 0..600 {
        state.tick(DT);
    }
    state.resume();
    assert!(state.contact.is_stunned(3, state.clock.now()));
    assert_eq!(state.contact.stunned_until(3), Some(until));
}
