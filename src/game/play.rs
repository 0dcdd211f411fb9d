//! Play state machine and the per-connection session loop

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Difficulty, DifficultyConfig};
use crate::store::settings::SettingsStore;
use crate::util::time::{unix_millis, FrameTimer, SimClock, SIMULATION_TPS, SNAPSHOT_TPS};
use crate::ws::protocol::{ClientMsg, GameEvent, ServerMsg};

use super::contact::{resolve_contacts, ContactParams, ContactState};
use super::defense::{move_defense, DefenseContext, Scheme};
use super::downs::{check_tackle, check_touchdown, DownsState, PlayOutcome, RushClock, Stats};
use super::flight::{
    advance_flight, plan_throw, settle_jumps, throw_targets, BallFlight, FlightOutcome, ThrowGate,
    ThrowKind, ThrowRejection,
};
use super::gesture::{GestureAction, GestureTracker};
use super::motion::advance_offense;
use super::roster::{Field, Formation, PlayerId, Point, Roster, RosterError};
use super::sampler::PlaySampler;
use super::snapshot::SnapshotBuilder;

/// Route-drawing window before each snap (seconds)
pub const PREP_SECONDS: f32 = 6.0;
/// Keyboard throw slots
pub const MAX_KEY_SLOTS: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayPhase {
    /// Route drawing, countdown running
    Prep,
    /// Motion, contact and throws active
    Live,
    /// Down is over, waiting for next play
    Dead,
    /// Terminal until a new game
    GameOver,
}

/// Authoritative state of one user's game
pub struct GameState {
    pub field: Field,
    pub roster: Roster,
    pub downs: DownsState,
    pub stats: Stats,
    pub phase: PlayPhase,
    pub paused: bool,
    pub scheme: Scheme,
    pub flight: Option<BallFlight>,
    pub pass_attempted: bool,
    pub contact: ContactState,
    pub rush: RushClock,
    pub clock: SimClock,
    pub los_y: f32,
    pub prep_remaining: f32,
    pub formation: Formation,
    pub difficulty: Difficulty,
    pub gestures: GestureTracker,
    pub last_outcome: Option<PlayOutcome>,
    rush_announced: bool,
    sampler: Box<dyn PlaySampler>,
}

impl GameState {
    /// Fresh game with the ball spotted at `yard_line`
    pub fn new(
        field: Field,
        difficulty: Difficulty,
        yard_line: f32,
        sampler: Box<dyn PlaySampler>,
    ) -> Result<Self, RosterError> {
        let roster = Roster::build(&field);
        Self::with_roster(field, roster, difficulty, yard_line, sampler)
    }

    /// Start from a hand-built roster; its Y values are offsets from the line
    pub fn with_roster(
        field: Field,
        roster: Roster,
        difficulty: Difficulty,
        yard_line: f32,
        sampler: Box<dyn PlaySampler>,
    ) -> Result<Self, RosterError> {
        roster.validate()?;
        let downs = DownsState::new(&field, yard_line);
        let mut state = Self {
            field,
            roster,
            los_y: downs.ball_spot_y,
            downs,
            stats: Stats::default(),
            phase: PlayPhase::Prep,
            paused: false,
            scheme: Scheme::default(),
            flight: None,
            pass_attempted: false,
            contact: ContactState::default(),
            rush: RushClock::default(),
            clock: SimClock::new(),
            prep_remaining: PREP_SECONDS,
            formation: Formation::default(),
            difficulty,
            gestures: GestureTracker::new(),
            last_outcome: None,
            rush_announced: false,
            sampler,
        };
        state.roster.apply_formation_to_line(state.los_y);
        state.roster.apply_speeds(state.config().def_speed_mult);
        state.reset_players();
        state.reset_rush_clock();
        Ok(state)
    }

    pub fn config(&self) -> DifficultyConfig {
        self.difficulty.config()
    }

    pub fn is_live(&self) -> bool {
        self.phase == PlayPhase::Live
    }

    pub fn is_routing(&self) -> bool {
        self.gestures.is_routing()
    }

    pub fn play_ended(&self) -> bool {
        matches!(self.phase, PlayPhase::Dead | PlayPhase::GameOver)
    }

    pub fn carrier(&self) -> Option<PlayerId> {
        self.roster.players.iter().find(|p| p.has_ball).map(|p| p.id)
    }

    /// Current yard line of the ball spot, for persistence
    pub fn yard_line(&self) -> f32 {
        self.downs.spot_yard_line(&self.field)
    }

    fn reset_players(&mut self) {
        for player in &mut self.roster.players {
            player.reset();
        }
    }

    fn reset_rush_clock(&mut self) {
        let cfg = self.config();
        let delay = self
            .sampler
            .rush_delay(cfg.rush_delay_min, cfg.rush_delay_max);
        self.rush.reset(delay);
        self.rush_announced = false;
    }

    /// Advance the simulation by `dt` seconds (already clamped by the caller)
    pub fn tick(&mut self, dt: f32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.paused || self.phase == PlayPhase::GameOver {
            return events;
        }

        self.clock.advance(dt);
        let now = self.clock.now();

        if self.phase == PlayPhase::Prep && !self.is_routing() {
            self.prep_remaining = (self.prep_remaining - dt).max(0.0);
            if self.prep_remaining <= 0.0 {
                events.push(self.start_play());
            }
        }

        settle_jumps(&mut self.roster, now);

        if self.phase != PlayPhase::Live {
            return events;
        }

        let cfg = self.config();
        self.rush.advance(dt);
        let rush_active = self.rush.is_active();
        if rush_active && !self.rush_announced {
            self.rush_announced = true;
            events.push(GameEvent::RushActive);
        }
        let routing = self.is_routing();

        if !routing {
            advance_offense(&mut self.roster, &self.field, dt);
        }

        if let Some(flight) = self.flight.as_mut() {
            let outcome = advance_flight(
                flight,
                &mut self.roster,
                &self.contact,
                now,
                cfg.interception_radius,
            );
            match outcome {
                Some(FlightOutcome::Caught(by)) => {
                    self.flight = None;
                    debug!(player = by, "pass complete");
                    events.push(GameEvent::Catch { by });
                }
                Some(FlightOutcome::Intercepted(by)) => {
                    self.flight = None;
                    let outcome = self.downs.apply_interception(&self.field, &mut self.stats, by);
                    self.end_play(outcome, &mut events);
                    return events;
                }
                None => {}
            }
        }

        if !routing {
            let ctx = DefenseContext::build(
                &self.roster,
                &self.field,
                self.scheme,
                self.los_y,
                rush_active,
                self.pass_attempted || self.flight.is_some(),
                self.flight.as_ref().map(|f| f.target),
            );
            move_defense(&mut self.roster, &self.field, &ctx, &self.contact, now, dt);
        }

        if check_touchdown(&self.roster, &self.field) {
            let outcome = self.downs.apply_touchdown(&self.field, &mut self.stats);
            self.end_play(outcome, &mut events);
            return events;
        }

        if check_tackle(&self.roster, &mut self.contact, now, cfg.tackle_hold) {
            if let Some(spot) = self.roster.players.iter().find(|p| p.has_ball).map(|p| p.pos.y) {
                let outcome = self.downs.apply_tackle(&self.field, spot);
                self.end_play(outcome, &mut events);
                return events;
            }
        }

        let stunned_before: Vec<PlayerId> = self
            .roster
            .players
            .iter()
            .filter(|p| p.is_defense() && self.contact.is_stunned(p.id, now))
            .map(|p| p.id)
            .collect();
        resolve_contacts(
            &mut self.roster,
            &mut self.contact,
            now,
            ContactParams {
                rush_active,
                push_through: cfg.rush_push_through,
            },
        );
        for player in self.roster.players.iter().filter(|p| p.is_defense()) {
            if self.contact.is_stunned(player.id, now) && !stunned_before.contains(&player.id) {
                events.push(GameEvent::Stun { player: player.id });
            }
        }

        events
    }

    fn start_play(&mut self) -> GameEvent {
        self.scheme = self.sampler.scheme();
        self.pass_attempted = false;
        self.phase = PlayPhase::Live;
        self.los_y = self.downs.ball_spot_y;
        self.reset_rush_clock();
        info!(
            scheme = ?self.scheme,
            down = self.downs.down,
            yard_line = self.yard_line(),
            rush_delay = self.rush.delay,
            "snap"
        );
        GameEvent::Snap {
            scheme: self.scheme,
            rush_delay: self.rush.delay,
        }
    }

    fn end_play(&mut self, outcome: PlayOutcome, events: &mut Vec<GameEvent>) {
        self.phase = if self.downs.game_over {
            PlayPhase::GameOver
        } else {
            PlayPhase::Dead
        };
        self.last_outcome = Some(outcome);
        self.gestures.cancel();
        self.los_y = self.downs.ball_spot_y;
        info!(
            outcome = ?outcome,
            down = self.downs.down,
            score = self.stats.score,
            game_over = self.downs.game_over,
            "play over"
        );
        events.push(GameEvent::PlayEnded { outcome });
    }

    /// Throw to `target`. Rejections change nothing.
    pub fn attempt_throw(
        &mut self,
        target: PlayerId,
        kind: ThrowKind,
    ) -> Result<GameEvent, ThrowRejection> {
        let gate = ThrowGate {
            live: self.is_live(),
            paused: self.paused,
            flight_active: self.flight.is_some(),
            los_y: self.los_y,
            interception_radius: self.config().interception_radius,
        };
        let flight = plan_throw(&self.roster, &self.contact, self.clock.now(), gate, target, kind)?;
        let from = self.carrier().ok_or(ThrowRejection::NoCarrier)?;

        if let Some(interceptor) = flight.interceptor {
            debug!(interceptor, "bullet thrown into coverage");
        }
        self.roster.give_ball_to(None);
        self.pass_attempted = true;
        self.flight = Some(flight);
        Ok(GameEvent::Throw { from, target, kind })
    }

    /// Number-key throw: slot 1 is the first eligible target
    pub fn key_throw(&mut self, slot: u8, held_ms: u64) -> Result<GameEvent, ThrowRejection> {
        if self.paused {
            return Err(ThrowRejection::Paused);
        }
        if !(1..=MAX_KEY_SLOTS).contains(&slot) {
            return Err(ThrowRejection::EmptySlot(slot));
        }
        let target = throw_targets(&self.roster)
            .get(usize::from(slot - 1))
            .copied()
            .ok_or(ThrowRejection::EmptySlot(slot))?;
        self.attempt_throw(target, ThrowKind::from_hold_ms(held_ms))
    }

    fn gestures_blocked(&self) -> bool {
        self.paused || self.play_ended()
    }

    pub fn gesture_start(&mut self, at: Point, now_ms: u64) -> Option<GameEvent> {
        if self.gestures_blocked() {
            return None;
        }
        self.gestures.start(&self.roster, at, now_ms);
        None
    }

    pub fn gesture_move(&mut self, at: Point) -> Option<GameEvent> {
        if self.gestures_blocked() {
            return None;
        }
        match self.gestures.moved(at) {
            GestureAction::BeginRoute { player, to } => {
                if let Some(p) = self.roster.get_mut(player) {
                    p.path = vec![p.pos, to];
                    p.path_index = 0;
                }
            }
            GestureAction::ExtendRoute { player, to } => {
                if let Some(p) = self.roster.get_mut(player) {
                    p.path.push(to);
                }
            }
            _ => {}
        }
        None
    }

    pub fn gesture_end(&mut self, now_ms: u64, held_ms: Option<u64>) -> Option<GameEvent> {
        if self.gestures_blocked() {
            return None;
        }
        match self.gestures.end(now_ms, held_ms) {
            GestureAction::Throw { target, kind } if self.is_live() => {
                match self.attempt_throw(target, kind) {
                    Ok(event) => Some(event),
                    Err(rejection) => {
                        debug!(target, ?kind, %rejection, "throw ignored");
                        None
                    }
                }
            }
            _ => None,
        }
    }

    /// Idempotent
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Line up at the new spot after a dead ball. No-op unless the down is over
    /// and the game is still going.
    pub fn next_play(&mut self) -> bool {
        if self.phase != PlayPhase::Dead || self.downs.game_over {
            return false;
        }
        let yard_line = self.yard_line();
        self.los_y = self.field.yard_line_to_y(yard_line);
        self.downs.ball_spot_y = self.los_y;
        self.downs.play_ended = false;
        self.roster.apply_formation_to_line(self.los_y);
        self.reset_players();
        self.flight = None;
        self.pass_attempted = false;
        self.contact.clear();
        self.gestures.cancel();
        self.phase = PlayPhase::Prep;
        self.prep_remaining = PREP_SECONDS;
        self.last_outcome = None;
        self.reset_rush_clock();
        true
    }

    /// Clean score, first and ten at `yard_line`
    pub fn new_game(&mut self, yard_line: f32) {
        self.stats = Stats::default();
        self.reset_down_state(yard_line);
    }

    fn reset_down_state(&mut self, yard_line: f32) {
        self.downs = DownsState::new(&self.field, yard_line);
        self.los_y = self.downs.ball_spot_y;
        self.roster.apply_formation_to_line(self.los_y);
        self.reset_players();
        self.flight = None;
        self.pass_attempted = false;
        self.contact.clear();
        self.gestures.cancel();
        self.phase = PlayPhase::Prep;
        self.prep_remaining = PREP_SECONDS;
        self.last_outcome = None;
        self.reset_rush_clock();
    }

    /// Rebuild field and roster for a new surface size. A finished game keeps
    /// its downs and phase; only the layout moves.
    pub fn resize(&mut self, width: f32, height: f32, yard_line: f32) {
        let finished = self.downs.game_over.then(|| {
            let spot = self.field.y_to_yard_line(self.downs.ball_spot_y);
            let to_gain =
                (self.downs.ball_spot_y - self.downs.line_to_gain_y) / self.field.pixels_per_yard;
            (spot, to_gain)
        });
        let line_yards = finished.map_or(yard_line, |(spot, _)| spot);

        self.field.resize(width, height);
        self.roster = Roster::build(&self.field);
        self.roster.apply_speeds(self.config().def_speed_mult);
        if self.formation != Formation::Standard {
            let line = self.field.yard_line_to_y(line_yards);
            self.roster.apply_formation(self.formation, &self.field, line);
        }

        match finished {
            Some((spot, to_gain)) => {
                self.downs.ball_spot_y = self.field.yard_line_to_y(spot);
                self.downs.line_to_gain_y =
                    self.downs.ball_spot_y - self.field.yards_to_px(to_gain);
                self.los_y = self.downs.ball_spot_y;
                self.roster.apply_formation_to_line(self.los_y);
                self.reset_players();
                self.flight = None;
                self.contact.clear();
                self.gestures.cancel();
            }
            None => self.reset_down_state(yard_line),
        }
    }

    pub fn set_formation(&mut self, formation: Formation) -> bool {
        if self.phase != PlayPhase::Prep || self.paused {
            return false;
        }
        self.formation = formation;
        self.roster.apply_formation(formation, &self.field, self.los_y);
        self.reset_players();
        true
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> bool {
        if self.phase != PlayPhase::Prep {
            return false;
        }
        self.difficulty = difficulty;
        self.roster.apply_speeds(self.config().def_speed_mult);
        self.reset_rush_clock();
        true
    }

    /// Countdown / status line shown above the field
    pub fn timer_text(&self) -> String {
        if self.paused {
            return "PAUSED".to_string();
        }
        match (self.phase, self.last_outcome) {
            (PlayPhase::Prep, _) => format!("PREP: {}", self.prep_remaining.ceil() as u32),
            (PlayPhase::Live, _) => "GO!".to_string(),
            (_, Some(PlayOutcome::Touchdown)) => "TOUCHDOWN!".to_string(),
            (_, Some(PlayOutcome::Intercepted { .. })) => "INTERCEPTED - GAME OVER".to_string(),
            (PlayPhase::GameOver, _) => "GAME OVER".to_string(),
            (PlayPhase::Dead, _) => "TACKLED".to_string(),
        }
    }
}

/// Message from the connection task into a session
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub msg: ClientMsg,
    pub received_at: u64,
}

/// Whose settings a session reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOwner {
    User(Uuid),
    /// Keyed by the session id; settings are dropped when the session ends
    Anonymous(Uuid),
}

impl SessionOwner {
    pub fn is_anonymous(self) -> bool {
        matches!(self, SessionOwner::Anonymous(_))
    }
}

impl fmt::Display for SessionOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOwner::User(id) | SessionOwner::Anonymous(id) => write!(f, "{id}"),
        }
    }
}

/// Handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub owner: SessionOwner,
    pub input_tx: mpsc::Sender<SessionInput>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
}

/// Registry of all active sessions
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn insert(&self, handle: SessionHandle) {
        self.sessions.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.remove(id).map(|(_, h)| h)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// One user's game running on its own tick loop
pub struct PlaySession {
    id: Uuid,
    owner: SessionOwner,
    /// Settings key, the owner's id as a string
    owner_key: String,
    state: GameState,
    tick: u64,
    input_rx: mpsc::Receiver<SessionInput>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    frame_timer: FrameTimer,
    settings: Arc<SettingsStore>,
    pending_events: Vec<GameEvent>,
}

impl PlaySession {
    pub fn new(
        id: Uuid,
        owner: SessionOwner,
        state: GameState,
        settings: Arc<SettingsStore>,
    ) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);

        let handle = SessionHandle {
            id,
            owner,
            input_tx,
            snapshot_tx: snapshot_tx.clone(),
        };

        let session = Self {
            id,
            owner,
            owner_key: owner.to_string(),
            state,
            tick: 0,
            input_rx,
            snapshot_tx,
            snapshot_builder: SnapshotBuilder::new(SIMULATION_TPS / SNAPSHOT_TPS),
            frame_timer: FrameTimer::new(),
            settings,
            pending_events: Vec::new(),
        };

        (session, handle)
    }

    /// Run the tick loop until the connection drops
    pub async fn run(mut self) {
        info!(session_id = %self.id, owner = %self.owner, "session started");

        let tick_duration = Duration::from_micros(1_000_000 / SIMULATION_TPS as u64);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            if !self.process_inputs() {
                break;
            }

            let dt = self.frame_timer.frame_delta(Instant::now());
            let events = self.state.tick(dt);
            self.tick += 1;
            self.publish(events);
        }

        if self.owner.is_anonymous() {
            self.settings.forget(&self.owner_key);
        }
        info!(session_id = %self.id, score = self.state.stats.score, "session closed");
    }

    /// Drain queued input. Returns false once the connection side is gone.
    fn process_inputs(&mut self) -> bool {
        loop {
            match self.input_rx.try_recv() {
                Ok(input) => self.handle_input(input),
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle_input(&mut self, input: SessionInput) {
        let now_ms = input.received_at;
        let event = match input.msg {
            ClientMsg::GestureStart { x, y } => self.state.gesture_start(Point::new(x, y), now_ms),
            ClientMsg::GestureMove { x, y } => self.state.gesture_move(Point::new(x, y)),
            ClientMsg::GestureEnd { held_ms, .. } => self.state.gesture_end(now_ms, held_ms),
            ClientMsg::KeyThrow { slot, held_ms } => match self.state.key_throw(slot, held_ms) {
                Ok(event) => Some(event),
                Err(rejection) => {
                    debug!(session_id = %self.id, slot, %rejection, "key throw ignored");
                    None
                }
            },
            ClientMsg::Pause => {
                self.state.pause();
                None
            }
            ClientMsg::Resume => {
                self.state.resume();
                // The paused span must not land in the next frame's delta
                self.frame_timer.invalidate();
                None
            }
            ClientMsg::NextPlay => {
                if self.state.next_play() {
                    self.save_yard_line(self.state.yard_line());
                }
                None
            }
            ClientMsg::NewGame => {
                let yard_line = self.settings.yard_line(&self.owner_key);
                self.state.new_game(yard_line);
                info!(session_id = %self.id, yard_line, "new game");
                None
            }
            ClientMsg::SetFormation { formation } => {
                if !self.state.set_formation(formation) {
                    self.send_error("formation_locked", "formation can only change before the snap");
                }
                None
            }
            ClientMsg::SetDifficulty { level } => {
                match Difficulty::from_level(level) {
                    Some(difficulty) if self.state.set_difficulty(difficulty) => {
                        if let Err(e) =
                            self.settings
                                .put(&self.owner_key, "difficulty", &level.to_string())
                        {
                            warn!(session_id = %self.id, error = %e, "failed to persist difficulty");
                        }
                    }
                    Some(_) => {
                        self.send_error("difficulty_locked", "difficulty can only change before the snap")
                    }
                    None => self.send_error("invalid_difficulty", "difficulty level must be 1, 2 or 3"),
                }
                None
            }
            ClientMsg::Resize { width, height } => {
                let yard_line = self.settings.yard_line(&self.owner_key);
                self.state.resize(width, height, yard_line);
                self.frame_timer.invalidate();
                None
            }
            ClientMsg::Ping { t } => {
                let _ = self.snapshot_tx.send(ServerMsg::Pong {
                    t,
                    server_time: unix_millis(),
                });
                None
            }
        };
        if let Some(event) = event {
            self.pending_events.push(event);
            self.snapshot_builder.force_next();
        }
    }

    fn publish(&mut self, events: Vec<GameEvent>) {
        for event in &events {
            if let GameEvent::PlayEnded { outcome } = event {
                self.announce_outcome(*outcome);
            }
        }
        if !events.is_empty() {
            self.snapshot_builder.force_next();
        }
        self.pending_events.extend(events);

        if self.snapshot_builder.should_send() {
            let events = std::mem::take(&mut self.pending_events);
            let snapshot = self.snapshot_builder.build(self.tick, &self.state, events);
            // No receivers just means the socket writer is gone
            let _ = self.snapshot_tx.send(snapshot);
        }
    }

    fn announce_outcome(&mut self, outcome: PlayOutcome) {
        let yard_line = self.state.yard_line();
        // A failed fourth down is not a place to start the next game from
        if outcome != PlayOutcome::TurnoverOnDowns {
            self.save_yard_line(yard_line);
        }

        let stats = self.state.stats;
        let msg = if self.state.downs.game_over {
            ServerMsg::GameOver { outcome, stats }
        } else {
            ServerMsg::PlayEnded {
                outcome,
                yard_line: yard_line as u32,
                stats,
            }
        };
        let _ = self.snapshot_tx.send(msg);
    }

    fn save_yard_line(&self, yard_line: f32) {
        if let Err(e) = self.settings.save_yard_line(&self.owner_key, yard_line) {
            warn!(session_id = %self.id, error = %e, "failed to persist yard line");
        }
    }

    fn send_error(&self, code: &str, message: &str) {
        let _ = self.snapshot_tx.send(ServerMsg::Error {
            code: code.to_string(),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::sampler::FixedSampler;

    fn game() -> GameState {
        GameState::new(
            Field::default(),
            Difficulty::Medium,
            25.0,
            Box::new(FixedSampler::new(Scheme::Man, 3.0)),
        )
        .unwrap()
    }

    fn run_prep(state: &mut GameState) {
        for _ in 0..((PREP_SECONDS / 0.05) as usize + 1) {
            state.tick(0.05);
        }
    }

    #[test]
    fn test_prep_countdown_starts_play() {
        let mut state = game();
        assert_eq!(state.timer_text(), "PREP: 6");
        state.tick(0.05);
        assert_eq!(state.phase, PlayPhase::Prep);

        run_prep(&mut state);
        assert_eq!(state.phase, PlayPhase::Live);
        assert_eq!(state.timer_text(), "GO!");
    }

    #[test]
    fn test_routing_holds_the_countdown() {
        let mut state = game();
        let qb = state.roster.quarterback().unwrap().pos;
        state.gesture_start(qb, 0);
        state.gesture_move(Point::new(qb.x, qb.y - 40.0));
        assert!(state.is_routing());

        for _ in 0..400 {
            state.tick(0.05);
        }
        assert_eq!(state.phase, PlayPhase::Prep);
        assert_eq!(state.prep_remaining, PREP_SECONDS);

        state.gesture_end(10, None);
        run_prep(&mut state);
        assert!(state.is_live());
    }

    #[test]
    fn test_pause_freezes_everything() {
        let mut state = game();
        run_prep(&mut state);
        let before: Vec<Point> = state.roster.players.iter().map(|p| p.pos).collect();
        let clock = state.clock.now();

        state.pause();
        state.pause();
        for _ in 0..100 {
            assert!(state.tick(0.05).is_empty());
        }
        let after: Vec<Point> = state.roster.players.iter().map(|p| p.pos).collect();
        assert_eq!(before, after);
        assert_eq!(state.clock.now(), clock);
        assert_eq!(state.timer_text(), "PAUSED");

        state.resume();
        state.tick(0.05);
        assert!(state.clock.now() > clock);
    }

    #[test]
    fn test_throw_before_snap_is_rejected_without_side_effects() {
        let mut state = game();
        let wr = throw_targets(&state.roster)[0];
        assert_eq!(
            state.attempt_throw(wr, ThrowKind::Bullet),
            Err(ThrowRejection::NotLive)
        );
        assert!(state.flight.is_none());
        assert_eq!(state.roster.carrier_count(), 1);
    }

    #[test]
    fn test_key_throw_releases_ball() {
        let mut state = game();
        run_prep(&mut state);
        let event = state.key_throw(1, 0).unwrap();
        assert!(matches!(event, GameEvent::Throw { kind: ThrowKind::Bullet, .. }));
        assert!(state.flight.is_some());
        assert_eq!(state.roster.carrier_count(), 0);
        assert!(state.pass_attempted);

        assert_eq!(state.key_throw(2, 0), Err(ThrowRejection::NoCarrier));
        assert_eq!(state.key_throw(9, 0), Err(ThrowRejection::EmptySlot(9)));
    }

    #[test]
    fn test_next_play_only_after_dead_ball() {
        let mut state = game();
        assert!(!state.next_play());
        state.phase = PlayPhase::Dead;
        state.downs.ball_spot_y = state.field.yard_line_to_y(31.6);
        assert!(state.next_play());
        assert_eq!(state.phase, PlayPhase::Prep);
        assert_eq!(state.yard_line(), 32.0);
        assert_eq!(state.roster.carrier_count(), 1);
    }

    #[test]
    fn test_formation_only_changes_in_prep() {
        let mut state = game();
        assert!(state.set_formation(Formation::Shotgun));
        let qb = state.roster.quarterback().unwrap();
        assert_eq!(qb.pos.y, state.los_y + 110.0);

        run_prep(&mut state);
        assert!(!state.set_formation(Formation::Empty));
        assert_eq!(state.formation, Formation::Shotgun);
    }

    #[test]
    fn test_resize_rebuilds_from_yard_line() {
        let mut state = game();
        state.resize(800.0, 1250.0, 40.0);
        assert_eq!(state.field.pixels_per_yard, 11.5);
        assert_eq!(state.yard_line(), 40.0);
        assert_eq!(state.phase, PlayPhase::Prep);
        assert_eq!(state.roster.players.len(), 22);
    }

    #[tokio::test]
    async fn test_session_streams_snapshots_and_stops_on_disconnect() {
        let settings = Arc::new(SettingsStore::new());
        let owner = SessionOwner::User(Uuid::new_v4());
        let (session, handle) = PlaySession::new(Uuid::new_v4(), owner, game(), settings);
        let mut rx = handle.snapshot_tx.subscribe();
        let task = tokio::spawn(session.run());

        let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("snapshot in time")
            .expect("channel open");
        assert!(matches!(msg, ServerMsg::Snapshot(_)));

        drop(handle);
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("session exits")
            .expect("no panic");
    }

    #[tokio::test]
    async fn test_anonymous_settings_end_with_the_session() {
        let settings = Arc::new(SettingsStore::new());
        let user = SessionOwner::User(Uuid::new_v4());
        let anon_id = Uuid::new_v4();
        let anon = SessionOwner::Anonymous(anon_id);

        for owner in [user, anon] {
            let (session, handle) = PlaySession::new(Uuid::new_v4(), owner, game(), settings.clone());
            settings.save_yard_line(&owner.to_string(), 35.0).unwrap();
            let task = tokio::spawn(session.run());
            drop(handle);
            tokio::time::timeout(Duration::from_secs(2), task)
                .await
                .expect("session exits")
                .expect("no panic");
        }

        assert_eq!(settings.owners(), 1);
        assert_eq!(settings.yard_line(&user.to_string()), 35.0);
        assert_eq!(settings.yard_line(&anon_id.to_string()), 25.0);
    }

    #[test]
    fn test_turnover_on_downs_keeps_stored_yard_line() {
        let settings = Arc::new(SettingsStore::new());
        let owner = SessionOwner::User(Uuid::new_v4());
        let key = owner.to_string();
        settings.save_yard_line(&key, 40.0).unwrap();

        let (mut session, _handle) = PlaySession::new(Uuid::new_v4(), owner, game(), settings.clone());
        session.state.downs.ball_spot_y = session.state.field.yard_line_to_y(43.0);

        session.announce_outcome(PlayOutcome::TurnoverOnDowns);
        assert_eq!(settings.yard_line(&key), 40.0);

        session.announce_outcome(PlayOutcome::Tackled { first_down: false });
        assert_eq!(settings.yard_line(&key), 43.0);
    }
}
