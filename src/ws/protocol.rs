//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::defense::Scheme;
use crate::game::downs::{DownsPanel, PlayOutcome, Stats};
use crate::game::flight::ThrowKind;
use crate::game::play::PlayPhase;
use crate::game::roster::{Formation, PlayerId, Point, Role, Team};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Pointer pressed on the field
    GestureStart { x: f32, y: f32 },

    /// Pointer dragged
    GestureMove { x: f32, y: f32 },

    /// Pointer released (or cancelled)
    GestureEnd {
        x: f32,
        y: f32,
        /// Hold duration measured on the client, if it has one
        #[serde(default)]
        held_ms: Option<u64>,
    },

    /// Number key 1-5: throw to that slot of the target list
    KeyThrow {
        slot: u8,
        #[serde(default)]
        held_ms: u64,
    },

    Pause,

    Resume,

    /// Line up for the next down after a dead ball
    NextPlay,

    /// Start over from the 25 with a clean score
    NewGame,

    /// Pick an offensive formation (prep only)
    SetFormation { formation: Formation },

    /// Switch difficulty level 1-3 (prep only)
    SetDifficulty { level: u8 },

    /// Playing surface changed size
    Resize { width: f32, height: f32 },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        session_id: Uuid,
        /// Present when the connection carried a valid token
        user_id: Option<Uuid>,
        server_time: u64,
        difficulty: u8,
        formations: Vec<FormationInfo>,
    },

    /// Render state (sent at regular intervals and on every event)
    Snapshot(PlaySnapshot),

    /// A down just ended
    PlayEnded {
        outcome: PlayOutcome,
        /// Yard line of the next snap
        yard_line: u32,
        stats: Stats,
    },

    /// The game is over; only `new_game` continues
    GameOver {
        outcome: PlayOutcome,
        /// Final score (zero after an interception)
        stats: Stats,
    },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
        server_time: u64,
    },
}

/// Formation picker entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationInfo {
    pub id: Formation,
    pub name: String,
}

impl From<Formation> for FormationInfo {
    fn from(formation: Formation) -> Self {
        Self {
            id: formation,
            name: formation.display_name().to_string(),
        }
    }
}

/// Read-only render view of one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaySnapshot {
    /// Server tick number
    pub tick: u64,
    pub phase: PlayPhase,
    pub paused: bool,
    pub routing: bool,
    /// "PREP: 6", "GO!", "TACKLED", ...
    pub timer_text: String,
    pub field: FieldSnapshot,
    pub line_of_scrimmage_y: f32,
    pub line_to_gain_y: f32,
    pub downs: DownsPanel,
    pub stats: Stats,
    pub formation: Formation,
    /// Display name of the difficulty in play
    pub difficulty: String,
    pub players: Vec<PlayerSnapshot>,
    pub ball: Option<BallSnapshot>,
    /// Keyboard throw slots, in order
    pub throw_targets: Vec<PlayerId>,
    /// Events that occurred since last snapshot
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub width: f32,
    pub height: f32,
    pub top_y: f32,
    pub bottom_y: f32,
    pub pixels_per_yard: f32,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub team: Team,
    pub role: Role,
    pub x: f32,
    pub y: f32,
    pub has_ball: bool,
    pub stunned: bool,
    /// Vertical lift while leaping for a lob
    pub jump_offset: f32,
    /// Drawn route (offense only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Point>,
}

/// Airborne ball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub x: f32,
    pub y: f32,
    pub shadow_x: f32,
    pub shadow_y: f32,
    pub kind: ThrowKind,
    pub progress: f32,
}

/// Things that happened during a play
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Prep countdown ran out; the play is live
    Snap { scheme: Scheme, rush_delay: f32 },

    /// A legal throw left the carrier's hand
    Throw {
        from: PlayerId,
        target: PlayerId,
        kind: ThrowKind,
    },

    /// Offense completed a catch
    Catch { by: PlayerId },

    /// Defender froze on first contact
    Stun { player: PlayerId },

    /// Pass rush switched on
    RushActive,

    /// The down ended
    PlayEnded { outcome: PlayOutcome },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_parse_from_json() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"gesture_end","x":1.0,"y":2.0}"#).unwrap();
        assert!(matches!(msg, ClientMsg::GestureEnd { held_ms: None, .. }));

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"set_formation","formation":"i_formation"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMsg::SetFormation {
                formation: Formation::IFormation
            }
        ));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"key_throw","slot":3}"#).unwrap();
        assert!(matches!(msg, ClientMsg::KeyThrow { slot: 3, held_ms: 0 }));
    }

    #[test]
    fn test_play_ended_wire_shape() {
        let msg = ServerMsg::PlayEnded {
            outcome: PlayOutcome::Tackled { first_down: true },
            yard_line: 37,
            stats: Stats::default(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "play_ended");
        assert_eq!(json["outcome"]["kind"], "tackled");
        assert_eq!(json["outcome"]["first_down"], true);
        assert_eq!(json["yard_line"], 37);
    }
}
