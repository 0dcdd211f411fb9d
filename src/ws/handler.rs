//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::roster::{Field, Formation};
use crate::game::sampler::SeededSampler;
use crate::game::{GameState, PlaySession, SessionInput, SessionOwner};
use crate::http::middleware::verify_jwt;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, FormationInfo, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT token; without one the session is anonymous
    #[serde(default)]
    pub token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let user_id = match query.token.as_deref() {
        None => None,
        Some(token) => match verify_jwt(token, &state.config.supabase_jwt_secret) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                warn!(error = %e, "WebSocket auth failed");
                return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
            }
        },
    };

    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: Option<Uuid>, state: AppState) {
    let session_id = Uuid::new_v4();
    // Settings follow the account when there is one
    let owner = match user_id {
        Some(id) => SessionOwner::User(id),
        None => SessionOwner::Anonymous(session_id),
    };
    let owner_key = owner.to_string();

    let (mut ws_sink, ws_stream) = socket.split();

    let difficulty = state
        .settings
        .difficulty(&owner_key, state.config.default_difficulty);
    let yard_line = state.settings.yard_line(&owner_key);
    let seed: u64 = rand::random();

    info!(
        session_id = %session_id,
        user_id = ?user_id,
        difficulty = difficulty.level(),
        yard_line,
        seed,
        "New WebSocket connection"
    );

    let game = match GameState::new(
        Field::default(),
        difficulty,
        yard_line,
        Box::new(SeededSampler::new(seed)),
    ) {
        Ok(game) => game,
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to build roster");
            let _ = send_msg(
                &mut ws_sink,
                &ServerMsg::Error {
                    code: "roster".to_string(),
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    let (session, handle) = PlaySession::new(session_id, owner, game, state.settings.clone());
    let snapshot_rx = handle.snapshot_tx.subscribe();
    state.sessions.insert(handle.clone());
    tokio::spawn(session.run());

    let welcome = ServerMsg::Welcome {
        session_id,
        user_id,
        server_time: unix_millis(),
        difficulty: difficulty.level(),
        formations: Formation::ALL.into_iter().map(FormationInfo::from).collect(),
    };

    if send_msg(&mut ws_sink, &welcome).await.is_ok() {
        run_connection(session_id, ws_sink, ws_stream, handle.input_tx.clone(), snapshot_rx).await;
    } else {
        error!(session_id = %session_id, "Failed to send welcome");
    }

    // Dropping the last input sender stops the session loop, which also
    // clears an anonymous owner's settings
    state.sessions.remove(&session_id);
    drop(handle);

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Pump snapshots out and client messages in until either side closes
async fn run_connection(
    session_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    input_tx: mpsc::Sender<SessionInput>,
    mut snapshot_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Writer task: session broadcast -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match snapshot_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Snapshots are full state, so skipping some is harmless
                    warn!(session_id = %session_id, lagged_count = n, "Client lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(session_id = %session_id, "Snapshot channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> session
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    debug!(session_id = %session_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        let input = SessionInput {
                            msg,
                            received_at: unix_millis(),
                        };
                        if input_tx.send(input).await.is_err() {
                            debug!(session_id = %session_id, "Input channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
