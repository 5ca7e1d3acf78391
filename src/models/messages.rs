use actix::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{GameError, Result};
use crate::game::board::Board;
use crate::game::piece::Color;
use crate::game::player::PlayerState;
use crate::game::session::GameStatus;
use crate::game::ConnectionId;

/// A command received from a client, already lifted out of its
/// `[ACTION, payload]` envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Identify { user_id: String },
    Connect { user_id: String },
    Move(ReceivedMove),
    Setting { total_length: f64, per_move: f64 },
}

#[derive(Deserialize)]
struct UserPayload {
    id: String,
}

#[derive(Deserialize)]
struct SettingPayload {
    total_length: f64,
    per_move: f64,
}

/// A move as the client sends it: pieces by id, destination by coordinates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReceivedMove {
    pub piece_id: Uuid,
    pub x: i8,
    pub y: i8,
    #[serde(default)]
    pub takes: Option<Uuid>,
    #[serde(default)]
    pub nested: Option<NestedMove>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NestedMove {
    pub piece_id: Uuid,
    pub x: i8,
    pub y: i8,
}

fn payload<T: for<'de> Deserialize<'de>>(action: &str, data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| GameError::MalformedMessage {
        reason: format!("bad {} payload", action),
        source: Some(e),
    })
}

impl ClientCommand {
    pub fn parse(text: &str) -> Result<ClientCommand> {
        let (action, data): (String, Value) =
            serde_json::from_str(text).map_err(|e| GameError::MalformedMessage {
                reason: "expected [ACTION, payload]".to_string(),
                source: Some(e),
            })?;

        match action.as_str() {
            "IDENTIFY" => Ok(ClientCommand::Identify {
                user_id: payload::<UserPayload>(&action, data)?.id,
            }),
            "CONNECT" => Ok(ClientCommand::Connect {
                user_id: payload::<UserPayload>(&action, data)?.id,
            }),
            "MOVE" => Ok(ClientCommand::Move(payload(&action, data)?)),
            "SETTING" => {
                let setting: SettingPayload = payload(&action, data)?;
                Ok(ClientCommand::Setting {
                    total_length: setting.total_length,
                    per_move: setting.per_move,
                })
            }
            other => Err(GameError::malformed(format!("unknown action {}", other))),
        }
    }
}

/// Per-player state sent to that player only.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlayerStateMessage {
    pub id: String,
    pub color: Color,
    pub state: PlayerState,
    pub remaining_time: f64,
}

/// What everyone in the session may know about a player.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlayerPublicState {
    pub color: Color,
    pub state: PlayerState,
    pub remaining_time: f64,
}

#[derive(Serialize, Debug)]
pub struct GameStateMessage<'a> {
    pub id: Uuid,
    pub state: GameStatus,
    pub board: &'a Board,
    pub on_move: Option<Color>,
    pub winner: Option<Color>,
    pub server_time: f64,
    pub players: Vec<PlayerPublicState>,
}

#[derive(Serialize, Debug, Clone)]
pub struct TimerMessage {
    pub server_time: f64,
    pub remaining_white: Option<f64>,
    pub remaining_black: Option<f64>,
    pub players: Vec<PlayerPublicState>,
}

/// Message sent from server to client
#[derive(Debug)]
pub enum ServerMessage<'a> {
    PlayerState(PlayerStateMessage),
    GameState(GameStateMessage<'a>),
    Timer(TimerMessage),
}

impl ServerMessage<'_> {
    pub fn action(&self) -> &'static str {
        match self {
            ServerMessage::PlayerState(_) => "PLAYER_STATE",
            ServerMessage::GameState(_) => "GAME_STATE",
            ServerMessage::Timer(_) => "TIMER",
        }
    }

    /// Wrap the payload in its `[ACTION, payload]` envelope.
    pub fn encode(&self) -> Result<String> {
        let text = match self {
            ServerMessage::PlayerState(state) => serde_json::to_string(&(self.action(), state))?,
            ServerMessage::GameState(state) => serde_json::to_string(&(self.action(), state))?,
            ServerMessage::Timer(timer) => serde_json::to_string(&(self.action(), timer))?,
        };
        Ok(text)
    }
}

/// A serialized message waiting for delivery. No recipient means every
/// connection bound to a player in the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub recipient: Option<ConnectionId>,
    pub payload: String,
}

/// Message type for WebSocket communication
#[derive(Message)]
#[rtype(result = "()")]
pub struct ChessWebSocketMessage(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connect_and_identify() {
        assert_eq!(
            ClientCommand::parse(r#"["CONNECT", {"id": "a"}]"#).unwrap(),
            ClientCommand::Connect { user_id: "a".into() }
        );
        assert_eq!(
            ClientCommand::parse(r#"["IDENTIFY", {"id": "b"}]"#).unwrap(),
            ClientCommand::Identify { user_id: "b".into() }
        );
    }

    #[test]
    fn parses_move_with_optional_parts() {
        let piece = Uuid::new_v4();
        let rook = Uuid::new_v4();
        let text = format!(
            r#"["MOVE", {{"piece_id": "{}", "x": 7, "y": 1, "nested": {{"piece_id": "{}", "x": 6, "y": 1}}}}]"#,
            piece, rook
        );
        let ClientCommand::Move(mv) = ClientCommand::parse(&text).unwrap() else {
            panic!("expected a move");
        };
        assert_eq!(mv.piece_id, piece);
        assert_eq!((mv.x, mv.y), (7, 1));
        assert!(mv.takes.is_none());
        assert_eq!(mv.nested.unwrap().piece_id, rook);
    }

    #[test]
    fn parses_setting() {
        let cmd = ClientCommand::parse(r#"["SETTING", {"total_length": 600, "per_move": 2.5}]"#).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::Setting {
                total_length: 600.0,
                per_move: 2.5
            }
        );
    }

    #[test]
    fn rejects_malformed_envelopes() {
        for text in [
            "not json",
            r#"["CONNECT"]"#,
            r#"["CONNECT", {"id": "a"}, 3]"#,
            r#"{"action": "CONNECT"}"#,
            r#"["RESIGN", {}]"#,
            r#"["CONNECT", {"name": "a"}]"#,
            r#"["MOVE", {"piece_id": "nope", "x": 1, "y": 1}]"#,
        ] {
            let err = ClientCommand::parse(text).unwrap_err();
            assert!(
                matches!(err, GameError::MalformedMessage { .. }),
                "{} gave {:?}",
                text,
                err
            );
        }
    }

    #[test]
    fn encodes_envelope() {
        let timer = ServerMessage::Timer(TimerMessage {
            server_time: 1.0,
            remaining_white: Some(10.0),
            remaining_black: Some(20.0),
            players: Vec::new(),
        });
        let value: Value = serde_json::from_str(&timer.encode().unwrap()).unwrap();
        assert_eq!(value[0], "TIMER");
        assert_eq!(value[1]["remaining_black"], 20.0);
    }
}
