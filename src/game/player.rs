use serde::Serialize;

use crate::game::piece::Color;
use crate::game::ConnectionId;
use crate::models::messages::{PlayerPublicState, PlayerStateMessage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlayerState {
    Connected,
    Disconnected,
    Playing,
}

/// One seat in a session. The user id outlives connections so a player can
/// come back on a new socket and keep their color and clock.
#[derive(Clone, Debug)]
pub struct Player {
    pub user_id: String,
    pub color: Color,
    pub connection: Option<ConnectionId>,
    pub state: PlayerState,
    /// Seconds left on this player's clock.
    pub remaining_time: f64,
}

impl Player {
    pub fn new(user_id: impl Into<String>, color: Color, connection: ConnectionId, remaining_time: f64) -> Self {
        Player {
            user_id: user_id.into(),
            color,
            connection: Some(connection),
            state: PlayerState::Connected,
            remaining_time,
        }
    }

    pub fn is_bound_to(&self, connection: ConnectionId) -> bool {
        self.connection == Some(connection)
    }

    pub fn bind(&mut self, connection: ConnectionId) {
        self.connection = Some(connection);
    }

    pub fn set_connected(&mut self) {
        self.state = PlayerState::Connected;
    }

    pub fn set_disconnected(&mut self) {
        self.state = PlayerState::Disconnected;
        self.connection = None;
    }

    /// Enter play with a full clock.
    pub fn set_playing(&mut self, total_length: f64) {
        self.state = PlayerState::Playing;
        self.remaining_time = total_length;
    }

    pub fn credit(&mut self, seconds: f64) {
        self.remaining_time += seconds;
    }

    pub fn state_message(&self) -> PlayerStateMessage {
        PlayerStateMessage {
            id: self.user_id.clone(),
            color: self.color,
            state: self.state,
            remaining_time: self.remaining_time,
        }
    }

    pub fn public_state(&self) -> PlayerPublicState {
        PlayerPublicState {
            color: self.color,
            state: self.state,
            remaining_time: self.remaining_time,
        }
    }
}
