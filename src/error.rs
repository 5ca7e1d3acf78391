use uuid::Uuid;

/// Errors raised while handling commands for a game session.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("unknown piece {piece_id}")]
    UnknownPiece { piece_id: Uuid },

    #[error("unknown capture target {piece_id}")]
    UnknownCapture { piece_id: Uuid },

    #[error("piece {piece_id} is used twice in one move")]
    PieceReused { piece_id: Uuid },

    #[error("square ({x}, {y}) is off the board")]
    OffBoard { x: i8, y: i8 },

    #[error("square ({x}, {y}) is already occupied")]
    SquareOccupied { x: i8, y: i8 },

    #[error("malformed message: {reason}")]
    MalformedMessage {
        reason: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("no session for key {key}")]
    SessionNotFound { key: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to encode message")]
    Encode(#[from] serde_json::Error),
}

impl GameError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        GameError::MalformedMessage {
            reason: reason.into(),
            source: None,
        }
    }
}

pub type Result<T, E = GameError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let id = Uuid::nil();
        let err = GameError::UnknownPiece { piece_id: id };
        assert_eq!(
            err.to_string(),
            "unknown piece 00000000-0000-0000-0000-000000000000"
        );

        let err = GameError::SquareOccupied { x: 5, y: 4 };
        assert_eq!(err.to_string(), "square (5, 4) is already occupied");

        let err = GameError::malformed("expected two elements");
        assert_eq!(err.to_string(), "malformed message: expected two elements");
    }

    #[test]
    fn malformed_message_keeps_json_source() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = GameError::MalformedMessage {
            reason: "bad payload".into(),
            source: Some(json_err),
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
