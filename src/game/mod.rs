pub mod board;
pub mod clock;
pub mod movegen;
pub mod moves;
pub mod piece;
pub mod player;
pub mod registry;
pub mod session;

/// Identifies one websocket connection for as long as it stays open.
pub type ConnectionId = uuid::Uuid;
