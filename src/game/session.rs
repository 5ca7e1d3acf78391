use futures::future::AbortHandle;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::{GameError, Result};
use crate::game::board::Board;
use crate::game::movegen::possible_moves;
use crate::game::moves::Move;
use crate::game::piece::{Color, Square};
use crate::game::player::{Player, PlayerState};
use crate::game::ConnectionId;
use crate::models::messages::{
    ClientCommand, GameStateMessage, Outbound, PlayerPublicState, ReceivedMove, ServerMessage,
    TimerMessage,
};

pub type SharedSession = Arc<Mutex<GameSession>>;

/// Lock a shared session, recovering the data if a previous holder panicked.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, GameSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameStatus {
    Waiting,
    Playing,
    Ended,
}

/// Time control, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionSettings {
    pub total_length: f64,
    pub per_move: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            total_length: 360.0,
            per_move: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    /// The first move was just played; the caller owns starting the clock task.
    StartClock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveEffect {
    /// The connection does not belong to a player.
    Ignored,
    Rejected,
    Applied { starts_clock: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockStatus {
    Running,
    Expired,
    Stopped,
}

fn server_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}

/// One game: the board, its two seats, whose turn it is, and the queue of
/// messages waiting to go out to the connected clients.
pub struct GameSession {
    id: Uuid,
    state: GameStatus,
    board: Board,
    players: HashMap<String, Player>,
    free_colors: Vec<Color>,
    on_move: Option<Color>,
    settings: SessionSettings,
    winner: Option<Color>,
    outbound: Vec<Outbound>,
    clock_started: bool,
    clock: Option<AbortHandle>,
}

impl GameSession {
    pub fn new(settings: SessionSettings) -> Self {
        let mut free_colors = vec![Color::White, Color::Black];
        free_colors.shuffle(&mut rand::rng());
        let id = Uuid::new_v4();
        info!("init new game {}", id);

        GameSession {
            id,
            state: GameStatus::Waiting,
            board: Board::standard(),
            players: HashMap::new(),
            free_colors,
            on_move: None,
            settings,
            winner: None,
            outbound: Vec::new(),
            clock_started: false,
            clock: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> GameStatus {
        self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn on_move(&self) -> Option<Color> {
        self.on_move
    }

    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn player(&self, user_id: &str) -> Option<&Player> {
        self.players.get(user_id)
    }

    pub fn player_by_connection(&self, connection: ConnectionId) -> Option<&Player> {
        self.players
            .values()
            .find(|player| player.is_bound_to(connection))
    }

    pub fn player_by_color(&self, color: Color) -> Option<&Player> {
        self.players.values().find(|player| player.color == color)
    }

    /// Players with White first.
    fn seated_players(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|player| player.color == Color::Black);
        players
    }

    /// Connections a broadcast should reach right now.
    pub fn bound_connections(&self) -> Vec<ConnectionId> {
        self.seated_players()
            .into_iter()
            .filter_map(|player| player.connection)
            .collect()
    }

    /// Take every queued message, leaving the queue empty.
    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbound)
    }

    pub fn handle(&mut self, connection: ConnectionId, command: ClientCommand) -> Result<CommandOutcome> {
        match command {
            ClientCommand::Identify { user_id } => self.identify(connection, &user_id),
            ClientCommand::Connect { user_id } => self.connect(connection, &user_id),
            ClientCommand::Setting {
                total_length,
                per_move,
            } => {
                self.set_mode(total_length, per_move);
            }
            ClientCommand::Move(received) => {
                if self.player_by_connection(connection).is_none() {
                    debug!("ignoring move from unbound connection {}", connection);
                    return Ok(CommandOutcome::Done);
                }
                let mv = self.resolve_move(&received)?;
                if let MoveEffect::Applied { starts_clock: true } = self.move_piece(connection, mv) {
                    return Ok(CommandOutcome::StartClock);
                }
            }
        }
        Ok(CommandOutcome::Done)
    }

    pub fn connect(&mut self, connection: ConnectionId, user_id: &str) {
        if self.players.contains_key(user_id) {
            info!("player {} connected again on {}", user_id, connection);
            self.rebind(connection, user_id);
        } else if let Some(color) = self.free_colors.pop() {
            info!("connect player {} on {} as {}", user_id, connection, color);
            let player = Player::new(user_id, color, connection, self.settings.total_length);
            self.players.insert(user_id.to_string(), player);

            if self.can_start() {
                self.start_game();
            } else {
                if let Some(player) = self.players.get_mut(user_id) {
                    player.set_connected();
                }
                self.send_player_state(user_id);
            }
        } else {
            info!("game {} is full, {} only watches", self.id, user_id);
            self.send_state(Some(connection));
        }

        self.send_state(None);
    }

    pub fn identify(&mut self, connection: ConnectionId, user_id: &str) {
        if self.players.contains_key(user_id) {
            info!("player {} identified on {}", user_id, connection);
            self.rebind(connection, user_id);
            self.send_state(None);
        } else if !self.free_colors.is_empty() {
            self.connect(connection, user_id);
        } else {
            debug!("unknown player {} identified on a full game", user_id);
            self.send_state(Some(connection));
        }
    }

    fn rebind(&mut self, connection: ConnectionId, user_id: &str) {
        let game_state = self.state;
        if let Some(player) = self.players.get_mut(user_id) {
            player.bind(connection);
            if player.state == PlayerState::Disconnected {
                match game_state {
                    GameStatus::Playing => player.state = PlayerState::Playing,
                    GameStatus::Waiting | GameStatus::Ended => player.set_connected(),
                }
            }
        }

        if self.can_start() {
            self.start_game();
        } else {
            self.send_player_state(user_id);
        }
    }

    pub fn disconnect(&mut self, connection: ConnectionId) {
        let Some(player) = self
            .players
            .values_mut()
            .find(|player| player.is_bound_to(connection))
        else {
            debug!("connection {} had no player in game {}", connection, self.id);
            return;
        };

        info!("player {} disconnected from game {}", player.user_id, self.id);
        player.set_disconnected();
        self.send_state(None);
    }

    /// Change the time control. Only possible while waiting for players.
    pub fn set_mode(&mut self, total_length: f64, per_move: f64) -> bool {
        if self.state != GameStatus::Waiting {
            warn!("game {} already started, ignoring time control change", self.id);
            return false;
        }
        if !(total_length.is_finite() && total_length > 0.0 && per_move.is_finite() && per_move >= 0.0) {
            warn!("rejecting time control {} + {}", total_length, per_move);
            return false;
        }

        info!("game {} time control set to {} + {}", self.id, total_length, per_move);
        self.settings = SessionSettings {
            total_length,
            per_move,
        };
        for player in self.players.values_mut() {
            player.remaining_time = total_length;
        }
        self.send_state(None);
        true
    }

    /// Both seats taken and nobody has dropped off.
    pub fn can_start(&self) -> bool {
        self.state == GameStatus::Waiting
            && self.players.len() == 2
            && self
                .players
                .values()
                .all(|player| player.state != PlayerState::Disconnected)
    }

    fn start_game(&mut self) {
        info!("game {} starts", self.id);
        self.on_move = Some(Color::White);
        self.state = GameStatus::Playing;

        let total_length = self.settings.total_length;
        let mut user_ids: Vec<String> = Vec::with_capacity(self.players.len());
        for player in self.players.values_mut() {
            player.set_playing(total_length);
            user_ids.push(player.user_id.clone());
        }
        for user_id in user_ids {
            self.send_player_state(&user_id);
        }
    }

    /// Turn the wire form of a move into a `Move` against this board.
    pub fn resolve_move(&self, received: &ReceivedMove) -> Result<Move> {
        let square = |x: i8, y: i8| {
            Square::new(x, y)
                .ok_or_else(|| GameError::malformed(format!("square ({}, {}) is off the board", x, y)))
        };

        if self.board.piece(received.piece_id).is_none() {
            warn!("move names unknown piece {}", received.piece_id);
            return Err(GameError::UnknownPiece {
                piece_id: received.piece_id,
            });
        }
        if let Some(takes) = received.takes {
            if self.board.piece(takes).is_none() {
                warn!("move captures unknown piece {}", takes);
                return Err(GameError::UnknownCapture { piece_id: takes });
            }
        }

        let mut mv = Move {
            piece: received.piece_id,
            to: square(received.x, received.y)?,
            takes: received.takes,
            nested: None,
        };
        if let Some(nested) = &received.nested {
            if self.board.piece(nested.piece_id).is_none() {
                warn!("nested move names unknown piece {}", nested.piece_id);
                return Err(GameError::UnknownPiece {
                    piece_id: nested.piece_id,
                });
            }
            mv = mv.with_nested(Move::new(nested.piece_id, square(nested.x, nested.y)?));
        }
        Ok(mv)
    }

    /// Play a move for the player bound to `connection`.
    ///
    /// Moves from unknown connections change nothing at all. Anything else
    /// ends with a state broadcast, whether or not the move was accepted.
    pub fn move_piece(&mut self, connection: ConnectionId, mv: Move) -> MoveEffect {
        let Some(color) = self.player_by_connection(connection).map(|player| player.color) else {
            debug!("ignoring move from unbound connection {}", connection);
            return MoveEffect::Ignored;
        };

        let effect = self.apply_move(color, &mv);
        self.send_state(None);
        effect
    }

    fn apply_move(&mut self, color: Color, mv: &Move) -> MoveEffect {
        if self.state != GameStatus::Playing {
            debug!("game {} is not being played, move refused", self.id);
            return MoveEffect::Rejected;
        }
        if self.on_move != Some(color) {
            debug!("{} moved out of turn", color);
            return MoveEffect::Rejected;
        }
        let Some(piece) = self.board.piece(mv.piece) else {
            return MoveEffect::Rejected;
        };
        if piece.color != color {
            debug!("{} tried to move an opposing piece", color);
            return MoveEffect::Rejected;
        }

        // the generated candidate carries the authoritative nested move
        let Some(candidate) = possible_moves(piece, &self.board)
            .into_iter()
            .find(|candidate| candidate == mv)
        else {
            debug!("{} is not a possible move for {:?}", mv.to, piece.kind);
            return MoveEffect::Rejected;
        };

        if let Err(e) = candidate.perform(&mut self.board) {
            warn!("move failed on game {}: {}", self.id, e);
            return MoveEffect::Rejected;
        }
        info!("{} moved {} to {}", color, mv.piece, mv.to);

        let starts_clock = !self.clock_started;
        self.clock_started = true;
        if !starts_clock {
            let bonus = self.settings.per_move;
            if let Some(player) = self.players.values_mut().find(|player| player.color == color) {
                player.credit(bonus);
            }
        }
        self.on_move = Some(!color);

        MoveEffect::Applied { starts_clock }
    }

    /// Store the handle of the running clock task. Refused when a clock is
    /// already attached or the game is not being played.
    pub fn attach_clock(&mut self, handle: AbortHandle) -> bool {
        if self.clock.is_some() || self.state != GameStatus::Playing {
            return false;
        }
        self.clock = Some(handle);
        true
    }

    fn stop_clock(&mut self) {
        if let Some(handle) = self.clock.take() {
            handle.abort();
        }
    }

    /// Charge `interval` seconds to the player on move.
    pub fn tick(&mut self, interval: f64) -> ClockStatus {
        if self.state != GameStatus::Playing {
            return ClockStatus::Stopped;
        }
        let Some(color) = self.on_move else {
            return ClockStatus::Stopped;
        };
        let Some(player) = self.players.values_mut().find(|player| player.color == color) else {
            return ClockStatus::Stopped;
        };

        player.remaining_time -= interval;
        if player.remaining_time <= 0.0 {
            info!("{} ran out of time in game {}", color, self.id);
            self.end_game(!color);
            return ClockStatus::Expired;
        }

        self.send_timer();
        ClockStatus::Running
    }

    fn end_game(&mut self, winner: Color) {
        self.state = GameStatus::Ended;
        self.winner = Some(winner);
        self.stop_clock();
        info!("game {} ended, {} wins", self.id, winner);
        self.send_state(None);
    }

    fn public_states(&self) -> Vec<PlayerPublicState> {
        self.seated_players()
            .into_iter()
            .map(Player::public_state)
            .collect()
    }

    pub fn game_state_message(&self) -> GameStateMessage<'_> {
        GameStateMessage {
            id: self.id,
            state: self.state,
            board: &self.board,
            on_move: self.on_move,
            winner: self.winner,
            server_time: server_time(),
            players: self.public_states(),
        }
    }

    fn enqueue(&mut self, recipient: Option<ConnectionId>, encoded: Result<String>) {
        match encoded {
            Ok(payload) => self.outbound.push(Outbound { recipient, payload }),
            Err(e) => warn!("Error serializing message: {}", e),
        }
    }

    pub fn send_state(&mut self, recipient: Option<ConnectionId>) {
        let encoded = ServerMessage::GameState(self.game_state_message()).encode();
        self.enqueue(recipient, encoded);
    }

    fn send_player_state(&mut self, user_id: &str) {
        let Some(player) = self.players.get(user_id) else {
            return;
        };
        let Some(connection) = player.connection else {
            return;
        };
        let encoded = ServerMessage::PlayerState(player.state_message()).encode();
        self.enqueue(Some(connection), encoded);
    }

    /// Queue a TIMER broadcast. Skipped while no seat has a connection, since
    /// nothing would drain it until someone comes back.
    fn send_timer(&mut self) {
        if self.bound_connections().is_empty() {
            return;
        }
        let remaining = |color| self.player_by_color(color).map(|player| player.remaining_time);
        let timer = TimerMessage {
            server_time: server_time(),
            remaining_white: remaining(Color::White),
            remaining_black: remaining(Color::Black),
            players: self.public_states(),
        };
        let encoded = ServerMessage::Timer(timer).encode();
        self.enqueue(None, encoded);
    }

    #[cfg(test)]
    pub(crate) fn replace_board(&mut self, board: Board) {
        self.board = board;
    }
}
