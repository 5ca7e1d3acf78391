use crate::error::{GameError, Result};
use crate::game::board::Board;
use crate::game::piece::{PieceId, Square};

/// A piece relocation, optionally capturing and optionally dragging a second
/// piece along (the rook when castling).
///
/// Equality compares piece, capture and destination only; the nested move is
/// not part of a move's identity.
#[derive(Clone, Debug)]
pub struct Move {
    pub piece: PieceId,
    pub to: Square,
    pub takes: Option<PieceId>,
    pub nested: Option<Box<Move>>,
}

impl PartialEq for Move {
    fn eq(&self, other: &Self) -> bool {
        self.piece == other.piece && self.takes == other.takes && self.to == other.to
    }
}

impl Eq for Move {}

impl Move {
    pub fn new(piece: PieceId, to: Square) -> Self {
        Move {
            piece,
            to,
            takes: None,
            nested: None,
        }
    }

    pub fn capture(piece: PieceId, to: Square, takes: PieceId) -> Self {
        Move {
            takes: Some(takes),
            ..Move::new(piece, to)
        }
    }

    pub fn with_nested(mut self, nested: Move) -> Self {
        self.nested = Some(Box::new(nested));
        self
    }

    /// Apply the move to `board`.
    ///
    /// Legality is the caller's business: this only checks that every piece
    /// it names is on the board, that no piece is named twice, and that each
    /// destination is on the board and not held by a piece that stays. Those
    /// checks run before anything changes, so a failed call leaves the board
    /// untouched.
    pub fn perform(&self, board: &mut Board) -> Result<()> {
        let mover = board
            .piece(self.piece)
            .ok_or(GameError::UnknownPiece { piece_id: self.piece })?;
        let from = mover.square;

        let destinations = std::iter::once(self.to)
            .chain(self.nested.as_ref().map(|nested| nested.to));
        for square in destinations {
            if !square.is_on_board() {
                return Err(GameError::OffBoard {
                    x: square.x,
                    y: square.y,
                });
            }
        }
        if self.takes == Some(self.piece) {
            return Err(GameError::PieceReused { piece_id: self.piece });
        }
        if let Some(nested) = &self.nested {
            if nested.piece == self.piece || Some(nested.piece) == self.takes {
                return Err(GameError::PieceReused {
                    piece_id: nested.piece,
                });
            }
        }

        let captured_square = match self.takes {
            Some(id) => Some(
                board
                    .piece(id)
                    .ok_or(GameError::UnknownCapture { piece_id: id })?
                    .square,
            ),
            None => None,
        };

        let vacated = |square: Square| square == from || Some(square) == captured_square;
        if let Some(occupant) = board.piece_at(self.to) {
            if occupant.id != self.piece && !vacated(self.to) {
                return Err(GameError::SquareOccupied {
                    x: self.to.x,
                    y: self.to.y,
                });
            }
        }

        if let Some(nested) = &self.nested {
            if board.piece(nested.piece).is_none() {
                return Err(GameError::UnknownPiece {
                    piece_id: nested.piece,
                });
            }
            if nested.to == self.to {
                return Err(GameError::SquareOccupied {
                    x: nested.to.x,
                    y: nested.to.y,
                });
            }
            if let Some(occupant) = board.piece_at(nested.to) {
                if occupant.id != nested.piece && !vacated(nested.to) {
                    return Err(GameError::SquareOccupied {
                        x: nested.to.x,
                        y: nested.to.y,
                    });
                }
            }
        }

        if let Some(square) = captured_square {
            board.remove_at(square);
        }
        board.relocate(self.piece, self.to)?;
        if let Some(nested) = &self.nested {
            board.relocate(nested.piece, nested.to)?;
        }
        Ok(())
    }
}
