use serde::Serialize;
use std::collections::HashMap;

use crate::error::{GameError, Result};
use crate::game::piece::{Color, Piece, PieceId, PieceType, Square};

const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

/// The live pieces of a game plus an index from square to occupant.
///
/// Captured pieces are removed outright. The index is kept in step with
/// every placement, removal and relocation so at most one piece ever maps
/// to a square.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Board {
    pieces: Vec<Piece>,
    #[serde(skip)]
    by_square: HashMap<Square, PieceId>,
}

impl Board {
    pub fn empty() -> Self {
        Board::default()
    }

    /// The standard 32-piece starting position.
    pub fn standard() -> Self {
        let mut board = Board::empty();
        for (color, back, front) in [(Color::Black, 8, 7), (Color::White, 1, 2)] {
            for (file, kind) in (1..=8).zip(BACK_RANK) {
                board.insert(Piece::new(kind, color, Square { x: file, y: back }));
            }
            for file in 1..=8 {
                board.insert(Piece::new(PieceType::Pawn, color, Square { x: file, y: front }));
            }
        }
        board
    }

    fn insert(&mut self, piece: Piece) -> PieceId {
        let id = piece.id;
        self.by_square.insert(piece.square, id);
        self.pieces.push(piece);
        id
    }

    /// Put a new, unmoved piece on an empty square.
    pub fn place(&mut self, kind: PieceType, color: Color, square: Square) -> Result<PieceId> {
        if !square.is_on_board() {
            return Err(GameError::OffBoard {
                x: square.x,
                y: square.y,
            });
        }
        if self.by_square.contains_key(&square) {
            return Err(GameError::SquareOccupied {
                x: square.x,
                y: square.y,
            });
        }
        Ok(self.insert(Piece::new(kind, color, square)))
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.iter().find(|piece| piece.id == id)
    }

    fn piece_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.pieces.iter_mut().find(|piece| piece.id == id)
    }

    pub fn piece_at(&self, square: Square) -> Option<&Piece> {
        self.by_square.get(&square).and_then(|id| self.piece(*id))
    }

    pub fn is_occupied(&self, square: Square) -> bool {
        self.by_square.contains_key(&square)
    }

    /// Take whatever stands on `square` off the board.
    pub fn remove_at(&mut self, square: Square) -> Option<Piece> {
        let id = self.by_square.remove(&square)?;
        let index = self.pieces.iter().position(|piece| piece.id == id)?;
        Some(self.pieces.remove(index))
    }

    /// Move a piece to `to` and count the move. The destination must be empty.
    pub fn relocate(&mut self, id: PieceId, to: Square) -> Result<()> {
        if !to.is_on_board() {
            return Err(GameError::OffBoard { x: to.x, y: to.y });
        }
        if let Some(occupant) = self.by_square.get(&to) {
            if *occupant != id {
                return Err(GameError::SquareOccupied { x: to.x, y: to.y });
            }
        }
        let piece = self
            .piece_mut(id)
            .ok_or(GameError::UnknownPiece { piece_id: id })?;
        let from = piece.square;
        piece.square = to;
        piece.move_count += 1;
        self.by_square.remove(&from);
        self.by_square.insert(to, id);
        Ok(())
    }
}
