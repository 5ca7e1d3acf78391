use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type PieceId = Uuid;

/// Side of the board, also used as the seat a player occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    #[serde(rename = "W")]
    White,
    #[serde(rename = "B")]
    Black,
}

impl Color {
    /// Rank direction pawns of this color advance in.
    pub fn direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }
}

impl std::ops::Not for Color {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceType {
    #[serde(rename = "P")]
    Pawn,
    #[serde(rename = "R")]
    Rook,
    #[serde(rename = "N")]
    Knight,
    #[serde(rename = "B")]
    Bishop,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
}

/// A board coordinate. Files and ranks both run from 1 to 8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub x: i8,
    pub y: i8,
}

impl Square {
    pub const MIN: i8 = 1;
    pub const MAX: i8 = 8;

    pub fn new(x: i8, y: i8) -> Option<Self> {
        let square = Square { x, y };
        square.is_on_board().then_some(square)
    }

    pub fn is_on_board(&self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self.x) && (Self::MIN..=Self::MAX).contains(&self.y)
    }

    /// The square `(dx, dy)` away, if it is still on the board.
    pub fn offset(&self, dx: i8, dy: i8) -> Option<Self> {
        Square::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Piece {
    pub id: PieceId,
    #[serde(rename = "type")]
    pub kind: PieceType,
    pub color: Color,
    #[serde(flatten)]
    pub square: Square,
    pub move_count: u32,
}

impl Piece {
    pub fn new(kind: PieceType, color: Color, square: Square) -> Self {
        Piece {
            id: Uuid::new_v4(),
            kind,
            color,
            square,
            move_count: 0,
        }
    }

    pub fn has_moved(&self) -> bool {
        self.move_count > 0
    }

    pub fn is_enemy(&self, other: &Piece) -> bool {
        self.color != other.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squares_outside_the_board_are_rejected() {
        assert!(Square::new(1, 1).is_some());
        assert!(Square::new(8, 8).is_some());
        assert!(Square::new(0, 4).is_none());
        assert!(Square::new(4, 9).is_none());
        let corner = Square { x: 8, y: 1 };
        assert_eq!(corner.offset(-1, 1), Some(Square { x: 7, y: 2 }));
        assert_eq!(corner.offset(1, 0), None);
    }

    #[test]
    fn piece_serializes_with_flat_coordinates() {
        let piece = Piece::new(PieceType::Knight, Color::Black, Square { x: 2, y: 8 });
        let value = serde_json::to_value(&piece).unwrap();
        assert_eq!(value["type"], "N");
        assert_eq!(value["color"], "B");
        assert_eq!(value["x"], 2);
        assert_eq!(value["y"], 8);
        assert_eq!(value["move_count"], 0);
        assert_eq!(value["id"], piece.id.to_string());
    }

    #[test]
    fn colors_flip() {
        assert_eq!(!Color::White, Color::Black);
        assert_eq!(!Color::Black, Color::White);
        assert_eq!(Color::White.direction(), 1);
        assert_eq!(Color::Black.direction(), -1);
    }
}
