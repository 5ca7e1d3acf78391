//! Candidate move generation per piece type.
//!
//! Moves are pseudo-legal: nothing here looks for check, pins or stalemate.

use crate::game::board::Board;
use crate::game::moves::Move;
use crate::game::piece::{Color, Piece, PieceType, Square};

pub const DIAGONAL_OFFSETS: [(i8, i8); 4] = [(1, -1), (-1, 1), (1, 1), (-1, -1)];
pub const STRAIGHT_OFFSETS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
pub const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (-1, 2),
    (2, 1),
    (-2, 1),
    (1, -2),
    (-1, -2),
    (2, -1),
    (-2, -1),
];

/// Every candidate move for `piece` on `board`.
pub fn possible_moves(piece: &Piece, board: &Board) -> Vec<Move> {
    match piece.kind {
        PieceType::Pawn => pawn_moves(piece, board),
        PieceType::Rook => generate_offset_moves(piece, board, &STRAIGHT_OFFSETS, true),
        PieceType::Bishop => generate_offset_moves(piece, board, &DIAGONAL_OFFSETS, true),
        PieceType::Knight => generate_offset_moves(piece, board, &KNIGHT_OFFSETS, false),
        PieceType::Queen => {
            let mut moves = generate_offset_moves(piece, board, &DIAGONAL_OFFSETS, true);
            moves.extend(generate_offset_moves(piece, board, &STRAIGHT_OFFSETS, true));
            moves
        }
        PieceType::King => king_moves(piece, board),
    }
}

/// Walk each offset from the piece's square.
///
/// Non-repeating pieces take a single step. Repeating pieces slide until
/// the edge or the first occupied square; an enemy there is captured, a
/// friend blocks.
pub fn generate_offset_moves(
    piece: &Piece,
    board: &Board,
    offsets: &[(i8, i8)],
    repeat: bool,
) -> Vec<Move> {
    let mut moves = Vec::new();
    for &(dx, dy) in offsets {
        let mut current = piece.square;
        while let Some(next) = current.offset(dx, dy) {
            match board.piece_at(next) {
                Some(other) => {
                    if piece.is_enemy(other) {
                        moves.push(Move::capture(piece.id, next, other.id));
                    }
                    break;
                }
                None => moves.push(Move::new(piece.id, next)),
            }
            if !repeat {
                break;
            }
            current = next;
        }
    }
    moves
}

fn en_passant_rank(color: Color) -> i8 {
    match color {
        Color::White => 5,
        Color::Black => 4,
    }
}

fn pawn_moves(pawn: &Piece, board: &Board) -> Vec<Move> {
    let dir = pawn.color.direction();
    let mut moves = Vec::new();

    if let Some(one) = pawn.square.offset(0, dir) {
        if !board.is_occupied(one) {
            moves.push(Move::new(pawn.id, one));

            if !pawn.has_moved() {
                if let Some(two) = pawn.square.offset(0, 2 * dir) {
                    if !board.is_occupied(two) {
                        moves.push(Move::new(pawn.id, two));
                    }
                }
            }
        }
    }

    for side in [1, -1] {
        let Some(target) = pawn.square.offset(side, dir) else {
            continue;
        };

        if let Some(victim) = board.piece_at(target) {
            if pawn.is_enemy(victim) {
                moves.push(Move::capture(pawn.id, target, victim.id));
            }
        }

        if pawn.square.y != en_passant_rank(pawn.color) || board.is_occupied(target) {
            continue;
        }
        let beside = pawn.square.offset(side, 0);
        if let Some(victim) = beside.and_then(|square| board.piece_at(square)) {
            if victim.kind == PieceType::Pawn && victim.move_count == 1 && pawn.is_enemy(victim) {
                moves.push(Move::capture(pawn.id, target, victim.id));
            }
        }
    }

    moves
}

fn king_moves(king: &Piece, board: &Board) -> Vec<Move> {
    let mut moves = generate_offset_moves(king, board, &DIAGONAL_OFFSETS, false);
    moves.extend(generate_offset_moves(king, board, &STRAIGHT_OFFSETS, false));

    if king.has_moved() {
        return moves;
    }

    let rank = king.square.y;
    // (rook file, files that must be empty, king file, rook file after)
    let sides: [(i8, &[i8], i8, i8); 2] = [(8, &[6, 7], 7, 6), (1, &[2, 3, 4], 3, 4)];

    for (rook_file, between, king_to, rook_to) in sides {
        let Some(rook) = board.piece_at(Square { x: rook_file, y: rank }) else {
            continue;
        };
        if rook.kind != PieceType::Rook || rook.color != king.color || rook.has_moved() {
            continue;
        }
        if between
            .iter()
            .any(|&file| board.is_occupied(Square { x: file, y: rank }))
        {
            continue;
        }
        moves.push(
            Move::new(king.id, Square { x: king_to, y: rank })
                .with_nested(Move::new(rook.id, Square { x: rook_to, y: rank })),
        );
    }

    moves
}
