//! Rotation and translation rules.
//!
//! All functions here are pure: they take a piece and a board and return the
//! resulting piece. A rejected move returns the input piece unchanged.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use super::{
    board::Board,
    piece::{Piece, PieceKind, RotationDirection},
};

/// Offsets tried, in order, when the in-place rotation collides.
///
/// Y grows downward, so `-1` lifts the piece by one row.
pub const KICK_OFFSETS: [(i32, i32); 5] = [(-1, 0), (1, 0), (0, -1), (-1, -1), (1, -1)];

// Corners of the T piece's 3x3 bounding box, relative to its anchor
const SPIN_CORNERS: [(i32, i32); 4] = [(0, 0), (2, 0), (0, 2), (2, 2)];

/// Horizontal and downward movement of the falling piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Down,
}

impl Direction {
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
        }
    }
}

/// A discrete input applied to the falling piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Move(Direction),
    Rotate(RotationDirection),
    /// Swap with the hold slot. Resolved by the game state, not by [`apply`].
    Hold,
    HardDrop,
}

/// Applies an action to a piece against a board.
///
/// [`Action::HardDrop`] returns the resting position without locking, and
/// [`Action::Hold`] returns the piece unchanged.
///
/// # Example
///
/// ```
/// use spinstack_engine::{Action, Board, Direction, Piece, PieceKind, apply};
///
/// let board = Board::EMPTY;
/// let piece = Piece::new(PieceKind::O);
/// let moved = apply(Action::Move(Direction::Left), piece, &board);
/// assert_eq!(moved.position().x(), piece.position().x() - 1);
/// ```
#[must_use]
pub fn apply(action: Action, piece: Piece, board: &Board) -> Piece {
    match action {
        Action::Move(direction) => {
            let (dx, dy) = direction.offset();
            attempt_translate(piece, board, dx, dy)
        }
        Action::Rotate(direction) => attempt_rotate(piece, board, direction),
        Action::Hold => piece,
        Action::HardDrop => drop_to_rest(piece, board),
    }
}

/// Shifts the piece by `(dx, dy)` if every occupied cell stays legal.
#[must_use]
pub fn attempt_translate(piece: Piece, board: &Board, dx: i32, dy: i32) -> Piece {
    let moved = piece.translated(dx, dy);
    if board.is_colliding(&moved) {
        piece
    } else {
        moved
    }
}

/// Rotates the piece, trying the in-place rotation first and then each kick.
///
/// A successful rotation of a T piece into a position with at least three
/// blocked corners is flagged as a special move.
#[must_use]
pub fn attempt_rotate(piece: Piece, board: &Board, direction: RotationDirection) -> Piece {
    rotation_candidates(piece, direction)
        .into_iter()
        .find(|candidate| !board.is_colliding(candidate))
        .map_or(piece, |rotated| {
            rotated.with_special_move(is_spin_position(&rotated, board))
        })
}

/// Returns the rotated piece at its anchor followed by every kicked variant,
/// in the order they are tried.
#[must_use]
pub fn rotation_candidates(piece: Piece, direction: RotationDirection) -> ArrayVec<Piece, 6> {
    let rotated = piece.rotated(direction);
    let mut candidates = ArrayVec::new();
    candidates.push(rotated);
    for (dx, dy) in KICK_OFFSETS {
        candidates.push(rotated.translated(dx, dy));
    }
    candidates
}

/// Checks whether a T piece sits with at least 3 of its 4 box corners blocked.
///
/// Walls and the floor count as blocked; the space above the board does not.
#[must_use]
pub fn is_spin_position(piece: &Piece, board: &Board) -> bool {
    if piece.kind() != PieceKind::T {
        return false;
    }
    let x0 = piece.position().x();
    let y0 = piece.position().y();
    let blocked = SPIN_CORNERS
        .iter()
        .filter(|(dx, dy)| board.is_blocked(x0 + dx, y0 + dy))
        .count();
    blocked >= 3
}

/// Returns whether the piece cannot move one row down.
#[must_use]
pub fn is_resting(piece: &Piece, board: &Board) -> bool {
    board.is_colliding(&piece.translated(0, 1))
}

/// Moves the piece down one row at a time until it rests.
///
/// Keeps the special-move flag when the piece is already resting.
#[must_use]
pub fn drop_to_rest(piece: Piece, board: &Board) -> Piece {
    piece.simulate_drop_position(board)
}
