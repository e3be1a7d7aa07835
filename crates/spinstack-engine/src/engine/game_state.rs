use rand::Rng;

use crate::{
    GameOverError, HoldError, PieceCollisionError,
    core::{
        board::Board,
        movement::{self, Direction},
        piece::{Piece, PieceKind, RotationDirection},
    },
};

use super::{
    piece_buffer::{PieceBuffer, PieceSeed},
    scoring::{LockResult, ScoreKeeper},
};

/// Rules state of one board: the locked cells, the falling piece, the piece
/// queue with its hold slot, and the score.
///
/// Mutations follow the game rules: a rejected move leaves the state as it was
/// and reports an error.
///
/// # Example
///
/// ```
/// use spinstack_engine::{Direction, GameState};
///
/// let mut state = GameState::new();
/// state.move_piece(Direction::Left).ok();
/// state.rotate_piece().ok();
///
/// let (lock, result) = state.hard_drop();
/// assert_eq!(lock.rows_cleared, 0);
/// assert!(result.is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct GameState {
    board: Board,
    falling_piece: Piece,
    hold_used: bool,
    piece_buffer: PieceBuffer,
    scores: ScoreKeeper,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    #[must_use]
    pub fn new() -> Self {
        Self::from_buffer(Board::EMPTY, PieceBuffer::new())
    }

    #[must_use]
    pub fn with_seed(seed: PieceSeed) -> Self {
        Self::from_buffer(Board::EMPTY, PieceBuffer::with_seed(seed))
    }

    /// Starts from an existing board, e.g. a prepared puzzle.
    #[must_use]
    pub fn with_board(board: Board, seed: PieceSeed) -> Self {
        Self::from_buffer(board, PieceBuffer::with_seed(seed))
    }

    fn from_buffer(board: Board, mut piece_buffer: PieceBuffer) -> Self {
        let falling_piece = Piece::new(piece_buffer.pop_next());
        Self {
            board,
            falling_piece,
            hold_used: false,
            piece_buffer,
            scores: ScoreKeeper::new(),
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn falling_piece(&self) -> Piece {
        self.falling_piece
    }

    /// Replaces the falling piece if it fits on the board.
    pub fn set_falling_piece(&mut self, piece: Piece) -> Result<(), PieceCollisionError> {
        if self.board.is_colliding(&piece) {
            return Err(PieceCollisionError);
        }
        self.falling_piece = piece;
        Ok(())
    }

    #[must_use]
    pub fn held_piece(&self) -> Option<PieceKind> {
        self.piece_buffer.held_piece()
    }

    pub fn next_pieces(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.piece_buffer.next_pieces()
    }

    /// Returns whether hold has not been used since the last lock.
    #[must_use]
    pub fn is_hold_available(&self) -> bool {
        !self.hold_used
    }

    #[must_use]
    pub fn scores(&self) -> &ScoreKeeper {
        &self.scores
    }

    /// Returns where the falling piece would land on a hard drop.
    #[must_use]
    pub fn ghost_piece(&self) -> Piece {
        movement::drop_to_rest(self.falling_piece, &self.board)
    }

    pub fn move_piece(&mut self, direction: Direction) -> Result<(), PieceCollisionError> {
        let (dx, dy) = direction.offset();
        let moved = movement::attempt_translate(self.falling_piece, &self.board, dx, dy);
        self.replace_if_changed(moved)
    }

    /// Rotates the falling piece clockwise.
    pub fn rotate_piece(&mut self) -> Result<(), PieceCollisionError> {
        self.rotate(RotationDirection::Clockwise)
    }

    /// Rotates the falling piece counterclockwise.
    pub fn rotate_piece_left(&mut self) -> Result<(), PieceCollisionError> {
        self.rotate(RotationDirection::CounterClockwise)
    }

    fn rotate(&mut self, direction: RotationDirection) -> Result<(), PieceCollisionError> {
        let rotated = movement::attempt_rotate(self.falling_piece, &self.board, direction);
        self.replace_if_changed(rotated)
    }

    fn replace_if_changed(&mut self, piece: Piece) -> Result<(), PieceCollisionError> {
        if piece == self.falling_piece {
            return Err(PieceCollisionError);
        }
        self.falling_piece = piece;
        Ok(())
    }

    pub fn soft_drop(&mut self) -> Result<(), PieceCollisionError> {
        self.move_piece(Direction::Down)
    }

    /// Drops the falling piece to rest and locks it.
    pub fn hard_drop(&mut self) -> (LockResult, Result<(), GameOverError>) {
        self.falling_piece = self.ghost_piece();
        self.lock_piece()
    }

    /// Swaps the falling piece with the hold slot (or the next piece when the
    /// slot is empty). Allowed once per piece.
    pub fn hold_piece(&mut self) -> Result<(), HoldError> {
        if self.hold_used {
            return Err(HoldError::HoldAlreadyUsed);
        }
        let incoming = Piece::new(self.piece_buffer.peek_hold_result());
        if self.board.is_colliding(&incoming) {
            return Err(HoldError::PieceCollision(PieceCollisionError));
        }
        let kind = self.piece_buffer.hold(self.falling_piece.kind());
        self.falling_piece = Piece::new(kind);
        self.hold_used = true;
        Ok(())
    }

    /// Locks the falling piece where it is, clears full rows and spawns the
    /// next piece.
    ///
    /// The returned error tells why the game ended, if it did.
    pub fn lock_piece(&mut self) -> (LockResult, Result<(), GameOverError>) {
        let piece = self.falling_piece;
        let locked_above_board = piece.occupied_positions().any(|(_, y)| y < 0);

        self.board.fill_piece(&piece);
        let rows_cleared = self.board.clear_lines();
        let lock = self.scores.record_lock(rows_cleared, piece.is_special_move());

        self.hold_used = false;
        self.falling_piece = Piece::new(self.piece_buffer.pop_next());

        let result = if locked_above_board {
            Err(GameOverError::LockedAboveBoard)
        } else if self.board.is_top_row_occupied() {
            Err(GameOverError::TopRowOccupied)
        } else if self.board.is_colliding(&self.falling_piece) {
            Err(GameOverError::SpawnCollision)
        } else {
            Ok(())
        };
        (lock, result)
    }

    /// Pushes `count` garbage rows in from the bottom, each with one random
    /// empty column.
    ///
    /// The falling piece is lifted if the new rows push into it.
    pub fn inject_garbage<R>(&mut self, count: usize, rng: &mut R) -> Result<(), GameOverError>
    where
        R: Rng + ?Sized,
    {
        let holes: Vec<usize> = (0..count)
            .map(|_| rng.random_range(0..Board::WIDTH))
            .collect();
        let overflowed = self.board.inject_garbage(holes);

        for _ in 0..count {
            if !self.board.is_colliding(&self.falling_piece) {
                break;
            }
            self.falling_piece = self.falling_piece.translated(0, -1);
        }

        if overflowed {
            return Err(GameOverError::GarbageOverflow);
        }
        Ok(())
    }
}
