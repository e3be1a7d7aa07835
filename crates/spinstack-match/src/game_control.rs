//! The narrow interface between the AI and a game.

use arrayvec::ArrayVec;
use rand::Rng;
use spinstack_engine::{
    Action, ActionError, Board, Direction, GameSession, LockResult, Piece, PieceKind,
    RotationDirection,
};
use spinstack_evaluator::{NEXT_PREVIEW, PlannerSnapshot};

/// Everything the orchestrator reads from a game before acting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub active: Piece,
    pub next: ArrayVec<PieceKind, NEXT_PREVIEW>,
    pub hold: Option<PieceKind>,
    pub hold_available: bool,
    pub board: Board,
    pub paused: bool,
    pub game_over: bool,
    pub total_cleared_lines: usize,
    /// Locks by rows cleared, see [`spinstack_engine::ScoreKeeper::line_cleared_counter`].
    pub clear_histogram: [usize; 5],
}

impl GameSnapshot {
    #[must_use]
    pub fn planner_snapshot(&self) -> PlannerSnapshot {
        PlannerSnapshot {
            active: self.active,
            next: self.next.clone(),
            hold: self.hold,
            hold_available: self.hold_available,
        }
    }
}

/// Mutation API the orchestrator drives.
///
/// Rejected mutations leave the game unchanged.
pub trait GameControl {
    fn observe(&self) -> GameSnapshot;
    fn move_piece(&mut self, direction: Direction) -> Result<(), ActionError>;
    fn rotate_piece(&mut self) -> Result<(), ActionError>;
    fn rotate_piece_left(&mut self) -> Result<(), ActionError>;
    fn hard_drop(&mut self) -> Result<LockResult, ActionError>;
    fn hold_piece(&mut self) -> Result<(), ActionError>;
    /// Pushes `count` garbage rows, each with one random empty column.
    fn inject_garbage<R>(&mut self, count: usize, rng: &mut R)
    where
        R: Rng + ?Sized;

    /// Dispatches one planned action to the matching mutation.
    fn dispatch(&mut self, action: Action) -> Result<Option<LockResult>, ActionError> {
        match action {
            Action::Move(direction) => self.move_piece(direction).map(|()| None),
            Action::Rotate(RotationDirection::Clockwise) => self.rotate_piece().map(|()| None),
            Action::Rotate(RotationDirection::CounterClockwise) => {
                self.rotate_piece_left().map(|()| None)
            }
            Action::Hold => self.hold_piece().map(|()| None),
            Action::HardDrop => self.hard_drop().map(Some),
        }
    }
}

impl GameControl for GameSession {
    fn observe(&self) -> GameSnapshot {
        let state = self.state();
        GameSnapshot {
            active: state.falling_piece(),
            next: state.next_pieces().take(NEXT_PREVIEW).collect(),
            hold: state.held_piece(),
            hold_available: state.is_hold_available(),
            board: state.board().clone(),
            paused: self.session_state().is_paused(),
            game_over: self.session_state().is_game_over(),
            total_cleared_lines: self.scores().total_cleared_lines(),
            clear_histogram: *self.scores().line_cleared_counter(),
        }
    }

    fn move_piece(&mut self, direction: Direction) -> Result<(), ActionError> {
        GameSession::move_piece(self, direction)
    }

    fn rotate_piece(&mut self) -> Result<(), ActionError> {
        GameSession::rotate_piece(self)
    }

    fn rotate_piece_left(&mut self) -> Result<(), ActionError> {
        GameSession::rotate_piece_left(self)
    }

    fn hard_drop(&mut self) -> Result<LockResult, ActionError> {
        GameSession::hard_drop(self)
    }

    fn hold_piece(&mut self) -> Result<(), ActionError> {
        GameSession::hold_piece(self)
    }

    fn inject_garbage<R>(&mut self, count: usize, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        GameSession::inject_garbage(self, count, rng);
    }
}
