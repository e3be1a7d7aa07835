//! Rules core of a falling-block puzzle game.
//!
//! - [`core`] - pieces, the board, and the movement/rotation rules
//! - [`engine`] - scoring, the piece queue, and the game state mutated by
//!   players and AI

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("piece colliding when setting falling piece")]
pub struct PieceCollisionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum HoldError {
    #[display("piece colliding when holding piece")]
    PieceCollision(PieceCollisionError),
    #[display("hold already used in this turn")]
    HoldAlreadyUsed,
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum GameOverError {
    #[display("piece locked above the board")]
    LockedAboveBoard,
    #[display("top row occupied after lock")]
    TopRowOccupied,
    #[display("next piece collides at spawn")]
    SpawnCollision,
    #[display("garbage pushed blocks off the top")]
    GarbageOverflow,
}

/// A mutation rejected by a [`GameSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ActionError {
    #[display("game is not in progress")]
    NotPlaying,
    #[display("{_0}")]
    PieceCollision(PieceCollisionError),
    #[display("{_0}")]
    Hold(HoldError),
}

impl From<PieceCollisionError> for ActionError {
    fn from(err: PieceCollisionError) -> Self {
        Self::PieceCollision(err)
    }
}

impl From<HoldError> for ActionError {
    fn from(err: HoldError) -> Self {
        Self::Hold(err)
    }
}
