//! Game rules built on the core data structures.
//!
//! - [`GameState`] - board, falling piece, piece queue with hold, and score
//! - [`GameSession`] - a [`GameState`] with gravity, pause and game over
//! - [`ScoreKeeper`] - score, combo, back-to-back chain and clear histogram
//! - [`PieceBuffer`] - 7-bag piece generation
//! - [`PieceSeed`] - seed for deterministic piece generation
//!
//! Every lock returns a [`LockResult`] describing what happened, and the
//! caller decides what to do with it.

pub use self::{game_session::*, game_state::*, piece_buffer::*, scoring::*};

mod game_session;
mod game_state;
mod piece_buffer;
mod scoring;
