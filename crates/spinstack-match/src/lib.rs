//! Driving games with the planner.
//!
//! - [`game_control`] - the snapshot/mutation interface an AI plays through
//! - [`orchestrator`] - paced planning and action dispatch for one game
//! - [`versus`] - two orchestrated games exchanging garbage rows
//!
//! Hosts that want a match off their main thread move the games and the
//! orchestrators onto one worker thread and talk to it over channels; nothing
//! here is shared between threads.

pub use self::{
    game_control::{GameControl, GameSnapshot},
    orchestrator::{MAX_ACTIONS_PER_TICK, Orchestrator, OrchestratorState, TickReport},
    versus::{MatchOutcome, Seat, Side, VersusMatch, garbage_for_clear, scale_garbage},
};

pub mod game_control;
pub mod orchestrator;
pub mod versus;
