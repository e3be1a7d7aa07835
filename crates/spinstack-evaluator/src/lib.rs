//! Placement evaluation and planning for the AI players.
//!
//! The crate is layered bottom-up:
//!
//! 1. **Board analysis** ([`board_analysis`]) - cached board metrics such as
//!    column heights, holes, wells and transitions.
//! 2. **Placement evaluation** ([`placement_evaluator`]) - one weighted score
//!    per candidate placement.
//! 3. **Planning** ([`planner`]) - enumerates reachable placements, scores
//!    them and returns the action sequence for the best one.
//!
//! A [`Policy`] bundles the evaluation [`Weights`] with the search budgets and
//! pacing used by a match. Policies come from a [`Difficulty`] preset adjusted
//! by a [`Personality`].

pub use self::{
    placement_evaluator::{evaluate, evaluate_placement},
    planner::{NEXT_PREVIEW, Plan, PlanStats, PlannerSnapshot, plan},
    policy::{Difficulty, Personality, Policy, PolicyError},
    weights::Weights,
};

pub mod board_analysis;
pub mod placement_analysis;
pub mod placement_evaluator;
pub mod planner;
pub mod policy;
pub mod weights;
