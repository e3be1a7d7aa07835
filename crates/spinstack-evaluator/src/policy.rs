//! AI policies: search budgets, pacing and evaluation weights.
//!
//! A [`Policy`] starts from a [`Difficulty`] preset and is then adjusted by a
//! [`Personality`], which shifts individual weights and the action pace.
//!
//! # Example
//!
//! ```
//! use spinstack_evaluator::{Difficulty, Personality, Policy};
//!
//! let policy = Policy::new(Difficulty::Hard, Personality::Aggressive);
//! assert!(policy.validate().is_ok());
//! assert!(policy.action_pace_ms >= Policy::MIN_ACTION_PACE_MS);
//!
//! let difficulty: Difficulty = "easy".parse().unwrap();
//! assert_eq!(difficulty, Difficulty::Easy);
//! ```

use serde::{Deserialize, Serialize};

use crate::weights::Weights;

#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Self; 3] = [Self::Easy, Self::Normal, Self::Hard];
}

#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
pub enum Personality {
    Lazy,
    #[default]
    Balanced,
    Aggressive,
}

impl Personality {
    pub const ALL: [Self; 3] = [Self::Lazy, Self::Balanced, Self::Aggressive];

    /// Per-feature weight deltas and the pace delta in milliseconds.
    #[must_use]
    pub const fn adjustment(self) -> (Weights, i64) {
        match self {
            Personality::Lazy => (
                Weights {
                    lines_cleared: -0.2,
                    spin_setups: -0.2,
                    aggregate_height: 0.1,
                    holes: 0.1,
                    ..Weights::ZERO
                },
                80,
            ),
            Personality::Balanced => (Weights::ZERO, 0),
            Personality::Aggressive => (
                Weights {
                    lines_cleared: 0.3,
                    spin_setups: 0.3,
                    aggregate_height: -0.15,
                    holes: -0.1,
                    ..Weights::ZERO
                },
                -40,
            ),
        }
    }
}

/// Everything the planner and the match orchestrator need to play one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Number of pieces searched: 1 is the active piece only, 2 adds one
    /// queued piece of lookahead.
    pub search_depth: usize,
    pub weights: Weights,
    /// Maximum number of evaluated placements per plan.
    pub node_budget: usize,
    /// Wall-clock limit per plan.
    pub time_budget_ms: u64,
    /// Delay between two action batches.
    pub action_pace_ms: u64,
    /// Multiplier applied to outgoing garbage.
    pub garbage_factor: f32,
}

const EASY: Policy = Policy {
    search_depth: 1,
    weights: Weights {
        lines_cleared: 0.5,
        spin_setups: 0.0,
        aggregate_height: 0.4,
        holes: 0.3,
        blockades: 0.05,
        bumpiness: 0.1,
        wells: 0.05,
        row_transitions: 0.0,
        column_transitions: 0.05,
    },
    node_budget: 200,
    time_budget_ms: 8,
    action_pace_ms: 220,
    garbage_factor: 0.5,
};

const NORMAL: Policy = Policy {
    search_depth: 1,
    weights: Weights {
        lines_cleared: 0.76,
        spin_setups: 0.25,
        aggregate_height: 0.51,
        holes: 0.6,
        blockades: 0.2,
        bumpiness: 0.18,
        wells: 0.1,
        row_transitions: 0.08,
        column_transitions: 0.12,
    },
    node_budget: 800,
    time_budget_ms: 20,
    action_pace_ms: 120,
    garbage_factor: 1.0,
};

const HARD: Policy = Policy {
    search_depth: 2,
    weights: Weights {
        lines_cleared: 0.9,
        spin_setups: 0.45,
        aggregate_height: 0.55,
        holes: 0.85,
        blockades: 0.3,
        bumpiness: 0.2,
        wells: 0.12,
        row_transitions: 0.1,
        column_transitions: 0.15,
    },
    node_budget: 4000,
    time_budget_ms: 40,
    action_pace_ms: 60,
    garbage_factor: 1.0,
};

#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
pub enum PolicyError {
    #[display("search depth must be at least 1")]
    ZeroSearchDepth,
    #[display("node budget must be at least 1")]
    ZeroNodeBudget,
    #[display("time budget must be at least 1 ms")]
    ZeroTimeBudget,
    #[display("action pace must be at least {} ms, got {pace_ms} ms", Policy::MIN_ACTION_PACE_MS)]
    ActionPaceTooShort { pace_ms: u64 },
    #[display("weight '{name}' must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f32 },
    #[display("garbage factor must be finite and non-negative, got {value}")]
    InvalidGarbageFactor { value: f32 },
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(Difficulty::default(), Personality::default())
    }
}

impl Policy {
    /// Lower bound of the action pace after personality adjustment.
    pub const MIN_ACTION_PACE_MS: u64 = 30;

    #[must_use]
    pub const fn preset(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => EASY,
            Difficulty::Normal => NORMAL,
            Difficulty::Hard => HARD,
        }
    }

    /// Builds the preset for `difficulty` adjusted by `personality`.
    #[must_use]
    pub fn new(difficulty: Difficulty, personality: Personality) -> Self {
        Self::preset(difficulty).with_personality(personality)
    }

    /// Adds the personality's weight deltas and pace delta.
    ///
    /// Weights are clamped at zero and the pace at [`Self::MIN_ACTION_PACE_MS`].
    #[must_use]
    pub fn with_personality(&self, personality: Personality) -> Self {
        let (weight_delta, pace_delta) = personality.adjustment();
        let pace = i64::try_from(self.action_pace_ms)
            .unwrap_or(i64::MAX)
            .saturating_add(pace_delta);
        let action_pace_ms = u64::try_from(pace)
            .unwrap_or(0)
            .max(Self::MIN_ACTION_PACE_MS);
        Self {
            weights: self.weights.adjusted(&weight_delta),
            action_pace_ms,
            ..*self
        }
    }

    /// Checks the policy for values the planner or orchestrator cannot use.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.search_depth == 0 {
            return Err(PolicyError::ZeroSearchDepth);
        }
        if self.node_budget == 0 {
            return Err(PolicyError::ZeroNodeBudget);
        }
        if self.time_budget_ms == 0 {
            return Err(PolicyError::ZeroTimeBudget);
        }
        if self.action_pace_ms < Self::MIN_ACTION_PACE_MS {
            return Err(PolicyError::ActionPaceTooShort {
                pace_ms: self.action_pace_ms,
            });
        }
        for (name, value) in self.weights.entries() {
            if !value.is_finite() || value < 0.0 {
                return Err(PolicyError::InvalidWeight { name, value });
            }
        }
        if !self.garbage_factor.is_finite() || self.garbage_factor < 0.0 {
            return Err(PolicyError::InvalidGarbageFactor {
                value: self.garbage_factor,
            });
        }
        Ok(())
    }
}
