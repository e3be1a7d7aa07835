use serde::{Deserialize, Serialize};

/// Coefficients of the placement evaluation.
///
/// All weights are magnitudes: `lines_cleared` and `spin_setups` are rewarded,
/// the remaining features are penalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub lines_cleared: f32,
    pub spin_setups: f32,
    pub aggregate_height: f32,
    pub holes: f32,
    pub blockades: f32,
    pub bumpiness: f32,
    pub wells: f32,
    pub row_transitions: f32,
    pub column_transitions: f32,
}

impl Weights {
    pub const ZERO: Self = Self {
        lines_cleared: 0.0,
        spin_setups: 0.0,
        aggregate_height: 0.0,
        holes: 0.0,
        blockades: 0.0,
        bumpiness: 0.0,
        wells: 0.0,
        row_transitions: 0.0,
        column_transitions: 0.0,
    };

    /// Returns `(name, value)` pairs in declaration order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, f32); 9] {
        [
            ("lines_cleared", self.lines_cleared),
            ("spin_setups", self.spin_setups),
            ("aggregate_height", self.aggregate_height),
            ("holes", self.holes),
            ("blockades", self.blockades),
            ("bumpiness", self.bumpiness),
            ("wells", self.wells),
            ("row_transitions", self.row_transitions),
            ("column_transitions", self.column_transitions),
        ]
    }

    /// Adds `delta` feature by feature, clamping every weight at zero.
    #[must_use]
    pub fn adjusted(&self, delta: &Self) -> Self {
        let add = |a: f32, b: f32| (a + b).max(0.0);
        Self {
            lines_cleared: add(self.lines_cleared, delta.lines_cleared),
            spin_setups: add(self.spin_setups, delta.spin_setups),
            aggregate_height: add(self.aggregate_height, delta.aggregate_height),
            holes: add(self.holes, delta.holes),
            blockades: add(self.blockades, delta.blockades),
            bumpiness: add(self.bumpiness, delta.bumpiness),
            wells: add(self.wells, delta.wells),
            row_transitions: add(self.row_transitions, delta.row_transitions),
            column_transitions: add(self.column_transitions, delta.column_transitions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjusted_clamps_at_zero() {
        let base = Weights {
            holes: 0.5,
            spin_setups: 0.1,
            ..Weights::ZERO
        };
        let delta = Weights {
            holes: 0.25,
            spin_setups: -0.3,
            ..Weights::ZERO
        };
        let merged = base.adjusted(&delta);
        assert!((merged.holes - 0.75).abs() < f32::EPSILON);
        assert!(merged.spin_setups.abs() < f32::EPSILON);
    }

    #[test]
    fn test_weights_json_uses_field_names() {
        let json = serde_json::to_value(Weights::ZERO).unwrap();
        for (name, _) in Weights::ZERO.entries() {
            assert!(json.get(name).is_some(), "missing {name}");
        }
    }
}
