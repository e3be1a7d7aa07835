//! Placement evaluation: one scalar per candidate placement.
//!
//! The score is a linear combination of board features:
//!
//! ```text
//! score = w_lines * lines + w_setup * setups - Σ(w_i * penalty_i)
//! ```
//!
//! Higher is better. Features are raw counts; there is no normalization, so
//! weights carry the scale.

use spinstack_engine::Board;

use crate::{
    board_analysis::BoardAnalysis, placement_analysis::PlacementAnalysis, weights::Weights,
};

/// Evaluates the board resulting from a move.
///
/// `board` is the board after the piece was placed and full rows removed.
///
/// # Example
///
/// ```
/// use spinstack_engine::Board;
/// use spinstack_evaluator::{Difficulty, Policy, evaluate};
///
/// let weights = Policy::preset(Difficulty::Normal).weights;
/// let board = Board::from_ascii("#########.");
/// assert!(evaluate(&board, 1, &weights) > evaluate(&board, 0, &weights));
/// ```
#[must_use]
pub fn evaluate(board: &Board, rows_cleared: usize, weights: &Weights) -> f32 {
    score_features(&BoardAnalysis::from_board(board), rows_cleared, weights)
}

/// Evaluates an already analysed placement.
#[must_use]
pub fn evaluate_placement(analysis: &PlacementAnalysis, weights: &Weights) -> f32 {
    score_features(analysis.board_analysis(), analysis.cleared_lines(), weights)
}

fn score_features(analysis: &BoardAnalysis, rows_cleared: usize, weights: &Weights) -> f32 {
    let lines = f32::from(u8::try_from(rows_cleared).unwrap_or(u8::MAX));
    let reward = weights.lines_cleared * lines
        + weights.spin_setups * f32::from(analysis.spin_setups());
    let penalty = [
        (weights.aggregate_height, analysis.aggregate_height()),
        (weights.holes, analysis.num_holes()),
        (weights.blockades, analysis.num_blockades()),
        (weights.bumpiness, analysis.bumpiness()),
        (weights.wells, analysis.well_sum()),
        (weights.row_transitions, analysis.row_transitions()),
        (weights.column_transitions, analysis.column_transitions()),
    ]
    .into_iter()
    .filter(|(w, _)| *w != 0.0)
    .map(|(w, value)| w * f32::from(value))
    .sum::<f32>();
    reward - penalty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Difficulty, Personality, Policy};

    fn all_policies() -> Vec<Policy> {
        let mut policies = Vec::new();
        for difficulty in Difficulty::ALL {
            for personality in Personality::ALL {
                policies.push(Policy::new(difficulty, personality));
            }
        }
        policies
    }

    #[test]
    fn test_one_more_hole_lowers_score() {
        let solid = Board::from_ascii(
            "
            #.........
            #.........
            ",
        );
        let holed = Board::from_ascii(
            "
            #.........
            ..........
            ",
        );
        for policy in all_policies() {
            let w = &policy.weights;
            assert!(evaluate(&holed, 0, w) < evaluate(&solid, 0, w), "{policy:?}");
        }
    }

    #[test]
    fn test_hole_under_overhang_lowers_score() {
        let covered = Board::from_ascii(
            "
            ...##.....
            ....#.....
            ...#.#....
            #########.
            ",
        );
        let hollowed = Board::from_ascii(
            "
            ...##.....
            ..........
            ...#.#....
            #########.
            ",
        );
        for policy in all_policies() {
            let w = &policy.weights;
            assert!(evaluate(&hollowed, 0, w) < evaluate(&covered, 0, w), "{policy:?}");
        }
    }

    #[test]
    fn test_one_more_line_raises_score() {
        let board = Board::from_ascii(
            "
            ..##......
            .####.....
            ",
        );
        for policy in all_policies() {
            let w = &policy.weights;
            for rows in 0..4 {
                assert!(evaluate(&board, rows + 1, w) > evaluate(&board, rows, w));
            }
        }
    }

    #[test]
    fn test_linear_combination() {
        let weights = Weights {
            lines_cleared: 2.0,
            holes: 1.0,
            aggregate_height: 0.5,
            ..Weights::ZERO
        };
        let board = Board::from_ascii(
            "
            #.........
            ..........
            ",
        );
        // 2 * 1 line - (1 hole + 0.5 * height 2)
        let score = evaluate(&board, 1, &weights);
        assert!((score - 0.0).abs() < 1e-6, "{score}");
    }

    #[test]
    fn test_evaluate_placement_matches_evaluate() {
        use spinstack_engine::{Piece, PieceKind};

        let board = Board::from_ascii(
            "
            ###..#####
            ",
        );
        let weights = Policy::preset(Difficulty::Hard).weights;
        let piece = Piece::new(PieceKind::O).simulate_drop_position(&board);
        let analysis = PlacementAnalysis::from_board(&board, piece);
        let (after, rows) = board.place_piece(&piece).clear_full_rows();
        assert!((evaluate_placement(&analysis, &weights) - evaluate(&after, rows, &weights)).abs() < 1e-6);
    }
}
