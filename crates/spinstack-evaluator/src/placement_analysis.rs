//! Board state after a piece placement.
//!
//! [`PlacementAnalysis`] pairs the rows cleared by a placement with a lazily
//! evaluated [`BoardAnalysis`] of the board that results from it.

use spinstack_engine::{Board, Piece};

use crate::board_analysis::BoardAnalysis;

#[derive(Debug)]
pub struct PlacementAnalysis {
    cleared_lines: usize,
    board_analysis: BoardAnalysis,
}

impl PlacementAnalysis {
    /// Locks `placement` onto a copy of `before_placement` and clears full rows.
    #[must_use]
    pub fn from_board(before_placement: &Board, placement: Piece) -> Self {
        let (board, cleared_lines) = before_placement.place_piece(&placement).clear_full_rows();
        Self {
            cleared_lines,
            board_analysis: BoardAnalysis::from_board(&board),
        }
    }

    #[must_use]
    pub fn cleared_lines(&self) -> usize {
        self.cleared_lines
    }

    #[must_use]
    pub fn board_analysis(&self) -> &BoardAnalysis {
        &self.board_analysis
    }

    /// Returns the board after the placement and line clears.
    #[must_use]
    pub fn board(&self) -> &Board {
        self.board_analysis.board()
    }
}

#[cfg(test)]
mod tests {
    use spinstack_engine::{PieceKind, PiecePosition, PieceRotation};

    use super::*;

    #[test]
    fn test_placement_clears_completed_row() {
        let board = Board::from_ascii(
            "
            ####..####
            ",
        );
        let placement = Piece::with_placement(PieceKind::O, PieceRotation::new(0), PiecePosition::new(4, 18));
        let analysis = PlacementAnalysis::from_board(&board, placement);
        assert_eq!(analysis.cleared_lines(), 1);
        assert_eq!(analysis.board_analysis().column_heights()[4], 1);
        assert_eq!(analysis.board_analysis().aggregate_height(), 2);
    }
}
