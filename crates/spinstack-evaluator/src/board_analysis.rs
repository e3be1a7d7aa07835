//! Lazily computed board metrics.
//!
//! Every metric is computed on first access and cached, so evaluating a board
//! only pays for the metrics the weights actually use.

use std::{cell::OnceCell, iter};

use spinstack_engine::Board;

const WIDTH: usize = Board::WIDTH;
const HEIGHT: usize = Board::HEIGHT;

#[derive(Debug)]
pub struct BoardAnalysis {
    board: Board,
    column_heights: OnceCell<[u8; WIDTH]>,
    column_occupied_cells: OnceCell<[u8; WIDTH]>,
    aggregate_height: OnceCell<u16>,
    num_holes: OnceCell<u16>,
    num_blockades: OnceCell<u16>,
    bumpiness: OnceCell<u16>,
    well_sum: OnceCell<u16>,
    row_transitions: OnceCell<u16>,
    column_transitions: OnceCell<u16>,
    spin_setups: OnceCell<u16>,
}

impl BoardAnalysis {
    #[must_use]
    pub fn from_board(board: &Board) -> Self {
        Self {
            board: board.clone(),
            column_heights: OnceCell::new(),
            column_occupied_cells: OnceCell::new(),
            aggregate_height: OnceCell::new(),
            num_holes: OnceCell::new(),
            num_blockades: OnceCell::new(),
            bumpiness: OnceCell::new(),
            well_sum: OnceCell::new(),
            row_transitions: OnceCell::new(),
            column_transitions: OnceCell::new(),
            spin_setups: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    fn is_occupied(&self, x: usize, y: usize) -> bool {
        self.board.row(y).is_cell_occupied(x)
    }

    /// Height of each column: rows from the floor up to its topmost occupied cell.
    #[must_use]
    pub fn column_heights(&self) -> &[u8; WIDTH] {
        self.column_heights.get_or_init(|| {
            let mut column_heights = [0; WIDTH];
            for (x, h) in column_heights.iter_mut().enumerate() {
                let Some(min_y) = (0..HEIGHT).find(|y| self.is_occupied(x, *y)) else {
                    continue;
                };
                *h = u8::try_from(HEIGHT - min_y).unwrap_or(u8::MAX);
            }
            column_heights
        })
    }

    #[must_use]
    pub fn column_occupied_cells(&self) -> &[u8; WIDTH] {
        self.column_occupied_cells.get_or_init(|| {
            let mut column_occupied_cells = [0; WIDTH];
            for row in self.board.rows() {
                for (x, o) in column_occupied_cells.iter_mut().enumerate() {
                    if row.is_cell_occupied(x) {
                        *o += 1;
                    }
                }
            }
            column_occupied_cells
        })
    }

    #[must_use]
    pub fn max_height(&self) -> u8 {
        self.column_heights().iter().copied().max().unwrap_or(0)
    }

    #[must_use]
    pub fn aggregate_height(&self) -> u16 {
        *self
            .aggregate_height
            .get_or_init(|| self.column_heights().iter().copied().map(u16::from).sum())
    }

    /// Empty cells with an occupied cell anywhere above in the same column.
    #[must_use]
    pub fn num_holes(&self) -> u16 {
        *self.num_holes.get_or_init(|| {
            iter::zip(self.column_heights(), self.column_occupied_cells())
                .map(|(h, occ)| u16::from(h - occ))
                .sum()
        })
    }

    /// For every hole, the number of occupied cells above it in its column.
    #[must_use]
    pub fn num_blockades(&self) -> u16 {
        *self.num_blockades.get_or_init(|| {
            let mut blockades = 0;
            for x in 0..WIDTH {
                let mut above = 0;
                for y in 0..HEIGHT {
                    if self.is_occupied(x, y) {
                        above += 1;
                    } else {
                        blockades += above;
                    }
                }
            }
            blockades
        })
    }

    /// Sum of absolute height differences between adjacent columns.
    #[must_use]
    pub fn bumpiness(&self) -> u16 {
        *self.bumpiness.get_or_init(|| {
            self.column_heights()
                .windows(2)
                .map(|w| u16::from(w[0].abs_diff(w[1])))
                .sum()
        })
    }

    /// Depth of every column that is not higher than either neighbour.
    ///
    /// Walls count as infinitely tall.
    #[must_use]
    pub fn well_sum(&self) -> u16 {
        *self.well_sum.get_or_init(|| {
            let h = self.column_heights();
            let start = &[u8::MAX, h[0], h[1]][..];
            let end = &[h[WIDTH - 2], h[WIDTH - 1], u8::MAX][..];
            iter::once(start)
                .chain(h.windows(3))
                .chain(iter::once(end))
                .map(|w| {
                    if w[1] <= w[0] && w[1] <= w[2] {
                        u16::from(u8::min(w[0], w[2]) - w[1])
                    } else {
                        0
                    }
                })
                .sum()
        })
    }

    /// Occupied/empty boundaries along each row; side walls count as occupied.
    #[must_use]
    pub fn row_transitions(&self) -> u16 {
        *self.row_transitions.get_or_init(|| {
            let mut transitions = 0;
            for row in self.board.rows() {
                let mut prev_occupied = true;
                for occupied in (0..WIDTH).map(|x| row.is_cell_occupied(x)).chain([true]) {
                    if occupied != prev_occupied {
                        transitions += 1;
                    }
                    prev_occupied = occupied;
                }
            }
            transitions
        })
    }

    /// Occupied/empty boundaries down each column; the floor counts as occupied.
    #[must_use]
    pub fn column_transitions(&self) -> u16 {
        *self.column_transitions.get_or_init(|| {
            let mut transitions = 0;
            for x in 0..WIDTH {
                let mut prev_occupied = self.is_occupied(x, 0);
                for occupied in (1..HEIGHT).map(|y| self.is_occupied(x, y)).chain([true]) {
                    if occupied != prev_occupied {
                        transitions += 1;
                    }
                    prev_occupied = occupied;
                }
            }
            transitions
        })
    }

    /// Cavities a T piece can fill with a spin.
    ///
    /// An empty cell whose horizontal neighbours are both blocked, with the
    /// three cells of the row above it empty, at least one of the two cells
    /// diagonally two rows above blocked, and nothing occupied higher up in
    /// its own column. Buried cavities count as holes, not setups.
    #[must_use]
    pub fn spin_setups(&self) -> u16 {
        *self.spin_setups.get_or_init(|| {
            let blocked = |x: i32, y: i32| self.board.is_blocked(x, y);
            let mut setups = 0;
            for y in 2..HEIGHT {
                for x in 0..WIDTH {
                    let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
                        continue;
                    };
                    let is_setup = !blocked(x, y)
                        && blocked(x - 1, y)
                        && blocked(x + 1, y)
                        && (x - 1..=x + 1).all(|ax| !blocked(ax, y - 1))
                        && (blocked(x - 1, y - 2) || blocked(x + 1, y - 2))
                        && (0..y - 1).all(|ay| !blocked(x, ay));
                    if is_setup {
                        setups += 1;
                    }
                }
            }
            setups
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod test_boards {
        use super::*;

        pub fn flat() -> Board {
            Board::from_ascii(
                "
                ##########
                ##########
                ",
            )
        }

        pub fn staircase() -> Board {
            Board::from_ascii(
                "
                #.........
                ##........
                ###.......
                ####......
                #####.....
                ",
            )
        }

        pub fn single_hole() -> Board {
            Board::from_ascii(
                "
                #.........
                ..........
                #.........
                ",
            )
        }

        pub fn spin_slot() -> Board {
            Board::from_ascii(
                "
                ####......
                ###...####
                ####.#####
                ",
            )
        }
    }

    #[test]
    fn test_basic_metrics_on_common_boards() {
        // (name, board, aggregate_height, holes, blockades, bumpiness, wells)
        let test_cases = vec![
            ("empty", Board::EMPTY, 0, 0, 0, 0, 0),
            ("flat", test_boards::flat(), 20, 0, 0, 0, 0),
            ("staircase", test_boards::staircase(), 15, 0, 0, 5, 0),
            ("single_hole", test_boards::single_hole(), 3, 1, 1, 3, 0),
            ("spin_slot", test_boards::spin_slot(), 21, 1, 1, 5, 1),
        ];

        for (name, board, aggregate_height, holes, blockades, bumpiness, wells) in test_cases {
            let analysis = BoardAnalysis::from_board(&board);
            assert_eq!(analysis.aggregate_height(), aggregate_height, "{name}: aggregate_height");
            assert_eq!(analysis.num_holes(), holes, "{name}: holes");
            assert_eq!(analysis.num_blockades(), blockades, "{name}: blockades");
            assert_eq!(analysis.bumpiness(), bumpiness, "{name}: bumpiness");
            assert_eq!(analysis.well_sum(), wells, "{name}: wells");
        }
    }

    #[test]
    fn test_column_heights() {
        let analysis = BoardAnalysis::from_board(&test_boards::spin_slot());
        assert_eq!(analysis.column_heights(), &[3, 3, 3, 3, 0, 1, 2, 2, 2, 2]);
        assert_eq!(analysis.max_height(), 3);
    }

    #[test]
    fn test_blockades_count_every_cell_above() {
        let board = Board::from_ascii(
            "
            #.........
            #.........
            #.........
            ..........
            ..........
            ",
        );
        let analysis = BoardAnalysis::from_board(&board);
        assert_eq!(analysis.num_holes(), 2);
        assert_eq!(analysis.num_blockades(), 6);
    }

    #[test]
    fn test_wells_use_walls_as_infinitely_tall() {
        let board = Board::from_ascii(
            "
            .#######..
            .#######..
            .#######.#
            ",
        );
        let analysis = BoardAnalysis::from_board(&board);
        // column 0: 3 deep, column 8: 1 deep (min(3, 1) - 0), column 9: 0
        assert_eq!(analysis.well_sum(), 3 + 1);
    }

    #[test]
    fn test_transitions_treat_walls_and_floor_as_occupied() {
        let empty = BoardAnalysis::from_board(&Board::EMPTY);
        assert_eq!(empty.row_transitions(), 2 * 20);
        assert_eq!(empty.column_transitions(), 10);

        let full = BoardAnalysis::from_board(&test_boards::flat());
        assert_eq!(full.row_transitions(), 2 * 18);
        assert_eq!(full.column_transitions(), 10);

        let slot = BoardAnalysis::from_board(&test_boards::spin_slot());
        assert_eq!(slot.row_transitions(), 40);
        assert_eq!(slot.column_transitions(), 12);
    }

    #[test]
    fn test_spin_setups() {
        let slot = BoardAnalysis::from_board(&test_boards::spin_slot());
        assert_eq!(slot.spin_setups(), 1);

        // no overhang, no setup
        let open = Board::from_ascii(
            "
            ..........
            ###...####
            ####.#####
            ",
        );
        assert_eq!(BoardAnalysis::from_board(&open).spin_setups(), 0);

        // covered from above, not reachable by a spin
        let buried = Board::from_ascii(
            "
            ...##.....
            ..........
            ...#.#....
            #########.
            ",
        );
        let analysis = BoardAnalysis::from_board(&buried);
        assert_eq!(analysis.spin_setups(), 0);
        assert_eq!(analysis.num_holes(), 3);

        assert_eq!(BoardAnalysis::from_board(&Board::EMPTY).spin_setups(), 0);
        assert_eq!(BoardAnalysis::from_board(&test_boards::flat()).spin_setups(), 0);
    }
}
