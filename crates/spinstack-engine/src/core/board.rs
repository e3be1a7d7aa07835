use std::fmt;

use serde::{Deserialize, Serialize};

use super::piece::{Piece, PieceKind};

const WIDTH: usize = 10;
const HEIGHT: usize = 20;

// Full row (all playable cells occupied)
const FULL_ROW_MASK: u16 = (1 << WIDTH) - 1;

/// A single cell of the board.
///
/// The tag of an occupied cell only carries identity (which piece, or garbage);
/// rules and evaluation look at occupancy alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    /// Cell of a locked piece.
    Piece(PieceKind),
    /// Cell of an injected garbage row.
    Garbage,
}

impl Cell {
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    fn as_char(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Piece(kind) => kind.as_char(),
            Cell::Garbage => '#',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(Cell::Empty),
            '#' => Some(Cell::Garbage),
            c => PieceKind::from_char(c).map(Cell::Piece),
        }
    }
}

/// Single row of the board.
///
/// Keeps the tagged cells together with an occupancy bitmask (bit `x` set when
/// column `x` is occupied) used for collision checks and full-row detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoardRow {
    mask: u16,
    cells: [Cell; WIDTH],
}

impl BoardRow {
    pub const EMPTY: Self = Self {
        mask: 0,
        cells: [Cell::Empty; WIDTH],
    };

    /// Builds a garbage row with a single empty column.
    #[must_use]
    pub fn garbage(hole_x: usize) -> Self {
        let mut row = Self::EMPTY;
        for x in (0..WIDTH).filter(|x| *x != hole_x) {
            row.set(x, Cell::Garbage);
        }
        row
    }

    #[inline]
    #[must_use]
    pub fn mask(self) -> u16 {
        self.mask
    }

    #[inline]
    #[must_use]
    pub fn is_filled(self) -> bool {
        self.mask == FULL_ROW_MASK
    }

    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.mask == 0
    }

    #[inline]
    #[must_use]
    pub fn is_cell_occupied(self, x: usize) -> bool {
        self.mask & (1 << x) != 0
    }

    #[must_use]
    pub fn cell(self, x: usize) -> Cell {
        self.cells[x]
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().copied()
    }

    fn set(&mut self, x: usize, cell: Cell) {
        self.cells[x] = cell;
        if cell.is_empty() {
            self.mask &= !(1 << x);
        } else {
            self.mask |= 1 << x;
        }
    }
}

/// Fixed 10x20 playfield.
///
/// Row 0 is the top of the board. Everything above row 0 is treated as empty
/// space the falling piece may pass through; everything left, right or below
/// the board is a wall.
///
/// # Example
///
/// ```
/// use spinstack_engine::{Board, Piece, PieceKind};
///
/// let board = Board::EMPTY;
/// let piece = Piece::new(PieceKind::O).simulate_drop_position(&board);
/// let placed = board.place_piece(&piece);
/// let (cleared, rows) = placed.clear_full_rows();
/// assert_eq!(rows, 0);
/// assert_eq!(cleared, placed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    rows: [BoardRow; HEIGHT],
}

impl Default for Board {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Board {
    pub const WIDTH: usize = WIDTH;
    pub const HEIGHT: usize = HEIGHT;

    pub const EMPTY: Self = Self {
        rows: [BoardRow::EMPTY; HEIGHT],
    };

    #[must_use]
    pub fn row(&self, y: usize) -> BoardRow {
        self.rows[y]
    }

    /// Returns an iterator over the rows from top to bottom.
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = BoardRow> + ExactSizeIterator + '_ {
        self.rows.iter().copied()
    }

    #[must_use]
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.rows[y].cell(x)
    }

    /// Checks whether a board-relative cell is occupied or outside the walls.
    ///
    /// Cells above the board are empty; cells left, right or below are blocked.
    #[must_use]
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            // negative x is a wall, negative y is open sky
            return x < 0;
        };
        if x >= WIDTH || y >= HEIGHT {
            return true;
        }
        self.rows[y].is_cell_occupied(x)
    }

    /// Checks if the piece collides with occupied cells or the walls.
    #[must_use]
    pub fn is_colliding(&self, piece: &Piece) -> bool {
        let x0 = piece.position().x();
        let y0 = piece.position().y();
        for (dy, row_mask) in (0..).zip(piece.mask()) {
            if row_mask == 0 {
                continue;
            }
            let Some(shifted) = shift_row_mask(row_mask, x0) else {
                return true;
            };
            let y = y0 + dy;
            if y < 0 {
                continue;
            }
            match usize::try_from(y).ok().and_then(|y| self.rows.get(y)) {
                Some(row) if row.mask & shifted == 0 => {}
                _ => return true,
            }
        }
        false
    }

    /// Returns a new board with the piece's cells written in.
    ///
    /// Cells above the board are dropped.
    #[must_use]
    pub fn place_piece(&self, piece: &Piece) -> Self {
        let mut board = self.clone();
        board.fill_piece(piece);
        board
    }

    /// Locks a piece onto the board by setting its occupied cells.
    pub fn fill_piece(&mut self, piece: &Piece) {
        let cell = Cell::Piece(piece.kind());
        for (x, y) in piece.occupied_positions() {
            if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y))
                && x < WIDTH
                && y < HEIGHT
            {
                self.rows[y].set(x, cell);
            }
        }
    }

    /// Returns a new board with full rows removed, and the number of rows removed.
    #[must_use]
    pub fn clear_full_rows(&self) -> (Self, usize) {
        let mut board = self.clone();
        let count = board.clear_lines();
        (board, count)
    }

    /// Clears filled lines and returns the number of lines cleared.
    ///
    /// Rows are scanned bottom to top in a single pass; the remaining rows keep
    /// their order and empty rows are inserted at the top.
    pub fn clear_lines(&mut self) -> usize {
        let mut count = 0;
        for y in (0..HEIGHT).rev() {
            if self.rows[y].is_filled() {
                count += 1;
                continue;
            }
            if count > 0 {
                self.rows[y + count] = self.rows[y];
            }
        }
        self.rows[..count].fill(BoardRow::EMPTY);
        count
    }

    /// Pushes garbage rows in from the bottom, one per hole column.
    ///
    /// Each garbage row removes the top row of the board. Returns `true` if any
    /// occupied cell was pushed off the top.
    pub fn inject_garbage<I>(&mut self, hole_columns: I) -> bool
    where
        I: IntoIterator<Item = usize>,
    {
        let mut overflowed = false;
        for hole_x in hole_columns {
            overflowed |= !self.rows[0].is_empty();
            self.rows.rotate_left(1);
            self.rows[HEIGHT - 1] = BoardRow::garbage(hole_x % WIDTH);
        }
        overflowed
    }

    /// Returns whether any cell of the topmost row is occupied.
    #[must_use]
    pub fn is_top_row_occupied(&self) -> bool {
        !self.rows[0].is_empty()
    }

    /// Returns whether the board has no occupied cell at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.is_empty())
    }

    /// Creates a `Board` from ASCII art.
    ///
    /// `.` is empty, `#` is garbage and piece letters (`IOSZJLT`) are piece
    /// cells. Each line must have exactly 10 cells; up to 20 lines are
    /// accepted and aligned to the bottom of the board. Whitespace is ignored.
    ///
    /// # Panics
    ///
    /// Panics on malformed art; intended for fixtures.
    #[must_use]
    pub fn from_ascii(art: &str) -> Self {
        let lines: Vec<&str> = art.lines().filter(|line| !line.trim().is_empty()).collect();
        assert!(
            lines.len() <= HEIGHT,
            "At most {HEIGHT} rows are allowed, got {}",
            lines.len()
        );

        let mut board = Self::EMPTY;
        let offset = HEIGHT - lines.len();
        for (i, line) in lines.iter().enumerate() {
            let cells: Vec<Cell> = line
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| Cell::from_char(c).unwrap_or_else(|| panic!("invalid cell '{c}'")))
                .collect();
            assert_eq!(
                cells.len(),
                WIDTH,
                "Each row must have exactly {WIDTH} cells, got {} at row {i}",
                cells.len(),
            );
            for (x, cell) in cells.into_iter().enumerate() {
                board.rows[offset + i].set(x, cell);
            }
        }
        board
    }
}

/// Shifts a bounding-box row mask to board column `x0`.
///
/// Returns `None` if any occupied bit would land outside the walls.
fn shift_row_mask(mask: u16, x0: i32) -> Option<u16> {
    let shifted = if x0 >= 0 {
        let shift = u32::try_from(x0).ok()?;
        u16::try_from(u32::from(mask).checked_shl(shift)?).ok()?
    } else {
        let shift = x0.unsigned_abs();
        if shift >= 16 || mask & ((1 << shift) - 1) != 0 {
            return None;
        }
        mask >> shift
    };
    (shifted & !FULL_ROW_MASK == 0).then_some(shifted)
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            for cell in row.cells() {
                write!(f, "{}", cell.as_char())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Serialize for Board {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Format: one string per row, top to bottom (e.g., ["..........", "TTT#######"])
        let rows: Vec<String> = self
            .rows
            .iter()
            .map(|row| row.cells().map(Cell::as_char).collect())
            .collect();
        rows.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let rows = Vec::<String>::deserialize(deserializer)?;
        if rows.len() != HEIGHT {
            return Err(serde::de::Error::custom(format!(
                "expected {HEIGHT} rows, got {}",
                rows.len()
            )));
        }

        let mut board = Self::EMPTY;
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != WIDTH {
                return Err(serde::de::Error::custom(format!(
                    "expected {WIDTH} cells at row {y}, got '{row}'"
                )));
            }
            for (x, c) in row.chars().enumerate() {
                let cell = Cell::from_char(c).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid cell '{c}' at ({x}, {y})"))
                })?;
                board.rows[y].set(x, cell);
            }
        }
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::piece::{PiecePosition, PieceRotation};

    fn piece_at(kind: PieceKind, rotation: u8, x: i8, y: i8) -> Piece {
        Piece::with_placement(kind, PieceRotation::new(rotation), PiecePosition::new(x, y))
    }

    #[test]
    fn test_empty_board() {
        let board = Board::EMPTY;
        assert!(board.is_empty());
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                assert_eq!(board.cell(x, y), Cell::Empty);
            }
        }
    }

    #[test]
    fn test_is_blocked_walls_and_sky() {
        let board = Board::EMPTY;
        assert!(board.is_blocked(-1, 5));
        assert!(board.is_blocked(10, 5));
        assert!(board.is_blocked(3, 20));
        assert!(!board.is_blocked(3, -2));
        assert!(board.is_blocked(-1, -2));
        assert!(!board.is_blocked(0, 19));
    }

    #[test]
    fn test_is_colliding_walls() {
        let board = Board::EMPTY;
        // vertical I occupies column 2 of its box
        let i_left = piece_at(PieceKind::I, 1, -2, 0);
        assert!(!board.is_colliding(&i_left));
        assert!(board.is_colliding(&piece_at(PieceKind::I, 1, -3, 0)));
        assert!(!board.is_colliding(&piece_at(PieceKind::I, 1, 7, 0)));
        assert!(board.is_colliding(&piece_at(PieceKind::I, 1, 8, 0)));
        assert!(!board.is_colliding(&piece_at(PieceKind::I, 1, 7, 16)));
        assert!(board.is_colliding(&piece_at(PieceKind::I, 1, 7, 17)));
    }

    #[test]
    fn test_cells_above_board_never_collide() {
        let board = Board::from_ascii(
            "
            ##########
            ",
        );
        assert!(!board.is_colliding(&piece_at(PieceKind::O, 0, 4, -2)));
        assert!(!board.is_colliding(&piece_at(PieceKind::T, 0, 0, -5)));
    }

    #[test]
    fn test_is_colliding_stack() {
        let board = Board::from_ascii(
            "
            ....#.....
            ",
        );
        assert!(board.is_colliding(&piece_at(PieceKind::O, 0, 3, 18)));
        assert!(!board.is_colliding(&piece_at(PieceKind::O, 0, 5, 18)));
        assert!(!board.is_colliding(&piece_at(PieceKind::O, 0, 3, 17)));
    }

    #[test]
    fn test_place_piece_tags_cells() {
        let piece = piece_at(PieceKind::T, 0, 0, 18);
        let board = Board::EMPTY.place_piece(&piece);
        assert_eq!(board.cell(1, 18), Cell::Piece(PieceKind::T));
        assert_eq!(board.cell(0, 19), Cell::Piece(PieceKind::T));
        assert_eq!(board.cell(2, 19), Cell::Piece(PieceKind::T));
        assert_eq!(board.cell(0, 18), Cell::Empty);
        assert!(Board::EMPTY.is_empty());
    }

    #[test]
    fn test_place_piece_drops_cells_above_board() {
        let piece = piece_at(PieceKind::O, 0, 0, -1);
        let board = Board::EMPTY.place_piece(&piece);
        assert!(board.is_top_row_occupied());
        assert_eq!(board.rows().filter(|row| !row.is_empty()).count(), 1);
    }

    #[test]
    fn test_clear_lines_single_line() {
        let mut board = Board::from_ascii(
            "
            ..#.......
            ##########
            ",
        );
        assert_eq!(board.clear_lines(), 1);
        assert_eq!(
            board,
            Board::from_ascii(
                "
                ..#.......
                "
            )
        );
    }

    #[test]
    fn test_clear_lines_preserves_order() {
        let board = Board::from_ascii(
            "
            #.........
            ##########
            .#........
            ##########
            ##########
            ..#.......
            ",
        );
        let (cleared, count) = board.clear_full_rows();
        assert_eq!(count, 3);
        assert_eq!(
            cleared,
            Board::from_ascii(
                "
                #.........
                .#........
                ..#.......
                "
            )
        );
    }

    #[test]
    fn test_clear_lines_idempotent_without_full_rows() {
        let board = Board::from_ascii(
            "
            #########.
            .#########
            ",
        );
        let (cleared, count) = board.clear_full_rows();
        assert_eq!(count, 0);
        assert_eq!(cleared, board);
    }

    #[test]
    fn test_clear_lines_all_filled() {
        let art = "##########\n".repeat(HEIGHT);
        let mut board = Board::from_ascii(&art);
        assert_eq!(board.clear_lines(), HEIGHT);
        assert!(board.is_empty());
    }

    #[test]
    fn test_inject_garbage() {
        let mut board = Board::from_ascii(
            "
            TTT.......
            ",
        );
        let overflowed = board.inject_garbage([3, 7]);
        assert!(!overflowed);
        assert_eq!(
            board,
            Board::from_ascii(
                "
                TTT.......
                ###.######
                #######.##
                "
            )
        );
    }

    #[test]
    fn test_inject_garbage_reports_overflow() {
        let mut board = Board::from_ascii(&"#.........\n".repeat(HEIGHT));
        assert!(board.inject_garbage([0]));
    }

    #[test]
    fn test_board_serialization() {
        let board = Board::from_ascii(
            "
            ....I.....
            ##.#######
            ",
        );
        let serialized = serde_json::to_string(&board).unwrap();
        assert!(serialized.contains("\"....I.....\""));
        assert!(serialized.contains("\"##.#######\""));

        let deserialized: Board = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, board);

        assert!(serde_json::from_str::<Board>("[\"..........\"]").is_err());
    }

    #[test]
    fn test_display_matches_ascii() {
        let board = Board::from_ascii(
            "
            ZZ........
            ",
        );
        let text = board.to_string();
        assert_eq!(text.lines().count(), HEIGHT);
        assert_eq!(text.lines().last(), Some("ZZ........"));
    }
}
