use serde::{Deserialize, Serialize};

/// Score values for line clears.
///
/// Index corresponds to number of lines cleared simultaneously:
/// - 0 lines: 0 points
/// - 1 line: 100 points
/// - 2 lines: 300 points
/// - 3 lines: 500 points
/// - 4 lines: 800 points
pub const SCORE_TABLE: [u64; 5] = [0, 100, 300, 500, 800];

/// Score values for line clears completed by a special move (T spin).
///
/// Only 1 to 3 rows can be cleared by a T piece; the values keep scores
/// strictly increasing in rows cleared.
pub const SPECIAL_MOVE_SCORE_TABLE: [u64; 4] = [0, 200, 500, 700];

/// Points per combo step, multiplied by the combo count and `level + 1`.
pub const COMBO_BONUS: u64 = 50;

/// Lines needed to advance one level.
pub const LINES_PER_LEVEL: usize = 10;

/// Returns whether a clear keeps the back-to-back chain alive.
#[must_use]
pub fn is_back_to_back_clear(rows_cleared: usize, special_move: bool) -> bool {
    rows_cleared >= 4 || (rows_cleared > 0 && special_move)
}

/// Computes the points awarded for a single lock.
///
/// `combo` is the combo count after this clear (0 for the first clear of a
/// streak). The back-to-back multiplier applies only to qualifying clears.
///
/// # Example
///
/// ```
/// use spinstack_engine::score;
///
/// assert_eq!(score(0, 3, 5, true, true), 0);
/// assert_eq!(score(1, 0, 0, false, false), 100);
/// assert_eq!(score(4, 1, 0, false, true), 2400);
/// ```
#[must_use]
pub fn score(
    rows_cleared: usize,
    level: usize,
    combo: usize,
    special_move: bool,
    back_to_back_active: bool,
) -> u64 {
    if rows_cleared == 0 {
        return 0;
    }
    let rows = rows_cleared.min(4);
    let multiplier = level as u64 + 1;
    let base = match SPECIAL_MOVE_SCORE_TABLE.get(rows) {
        Some(points) if special_move => *points,
        _ => SCORE_TABLE[rows],
    };
    let mut points = base * multiplier;
    if back_to_back_active && is_back_to_back_clear(rows, special_move) {
        points = points * 3 / 2;
    }
    points + COMBO_BONUS * combo as u64 * multiplier
}

#[must_use]
pub fn level_for_lines(total_lines: usize) -> usize {
    total_lines / LINES_PER_LEVEL
}

/// Milliseconds between gravity steps at the given level.
///
/// Starts at 1000 ms and speeds up by 100 ms per level down to 100 ms.
#[must_use]
pub fn drop_interval_millis(level: usize) -> u64 {
    100 + 900_u64.saturating_sub(level as u64 * 100)
}

/// Outcome of locking a piece, returned by the game state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockResult {
    pub rows_cleared: usize,
    pub score_delta: u64,
    pub special_move: bool,
    /// The clear was qualifying and the chain was already active.
    pub back_to_back: bool,
    /// A 1-3 row clear without the special flag ended an active chain.
    pub back_to_back_broken: bool,
    /// Combo count after this lock, `None` when no combo is running.
    pub combo: Option<usize>,
}

/// Score, level and clear statistics for one game.
///
/// # Example
///
/// ```
/// use spinstack_engine::ScoreKeeper;
///
/// let mut keeper = ScoreKeeper::new();
/// keeper.record_lock(4, false); // quad
///
/// assert_eq!(keeper.score(), 800);
/// assert_eq!(keeper.total_cleared_lines(), 4);
/// assert_eq!(keeper.line_cleared_counter()[4], 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreKeeper {
    score: u64,
    completed_pieces: usize,
    total_cleared_lines: usize,
    line_cleared_counter: [usize; 5],
    special_clears: usize,
    combo: Option<usize>,
    max_combo: usize,
    back_to_back_active: bool,
}

impl ScoreKeeper {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            score: 0,
            completed_pieces: 0,
            total_cleared_lines: 0,
            line_cleared_counter: [0; 5],
            special_clears: 0,
            combo: None,
            max_combo: 0,
            back_to_back_active: false,
        }
    }

    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    /// Level derived from total lines cleared (one level per 10 lines).
    #[must_use]
    pub fn level(&self) -> usize {
        level_for_lines(self.total_cleared_lines)
    }

    #[must_use]
    pub const fn completed_pieces(&self) -> usize {
        self.completed_pieces
    }

    #[must_use]
    pub const fn total_cleared_lines(&self) -> usize {
        self.total_cleared_lines
    }

    /// Returns a histogram of locks by rows cleared.
    ///
    /// Index `n` counts locks that cleared `n` rows (4 also counts larger
    /// clears, which cannot happen with tetrominoes).
    #[must_use]
    pub const fn line_cleared_counter(&self) -> &[usize; 5] {
        &self.line_cleared_counter
    }

    #[must_use]
    pub const fn special_clears(&self) -> usize {
        self.special_clears
    }

    #[must_use]
    pub const fn combo(&self) -> Option<usize> {
        self.combo
    }

    #[must_use]
    pub const fn max_combo(&self) -> usize {
        self.max_combo
    }

    #[must_use]
    pub const fn is_back_to_back_active(&self) -> bool {
        self.back_to_back_active
    }

    /// Updates the statistics after a piece lock and returns what happened.
    ///
    /// The level used for scoring is the level before this clear.
    pub fn record_lock(&mut self, rows_cleared: usize, special_move: bool) -> LockResult {
        self.completed_pieces += 1;
        self.line_cleared_counter[rows_cleared.min(4)] += 1;

        if rows_cleared == 0 {
            self.combo = None;
            return LockResult {
                special_move,
                ..LockResult::default()
            };
        }

        let combo = self.combo.map_or(0, |combo| combo + 1);
        self.combo = Some(combo);
        self.max_combo = self.max_combo.max(combo);

        let qualifying = is_back_to_back_clear(rows_cleared, special_move);
        let score_delta = score(
            rows_cleared,
            self.level(),
            combo,
            special_move,
            self.back_to_back_active,
        );
        let back_to_back = qualifying && self.back_to_back_active;
        let back_to_back_broken = !qualifying && self.back_to_back_active;
        self.back_to_back_active = qualifying;

        if special_move {
            self.special_clears += 1;
        }
        self.score += score_delta;
        self.total_cleared_lines += rows_cleared;

        LockResult {
            rows_cleared,
            score_delta,
            special_move,
            back_to_back,
            back_to_back_broken,
            combo: Some(combo),
        }
    }
}
