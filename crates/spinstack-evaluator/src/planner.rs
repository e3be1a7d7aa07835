//! Placement planning: choosing where the active piece goes and how to get it
//! there.
//!
//! # How It Works
//!
//! 1. **Enumerate** - for every distinct rotation state of the active piece
//!    (and of the hold alternative), and every target column, synthesize
//!    clockwise rotations followed by left/right moves and replay them with
//!    the movement rules. A rejected step discards the candidate.
//! 2. **Drop and score** - drop each surviving candidate to rest and score the
//!    resulting board with the placement evaluator.
//! 3. **Select** - keep the highest score. Ties keep the first candidate in
//!    enumeration order (rotation, then column, active piece before hold).
//! 4. **Lookahead** - with `search_depth > 1`, the best shallow candidates are
//!    re-ranked by adding the best score reachable with the next queued
//!    pieces.
//!
//! Every evaluation counts against the policy's node and time budgets. When a
//! budget runs out the best result so far is returned; an interrupted
//! lookahead falls back to the shallow result.
//!
//! Rotations happen at the start position, so plans never end in a spin. The
//! `spin_setups` reward only shapes the stack; it does not make the planner
//! finish special moves.
//!
//! # Example
//!
//! ```
//! use spinstack_engine::{Action, GameState};
//! use spinstack_evaluator::{Policy, PlannerSnapshot, plan};
//!
//! let state = GameState::new();
//! let snapshot = PlannerSnapshot::from_state(&state);
//! let plan = plan(&snapshot, state.board(), &Policy::default());
//!
//! assert_eq!(plan.actions().last(), Some(&Action::HardDrop));
//! ```

use std::time::{Duration, Instant};

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use spinstack_engine::{
    Action, Board, Direction, GameState, Piece, PieceKind, PieceMask, RotationDirection,
    attempt_rotate, attempt_translate, drop_to_rest,
};

use crate::{placement_analysis::PlacementAnalysis, placement_evaluator, policy::Policy};

/// Number of queued pieces visible to the planner.
pub const NEXT_PREVIEW: usize = 5;

// Shallow candidates re-ranked by lookahead
const LOOKAHEAD_WIDTH: usize = 8;
// Rows the start position may be lifted when it collides
const SPAWN_NUDGE_ROWS: i32 = 3;
// Anchor columns tried outside the board on each side
const COLUMN_MARGIN: i32 = 2;
// Score of a lookahead branch whose piece cannot be placed
const TOP_OUT_PENALTY: f32 = 1000.0;

/// What the planner knows about the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerSnapshot {
    pub active: Piece,
    pub next: ArrayVec<PieceKind, NEXT_PREVIEW>,
    pub hold: Option<PieceKind>,
    pub hold_available: bool,
}

impl PlannerSnapshot {
    #[must_use]
    pub fn from_state(state: &GameState) -> Self {
        Self {
            active: state.falling_piece(),
            next: state.next_pieces().take(NEXT_PREVIEW).collect(),
            hold: state.held_piece(),
            hold_available: state.is_hold_available(),
        }
    }

    /// Kind that becomes active if hold is used.
    #[must_use]
    pub fn hold_result(&self) -> Option<PieceKind> {
        self.hold.or_else(|| self.next.first().copied())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    /// Placements evaluated, lookahead included.
    pub nodes: usize,
    pub elapsed: Duration,
    pub budget_exhausted: bool,
    pub lookahead_completed: bool,
}

/// Ordered actions that bring the active piece to its chosen placement.
///
/// An empty plan means the active piece has no legal placement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    actions: Vec<Action>,
    target: Option<Piece>,
    score: f32,
    stats: PlanStats,
}

impl Plan {
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    #[must_use]
    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    /// Final resting piece of the plan.
    #[must_use]
    pub fn target(&self) -> Option<Piece> {
        self.target
    }

    #[must_use]
    pub fn score(&self) -> f32 {
        self.score
    }

    #[must_use]
    pub fn stats(&self) -> &PlanStats {
        &self.stats
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[must_use]
    pub fn uses_hold(&self) -> bool {
        self.actions.first() == Some(&Action::Hold)
    }
}

#[derive(Debug)]
struct Candidate {
    actions: Vec<Action>,
    uses_hold: bool,
    placement: Piece,
    board: Board,
    score: f32,
}

struct Search<'a> {
    policy: &'a Policy,
    time_budget: Duration,
    start: Instant,
    nodes: usize,
    exhausted: bool,
}

impl<'a> Search<'a> {
    fn new(policy: &'a Policy) -> Self {
        Self {
            policy,
            time_budget: Duration::from_millis(policy.time_budget_ms),
            start: Instant::now(),
            nodes: 0,
            exhausted: false,
        }
    }

    /// Checked before every evaluation; the first evaluation always runs.
    fn should_stop(&mut self) -> bool {
        if !self.exhausted
            && self.nodes > 0
            && (self.nodes >= self.policy.node_budget || self.start.elapsed() >= self.time_budget)
        {
            self.exhausted = true;
        }
        self.exhausted
    }

    fn evaluate(&mut self, analysis: &PlacementAnalysis) -> f32 {
        self.nodes += 1;
        placement_evaluator::evaluate_placement(analysis, &self.policy.weights)
    }

    fn stats(&self, lookahead_completed: bool) -> PlanStats {
        PlanStats {
            nodes: self.nodes,
            elapsed: self.start.elapsed(),
            budget_exhausted: self.exhausted,
            lookahead_completed,
        }
    }
}

/// Plans the next placement for the snapshot's active piece.
#[must_use]
pub fn plan(snapshot: &PlannerSnapshot, board: &Board, policy: &Policy) -> Plan {
    let mut search = Search::new(policy);
    let mut candidates = Vec::new();

    if let Some(active) = nudge_start(snapshot.active, board) {
        enumerate_placements(&mut search, active, board, &[], &mut candidates);
    }
    // the game spawns the held-in piece without lifting it
    let held = snapshot
        .hold_available
        .then(|| snapshot.hold_result())
        .flatten()
        .map(Piece::new)
        .filter(|held| !board.is_colliding(held));
    if let Some(held) = held {
        enumerate_placements(&mut search, held, board, &[Action::Hold], &mut candidates);
    }

    let mut best = best_index(candidates.iter().map(|c| c.score));
    let mut lookahead_completed = false;
    if policy.search_depth > 1
        && best.is_some()
        && let Some(deep_best) = deepen(&mut search, &candidates, snapshot)
    {
        best = Some(deep_best);
        lookahead_completed = true;
    }

    let stats = search.stats(lookahead_completed);
    let Some(best) = best else {
        return Plan {
            stats,
            ..Plan::default()
        };
    };
    let candidate = candidates.swap_remove(best);
    Plan {
        actions: candidate.actions,
        target: Some(candidate.placement),
        score: candidate.score,
        stats,
    }
}

/// Returns the index of the first maximum.
fn best_index(scores: impl Iterator<Item = f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, score) in scores.enumerate() {
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

/// Lifts a colliding start position by up to [`SPAWN_NUDGE_ROWS`] rows.
fn nudge_start(piece: Piece, board: &Board) -> Option<Piece> {
    (0..=SPAWN_NUDGE_ROWS)
        .map(|lift| piece.translated(0, -lift))
        .find(|lifted| !board.is_colliding(lifted))
}

fn enumerate_placements(
    search: &mut Search<'_>,
    start: Piece,
    board: &Board,
    prefix: &[Action],
    out: &mut Vec<Candidate>,
) {
    let mut seen_signatures = ArrayVec::<PieceMask, 4>::new();
    let mut rotated = Some(start);
    for turns in 0..4 {
        if turns > 0 {
            rotated = rotated.and_then(|piece| {
                let next = attempt_rotate(piece, board, RotationDirection::Clockwise);
                (next != piece).then_some(next)
            });
        }
        let Some(piece) = rotated else {
            return;
        };
        let signature = piece.kind().shape_signature(piece.rotation());
        if seen_signatures.contains(&signature) {
            continue;
        }
        seen_signatures.push(signature);

        let x0 = piece.position().x();
        for target_x in -COLUMN_MARGIN..=board_width() {
            let dx = target_x - x0;
            let Some(moved) = shift(piece, board, dx) else {
                continue;
            };
            let landed = drop_to_rest(moved, board);
            if landed.occupied_positions().any(|(_, y)| y < 0) {
                continue;
            }
            if search.should_stop() {
                return;
            }
            let analysis = PlacementAnalysis::from_board(board, landed);
            let score = search.evaluate(&analysis);

            let direction = if dx < 0 { Direction::Left } else { Direction::Right };
            let actions = prefix
                .iter()
                .copied()
                .chain((0..turns).map(|_| Action::Rotate(RotationDirection::Clockwise)))
                .chain((0..dx.unsigned_abs()).map(|_| Action::Move(direction)))
                .chain([Action::HardDrop])
                .collect();
            out.push(Candidate {
                actions,
                uses_hold: prefix.contains(&Action::Hold),
                placement: landed,
                board: analysis.board().clone(),
                score,
            });
        }
    }
}

fn board_width() -> i32 {
    i32::try_from(Board::WIDTH).unwrap_or(i32::MAX)
}

/// Replays `|dx|` single-column moves; `None` if any step is rejected.
fn shift(piece: Piece, board: &Board, dx: i32) -> Option<Piece> {
    let step = dx.signum();
    let mut moved = piece;
    for _ in 0..dx.unsigned_abs() {
        let next = attempt_translate(moved, board, step, 0);
        if next == moved {
            return None;
        }
        moved = next;
    }
    Some(moved)
}

/// Re-ranks the best shallow candidates with lookahead.
///
/// Returns `None` if the budget ran out before every branch was searched.
fn deepen(
    search: &mut Search<'_>,
    candidates: &[Candidate],
    snapshot: &PlannerSnapshot,
) -> Option<usize> {
    let mut ranked: Vec<usize> = (0..candidates.len()).collect();
    ranked.sort_by(|a, b| candidates[*b].score.total_cmp(&candidates[*a].score));
    ranked.truncate(LOOKAHEAD_WIDTH);

    let depth = search.policy.search_depth - 1;
    let mut totals = Vec::with_capacity(ranked.len());
    for &i in &ranked {
        let candidate = &candidates[i];
        let queue = if candidate.uses_hold && snapshot.hold.is_none() {
            snapshot.next.get(1..).unwrap_or(&[])
        } else {
            &snapshot.next[..]
        };
        let future = best_future(search, &candidate.board, queue, depth)?;
        totals.push(candidate.score + future);
    }
    best_index(totals.into_iter()).map(|best| ranked[best])
}

/// Best total score of placing `queue[..depth]` in order on `board`.
fn best_future(
    search: &mut Search<'_>,
    board: &Board,
    queue: &[PieceKind],
    depth: usize,
) -> Option<f32> {
    let Some((&kind, rest)) = queue.split_first() else {
        return Some(0.0);
    };
    if depth == 0 {
        return Some(0.0);
    }
    let Some(start) = nudge_start(Piece::new(kind), board) else {
        return Some(-TOP_OUT_PENALTY);
    };

    let mut children = Vec::new();
    enumerate_placements(search, start, board, &[], &mut children);
    if search.exhausted {
        return None;
    }
    if children.is_empty() {
        return Some(-TOP_OUT_PENALTY);
    }
    if depth == 1 || rest.is_empty() {
        return children.iter().map(|c| c.score).reduce(f32::max);
    }

    children.sort_by(|a, b| b.score.total_cmp(&a.score));
    children.truncate(LOOKAHEAD_WIDTH);
    let mut best = f32::NEG_INFINITY;
    for child in &children {
        best = best.max(child.score + best_future(search, &child.board, rest, depth - 1)?);
    }
    Some(best)
}
