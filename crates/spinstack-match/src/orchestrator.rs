//! Paced AI driver for one game.
//!
//! The [`Orchestrator`] is polled by its host with the current time. On every
//! due tick it observes the game, replans when the situation changed, and
//! dispatches up to [`MAX_ACTIONS_PER_TICK`] queued actions through the
//! game's mutation API. The next tick is due `action_pace_ms` after the
//! current one.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//!
//! use spinstack_engine::{GameSession, PieceSeed};
//! use spinstack_evaluator::Policy;
//! use spinstack_match::Orchestrator;
//!
//! let mut game = GameSession::with_seed(60, PieceSeed::from_bytes([7; 16]));
//! let mut orchestrator = Orchestrator::new(Policy::default());
//!
//! let start = Instant::now();
//! orchestrator.start(start);
//! let mut now = start;
//! for _ in 0..100 {
//!     orchestrator.poll(now, &mut game);
//!     now += Duration::from_millis(orchestrator.policy().action_pace_ms);
//! }
//! assert!(game.scores().completed_pieces() > 0);
//! ```

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use arrayvec::ArrayVec;
use spinstack_engine::{Action, ActionError, Board, LockResult, PieceKind};
use spinstack_evaluator::{PlanStats, Policy, plan};

use crate::game_control::{GameControl, GameSnapshot};

/// Actions dispatched per tick at most.
pub const MAX_ACTIONS_PER_TICK: usize = 2;

const KEY_NEXT_PIECES: usize = 2;
const KEY_BOTTOM_ROWS: usize = 4;
const APM_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum OrchestratorState {
    #[default]
    Idle,
    Running,
    /// The planner found no legal placement.
    Stopped,
}

/// Identifies the situation a plan was made for.
///
/// The vertical position of the falling piece is not part of the key, so
/// gravity alone never triggers a replan.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlanKey {
    kind: PieceKind,
    hold: Option<PieceKind>,
    hold_available: bool,
    next: ArrayVec<PieceKind, KEY_NEXT_PIECES>,
    bottom_rows: [u16; KEY_BOTTOM_ROWS],
}

impl PlanKey {
    fn new(snapshot: &GameSnapshot) -> Self {
        let mut bottom_rows = [0; KEY_BOTTOM_ROWS];
        for (i, row) in bottom_rows.iter_mut().enumerate() {
            *row = snapshot.board.row(Board::HEIGHT - KEY_BOTTOM_ROWS + i).mask();
        }
        Self {
            kind: snapshot.active.kind(),
            hold: snapshot.hold,
            hold_available: snapshot.hold_available,
            next: snapshot.next.iter().copied().take(KEY_NEXT_PIECES).collect(),
            bottom_rows,
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Set when the game was paused or over and nothing was done.
    pub skipped: bool,
    /// Statistics of the plan made during this tick, if any.
    pub plan_stats: Option<PlanStats>,
    pub dispatched: ArrayVec<Action, MAX_ACTIONS_PER_TICK>,
    pub lock: Option<LockResult>,
    pub rejected: Option<ActionError>,
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    policy: Policy,
    state: OrchestratorState,
    next_tick_at: Option<Instant>,
    queue: VecDeque<Action>,
    plan_key: Option<PlanKey>,
    recent_actions: VecDeque<Instant>,
    total_actions: usize,
    plans_made: usize,
}

impl Orchestrator {
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            state: OrchestratorState::Idle,
            next_tick_at: None,
            queue: VecDeque::new(),
            plan_key: None,
            recent_actions: VecDeque::new(),
            total_actions: 0,
            plans_made: 0,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    #[must_use]
    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    #[must_use]
    pub fn next_tick_at(&self) -> Option<Instant> {
        self.next_tick_at
    }

    /// Actions still queued from the current plan.
    #[must_use]
    pub fn pending_actions(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn total_actions(&self) -> usize {
        self.total_actions
    }

    #[must_use]
    pub fn plans_made(&self) -> usize {
        self.plans_made
    }

    /// Actions dispatched during the minute before `now`.
    #[must_use]
    pub fn actions_per_minute(&self, now: Instant) -> usize {
        self.recent_actions
            .iter()
            .filter(|at| now.saturating_duration_since(**at) < APM_WINDOW)
            .count()
    }

    /// Starts ticking; the first tick is due at `now`.
    ///
    /// Does nothing unless idle.
    pub fn start(&mut self, now: Instant) {
        if !self.state.is_idle() {
            return;
        }
        self.state = OrchestratorState::Running;
        self.next_tick_at = Some(now);
    }

    /// Cancels the pending tick and the current plan and returns to idle.
    pub fn stop(&mut self) {
        self.state = OrchestratorState::Idle;
        self.next_tick_at = None;
        self.discard_plan();
    }

    /// Runs the tick if one is due at `now`.
    pub fn poll<G>(&mut self, now: Instant, game: &mut G) -> Option<TickReport>
    where
        G: GameControl,
    {
        if !self.state.is_running() {
            return None;
        }
        let due = self.next_tick_at?;
        if now < due {
            return None;
        }
        let report = self.tick(now, game);
        self.next_tick_at = self
            .state
            .is_running()
            .then(|| now + Duration::from_millis(self.policy.action_pace_ms));
        Some(report)
    }

    fn tick<G>(&mut self, now: Instant, game: &mut G) -> TickReport
    where
        G: GameControl,
    {
        let mut report = TickReport::default();
        let snapshot = game.observe();
        if snapshot.game_over || snapshot.paused {
            report.skipped = true;
            return report;
        }

        let key = PlanKey::new(&snapshot);
        if self.queue.is_empty() || self.plan_key.as_ref() != Some(&key) {
            let plan = plan(&snapshot.planner_snapshot(), &snapshot.board, &self.policy);
            self.plans_made += 1;
            report.plan_stats = Some(*plan.stats());
            if plan.is_empty() {
                self.state = OrchestratorState::Stopped;
                self.discard_plan();
                return report;
            }
            self.queue = plan.into_actions().into();
            self.plan_key = Some(key);
        }

        while report.dispatched.len() < MAX_ACTIONS_PER_TICK {
            let Some(action) = self.queue.pop_front() else {
                break;
            };
            match game.dispatch(action) {
                Ok(lock) => {
                    self.record_action(now);
                    report.dispatched.push(action);
                    if lock.is_some() {
                        report.lock = lock;
                        break;
                    }
                }
                Err(err) => {
                    report.rejected = Some(err);
                    self.discard_plan();
                    break;
                }
            }
        }
        report
    }

    fn record_action(&mut self, now: Instant) {
        self.total_actions += 1;
        self.recent_actions.push_back(now);
        while self
            .recent_actions
            .front()
            .is_some_and(|at| now.saturating_duration_since(*at) >= APM_WINDOW)
        {
            self.recent_actions.pop_front();
        }
    }

    fn discard_plan(&mut self) {
        self.queue.clear();
        self.plan_key = None;
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use spinstack_engine::{
        Direction, GameSession, GameState, LockResult, PieceSeed, RotationDirection,
    };

    use super::*;

    const SEED: PieceSeed = PieceSeed::from_bytes([5; 16]);

    fn pace(orchestrator: &Orchestrator) -> Duration {
        Duration::from_millis(orchestrator.policy().action_pace_ms)
    }

    #[test]
    fn test_start_and_stop() {
        let mut game = GameSession::with_seed(60, SEED);
        let mut orchestrator = Orchestrator::new(Policy::default());
        let now = Instant::now();
        assert!(orchestrator.poll(now, &mut game).is_none());

        orchestrator.start(now);
        assert!(orchestrator.state().is_running());
        assert_eq!(orchestrator.next_tick_at(), Some(now));

        // re-entrant start keeps the schedule
        orchestrator.start(now + Duration::from_secs(5));
        assert_eq!(orchestrator.next_tick_at(), Some(now));

        orchestrator.stop();
        assert!(orchestrator.state().is_idle());
        assert_eq!(orchestrator.next_tick_at(), None);
        assert!(orchestrator.poll(now, &mut game).is_none());
        orchestrator.stop();
        assert!(orchestrator.state().is_idle());
    }

    #[test]
    fn test_tick_is_paced() {
        let mut game = GameSession::with_seed(60, SEED);
        let mut orchestrator = Orchestrator::new(Policy::default());
        let now = Instant::now();
        orchestrator.start(now);

        let report = orchestrator.poll(now, &mut game).unwrap();
        assert!(report.plan_stats.is_some());
        assert!(!report.dispatched.is_empty());
        assert!(report.dispatched.len() <= MAX_ACTIONS_PER_TICK);
        assert_eq!(orchestrator.next_tick_at(), Some(now + pace(&orchestrator)));

        let early = now + pace(&orchestrator) - Duration::from_millis(1);
        assert!(orchestrator.poll(early, &mut game).is_none());
        assert!(orchestrator.poll(now + pace(&orchestrator), &mut game).is_some());
    }

    #[test]
    fn test_plan_reused_until_drained() {
        let mut game = GameSession::with_seed(60, SEED);
        let mut orchestrator = Orchestrator::new(Policy::default());
        let mut now = Instant::now();
        orchestrator.start(now);

        let first = orchestrator.poll(now, &mut game).unwrap();
        assert!(first.plan_stats.is_some());
        let mut reports = vec![first];
        while reports.last().is_some_and(|r| r.lock.is_none()) {
            now += pace(&orchestrator);
            reports.push(orchestrator.poll(now, &mut game).unwrap());
        }
        // holding changes the active piece and forces one replan
        let expected_plans = if reports[0].dispatched.first() == Some(&Action::Hold) {
            2
        } else {
            1
        };
        assert_eq!(orchestrator.plans_made(), expected_plans, "{reports:?}");
        assert_eq!(game.scores().completed_pieces(), 1);
        assert_eq!(
            reports.last().and_then(|r| r.dispatched.last()),
            Some(&Action::HardDrop)
        );
        assert_eq!(orchestrator.pending_actions(), 0);
    }

    #[test]
    fn test_skips_paused_game() {
        let mut game = GameSession::with_seed(60, SEED);
        game.toggle_pause();
        let mut orchestrator = Orchestrator::new(Policy::default());
        let now = Instant::now();
        orchestrator.start(now);

        let report = orchestrator.poll(now, &mut game).unwrap();
        assert!(report.skipped);
        assert!(report.dispatched.is_empty());
        assert!(orchestrator.state().is_running());
        assert!(orchestrator.next_tick_at().is_some());
    }

    #[test]
    fn test_no_legal_placement_stops() {
        let mut art = String::new();
        for _ in 0..10 {
            art.push_str("#.#.#.#.#.\n.#.#.#.#.#\n");
        }
        let state = GameState::with_board(Board::from_ascii(&art), SEED);
        let mut game = GameSession::from_state(60, state);
        let mut orchestrator = Orchestrator::new(Policy::default());
        let now = Instant::now();
        orchestrator.start(now);

        let report = orchestrator.poll(now, &mut game).unwrap();
        assert!(report.dispatched.is_empty());
        assert!(orchestrator.state().is_stopped());
        assert_eq!(orchestrator.next_tick_at(), None);

        // only stop leaves the stopped state
        orchestrator.start(now);
        assert!(orchestrator.state().is_stopped());
        orchestrator.stop();
        assert!(orchestrator.state().is_idle());
    }

    /// Game that rejects every move.
    struct StuckGame(GameSession);

    impl GameControl for StuckGame {
        fn observe(&self) -> GameSnapshot {
            self.0.observe()
        }
        fn move_piece(&mut self, _direction: Direction) -> Result<(), ActionError> {
            Err(ActionError::NotPlaying)
        }
        fn rotate_piece(&mut self) -> Result<(), ActionError> {
            Err(ActionError::NotPlaying)
        }
        fn rotate_piece_left(&mut self) -> Result<(), ActionError> {
            Err(ActionError::NotPlaying)
        }
        fn hard_drop(&mut self) -> Result<LockResult, ActionError> {
            Err(ActionError::NotPlaying)
        }
        fn hold_piece(&mut self) -> Result<(), ActionError> {
            Err(ActionError::NotPlaying)
        }
        fn inject_garbage<R>(&mut self, count: usize, rng: &mut R)
        where
            R: Rng + ?Sized,
        {
            self.0.inject_garbage(count, rng);
        }
    }

    #[test]
    fn test_rejected_action_drops_plan() {
        let mut game = StuckGame(GameSession::with_seed(60, SEED));
        let mut orchestrator = Orchestrator::new(Policy::default());
        let now = Instant::now();
        orchestrator.start(now);

        let report = orchestrator.poll(now, &mut game).unwrap();
        assert_eq!(report.rejected, Some(ActionError::NotPlaying));
        assert!(report.dispatched.is_empty());
        assert_eq!(orchestrator.pending_actions(), 0);

        let report = orchestrator
            .poll(now + pace(&orchestrator), &mut game)
            .unwrap();
        assert!(report.plan_stats.is_some());
        assert_eq!(orchestrator.plans_made(), 2);
    }

    #[test]
    fn test_actions_per_minute_window() {
        let mut game = GameSession::with_seed(60, SEED);
        let mut orchestrator = Orchestrator::new(Policy::default());
        let start = Instant::now();
        orchestrator.start(start);
        let mut now = start;
        for _ in 0..10 {
            orchestrator.poll(now, &mut game);
            now += pace(&orchestrator);
        }
        let total = orchestrator.total_actions();
        assert!(total > 0);
        assert_eq!(orchestrator.actions_per_minute(now), total);
        assert_eq!(orchestrator.actions_per_minute(now + APM_WINDOW * 2), 0);
    }

    #[test]
    fn test_counter_clockwise_dispatch_reaches_game() {
        let mut game = GameSession::with_seed(60, SEED);
        let before = game.falling_piece().rotation();
        game.dispatch(Action::Rotate(RotationDirection::CounterClockwise))
            .unwrap();
        assert_eq!(game.falling_piece().rotation(), before.rotated_left());
    }
}
