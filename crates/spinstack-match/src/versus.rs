//! Two AI-driven games exchanging garbage rows.

use std::time::Instant;

use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use spinstack_evaluator::Policy;

use crate::{
    game_control::GameControl,
    orchestrator::{Orchestrator, TickReport},
};

/// Garbage rows sent for clearing 2, 3 and 4 rows at once.
pub const GARBAGE_TABLE: [usize; 3] = [1, 2, 4];

/// Base garbage rows for a lock that cleared `rows_cleared` rows.
#[must_use]
pub fn garbage_for_clear(rows_cleared: usize) -> usize {
    match rows_cleared {
        0 | 1 => 0,
        2 => GARBAGE_TABLE[0],
        3 => GARBAGE_TABLE[1],
        _ => GARBAGE_TABLE[2],
    }
}

/// Scales garbage by the sender's factor.
///
/// The scaled value is floored, but a value that rounds to at least one row
/// always sends one.
///
/// ```
/// use spinstack_match::scale_garbage;
///
/// assert_eq!(scale_garbage(4, 1.0), 4);
/// assert_eq!(scale_garbage(1, 0.5), 1);
/// assert_eq!(scale_garbage(2, 0.7), 1);
/// assert_eq!(scale_garbage(1, 0.4), 0);
/// ```
#[must_use]
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scale_garbage(rows: usize, factor: f32) -> usize {
    let scaled = f32::from(u16::try_from(rows).unwrap_or(u16::MAX)) * factor;
    if scaled.round() >= 1.0 {
        (scaled.floor() as usize).max(1)
    } else {
        0
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
pub enum Seat {
    Left,
    Right,
}

impl Seat {
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Seat::Left => Seat::Right,
            Seat::Right => Seat::Left,
        }
    }

    const fn index(self) -> usize {
        match self {
            Seat::Left => 0,
            Seat::Right => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Winner(Seat),
    Draw,
}

#[derive(Debug, Clone)]
pub struct Side<G> {
    game: G,
    orchestrator: Orchestrator,
    previous_histogram: [usize; 5],
    garbage_sent: usize,
    garbage_received: usize,
}

impl<G> Side<G>
where
    G: GameControl,
{
    fn new(game: G, policy: Policy) -> Self {
        let previous_histogram = game.observe().clear_histogram;
        Self {
            game,
            orchestrator: Orchestrator::new(policy),
            previous_histogram,
            garbage_sent: 0,
            garbage_received: 0,
        }
    }

    #[must_use]
    pub fn game(&self) -> &G {
        &self.game
    }

    /// Mutable access for the host, e.g. to advance gravity.
    pub fn game_mut(&mut self) -> &mut G {
        &mut self.game
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn garbage_sent(&self) -> usize {
        self.garbage_sent
    }

    #[must_use]
    pub fn garbage_received(&self) -> usize {
        self.garbage_received
    }

    /// Whether this side can no longer play.
    ///
    /// A side whose planner found no legal placement is out as well.
    #[must_use]
    pub fn is_out(&self) -> bool {
        self.game.observe().game_over || self.orchestrator.state().is_stopped()
    }

    /// Garbage earned by clears since the previous call.
    fn take_outgoing_garbage(&mut self) -> usize {
        let histogram = self.game.observe().clear_histogram;
        let factor = self.orchestrator.policy().garbage_factor;
        let mut outgoing = 0;
        for rows in 2..histogram.len() {
            let new_clears = histogram[rows].saturating_sub(self.previous_histogram[rows]);
            outgoing += new_clears * scale_garbage(garbage_for_clear(rows), factor);
        }
        self.previous_histogram = histogram;
        outgoing
    }
}

/// Two locally simulated games, each driven by its own orchestrator.
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
///
/// use spinstack_engine::{GameSession, PieceSeed};
/// use spinstack_evaluator::Policy;
/// use spinstack_match::VersusMatch;
///
/// let seed = PieceSeed::from_bytes([1; 16]);
/// let mut versus = VersusMatch::new(
///     (GameSession::with_seed(60, seed), Policy::default()),
///     (GameSession::with_seed(60, seed), Policy::default()),
///     42,
/// );
/// let mut now = Instant::now();
/// versus.start(now);
/// for _ in 0..50 {
///     versus.poll(now);
///     now += Duration::from_millis(50);
/// }
/// assert!(versus.outcome().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct VersusMatch<G> {
    sides: [Side<G>; 2],
    rng: Pcg32,
}

impl<G> VersusMatch<G>
where
    G: GameControl,
{
    /// Creates a match; `garbage_seed` drives the empty column of garbage rows.
    #[must_use]
    pub fn new(left: (G, Policy), right: (G, Policy), garbage_seed: u64) -> Self {
        Self {
            sides: [Side::new(left.0, left.1), Side::new(right.0, right.1)],
            rng: Pcg32::seed_from_u64(garbage_seed),
        }
    }

    #[must_use]
    pub fn side(&self, seat: Seat) -> &Side<G> {
        &self.sides[seat.index()]
    }

    pub fn side_mut(&mut self, seat: Seat) -> &mut Side<G> {
        &mut self.sides[seat.index()]
    }

    pub fn start(&mut self, now: Instant) {
        for side in &mut self.sides {
            side.orchestrator.start(now);
        }
    }

    pub fn stop(&mut self) {
        for side in &mut self.sides {
            side.orchestrator.stop();
        }
    }

    /// Polls both orchestrators, then delivers garbage for new clears.
    ///
    /// Returns the tick report of each side that ticked.
    pub fn poll(&mut self, now: Instant) -> [Option<TickReport>; 2] {
        let reports = [
            self.sides[0].orchestrator.poll(now, &mut self.sides[0].game),
            self.sides[1].orchestrator.poll(now, &mut self.sides[1].game),
        ];
        self.exchange_garbage();
        reports
    }

    /// Compares each side's clear histogram with the previous one and sends
    /// the resulting garbage to the opponent.
    ///
    /// Returns the rows sent by each side.
    pub fn exchange_garbage(&mut self) -> [usize; 2] {
        let outgoing = [
            self.sides[0].take_outgoing_garbage(),
            self.sides[1].take_outgoing_garbage(),
        ];
        for seat in Seat::ALL {
            let rows = outgoing[seat.index()];
            if rows == 0 {
                continue;
            }
            self.sides[seat.index()].garbage_sent += rows;
            let target = &mut self.sides[seat.opponent().index()];
            target.garbage_received += rows;
            target.game.inject_garbage(rows, &mut self.rng);
        }
        outgoing
    }

    /// `None` while both sides can still play.
    #[must_use]
    pub fn outcome(&self) -> Option<MatchOutcome> {
        match (self.sides[0].is_out(), self.sides[1].is_out()) {
            (false, false) => None,
            (true, true) => Some(MatchOutcome::Draw),
            (false, true) => Some(MatchOutcome::Winner(Seat::Left)),
            (true, false) => Some(MatchOutcome::Winner(Seat::Right)),
        }
    }
}
