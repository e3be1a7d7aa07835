use std::{
    path::PathBuf,
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::Serialize;
use spinstack_engine::{GameSession, PieceSeed};
use spinstack_evaluator::{Difficulty, Personality, Policy};
use spinstack_match::{MatchOutcome, Seat, VersusMatch};

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct VersusArg {
    /// Difficulty preset of the left side
    #[arg(long, default_value = "normal")]
    left_difficulty: Difficulty,
    /// Personality of the left side
    #[arg(long, default_value = "balanced")]
    left_personality: Personality,
    /// Policy JSON file of the left side
    #[arg(long)]
    left_policy: Option<PathBuf>,
    /// Difficulty preset of the right side
    #[arg(long, default_value = "normal")]
    right_difficulty: Difficulty,
    /// Personality of the right side
    #[arg(long, default_value = "balanced")]
    right_personality: Personality,
    /// Policy JSON file of the right side
    #[arg(long)]
    right_policy: Option<PathBuf>,
    /// Number of matches, each played on its own thread
    #[arg(long, default_value_t = 1)]
    rounds: usize,
    /// Seed for piece sequences and garbage holes; random if omitted
    #[arg(long)]
    seed: Option<u64>,
    /// A round with this many pieces on both sides ends undecided
    #[arg(long, default_value_t = 2000)]
    max_pieces: usize,
    /// Frames per second of the game clock
    #[arg(long, default_value_t = 60)]
    fps: u64,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
struct RoundConfig {
    round: usize,
    piece_seed: PieceSeed,
    garbage_seed: u64,
    policies: [Policy; 2],
    max_pieces: usize,
    fps: u64,
}

#[derive(Debug, Clone, Serialize)]
struct SideSummary {
    score: u64,
    total_cleared_lines: usize,
    completed_pieces: usize,
    line_clears: [usize; 5],
    garbage_sent: usize,
    garbage_received: usize,
    actions: usize,
}

#[derive(Debug, Clone, Serialize)]
struct RoundSummary {
    round: usize,
    piece_seed: PieceSeed,
    /// `None` when the piece limit was reached first.
    outcome: Option<MatchOutcome>,
    left: SideSummary,
    right: SideSummary,
}

#[derive(Debug, Clone, Serialize)]
struct VersusReport {
    played_at: DateTime<Utc>,
    seed: u64,
    left_policy: Policy,
    right_policy: Policy,
    left_wins: usize,
    right_wins: usize,
    draws: usize,
    undecided: usize,
    rounds: Vec<RoundSummary>,
}

pub(crate) fn run(arg: &VersusArg) -> anyhow::Result<()> {
    let left_policy = util::load_policy(
        arg.left_policy.as_deref(),
        arg.left_difficulty,
        arg.left_personality,
    )
    .context("Left side")?;
    let right_policy = util::load_policy(
        arg.right_policy.as_deref(),
        arg.right_difficulty,
        arg.right_personality,
    )
    .context("Right side")?;
    let seed = arg.seed.unwrap_or_else(rand::random);
    let mut rng = Pcg32::seed_from_u64(seed);

    eprintln!("Running {} versus round(s) with seed {seed}", arg.rounds);
    let (tx, rx) = mpsc::channel();
    for round in 0..arg.rounds {
        let config = RoundConfig {
            round,
            piece_seed: rng.random(),
            garbage_seed: rng.random(),
            policies: [left_policy, right_policy],
            max_pieces: arg.max_pieces,
            fps: arg.fps.max(1),
        };
        let tx = tx.clone();
        thread::spawn(move || {
            // the receiver outlives every worker
            let _ = tx.send(play_round(&config));
        });
    }
    drop(tx);

    let mut rounds = Vec::with_capacity(arg.rounds);
    for summary in rx {
        eprintln!(
            "  Round #{}: {} ({} vs {} lines)",
            summary.round,
            describe_outcome(summary.outcome),
            summary.left.total_cleared_lines,
            summary.right.total_cleared_lines,
        );
        rounds.push(summary);
    }
    anyhow::ensure!(
        rounds.len() == arg.rounds,
        "{} round(s) did not finish",
        arg.rounds - rounds.len()
    );
    rounds.sort_by_key(|summary| summary.round);

    let count = |expected: Option<MatchOutcome>| {
        rounds
            .iter()
            .filter(|summary| summary.outcome == expected)
            .count()
    };
    let report = VersusReport {
        played_at: Utc::now(),
        seed,
        left_policy,
        right_policy,
        left_wins: count(Some(MatchOutcome::Winner(Seat::Left))),
        right_wins: count(Some(MatchOutcome::Winner(Seat::Right))),
        draws: count(Some(MatchOutcome::Draw)),
        undecided: count(None),
        rounds,
    };

    eprintln!();
    eprintln!("Versus finished");
    eprintln!("  Left wins:  {}", report.left_wins);
    eprintln!("  Right wins: {}", report.right_wins);
    eprintln!("  Draws:      {}", report.draws);
    eprintln!("  Undecided:  {}", report.undecided);

    Output::save_json(&report, arg.output.clone())
}

fn describe_outcome(outcome: Option<MatchOutcome>) -> String {
    match outcome {
        Some(MatchOutcome::Winner(seat)) => format!("{seat} wins"),
        Some(MatchOutcome::Draw) => "draw".to_owned(),
        None => "undecided".to_owned(),
    }
}

fn play_round(config: &RoundConfig) -> RoundSummary {
    let [left_policy, right_policy] = config.policies;
    let mut versus = VersusMatch::new(
        (GameSession::with_seed(config.fps, config.piece_seed), left_policy),
        (GameSession::with_seed(config.fps, config.piece_seed), right_policy),
        config.garbage_seed,
    );
    let frame = Duration::from_nanos(1_000_000_000 / config.fps);
    let mut now = Instant::now();
    versus.start(now);

    let outcome = loop {
        if let Some(outcome) = versus.outcome() {
            break Some(outcome);
        }
        let limit_reached = Seat::ALL.iter().all(|seat| {
            versus.side(*seat).game().scores().completed_pieces() >= config.max_pieces
        });
        if limit_reached {
            break None;
        }
        for seat in Seat::ALL {
            versus.side_mut(seat).game_mut().increment_frame();
        }
        versus.poll(now);
        now += frame;
    };
    versus.stop();

    let summarize = |seat: Seat| {
        let side = versus.side(seat);
        let scores = side.game().scores();
        SideSummary {
            score: scores.score(),
            total_cleared_lines: scores.total_cleared_lines(),
            completed_pieces: scores.completed_pieces(),
            line_clears: *scores.line_cleared_counter(),
            garbage_sent: side.garbage_sent(),
            garbage_received: side.garbage_received(),
            actions: side.orchestrator().total_actions(),
        }
    };
    RoundSummary {
        round: config.round,
        piece_seed: config.piece_seed,
        outcome,
        left: summarize(Seat::Left),
        right: summarize(Seat::Right),
    }
}
