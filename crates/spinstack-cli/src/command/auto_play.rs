use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use spinstack_engine::{GameSession, PieceSeed};
use spinstack_evaluator::Policy;
use spinstack_match::Orchestrator;

use crate::{command::PolicyArg, util::Output};

const PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AutoPlayArg {
    #[clap(flatten)]
    policy: PolicyArg,
    /// Piece sequence seed (32 hex digits); random if omitted
    #[arg(long)]
    seed: Option<PieceSeed>,
    /// Stop after this many pieces
    #[arg(long, default_value_t = 1000)]
    max_pieces: usize,
    /// Frames per second of the game clock
    #[arg(long, default_value_t = 60)]
    fps: u64,
    /// Run at wall-clock speed instead of as fast as possible
    #[arg(long, default_value_t = false)]
    realtime: bool,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
enum GameEnd {
    TopOut { reason: String },
    NoLegalPlacement,
    PieceLimit,
}

#[derive(Debug, Clone, Serialize)]
struct AutoPlaySummary {
    played_at: DateTime<Utc>,
    seed: PieceSeed,
    policy: Policy,
    end: GameEnd,
    score: u64,
    level: usize,
    completed_pieces: usize,
    total_cleared_lines: usize,
    line_clears: [usize; 5],
    special_clears: usize,
    max_combo: usize,
    actions: usize,
    plans: usize,
    game_seconds: f64,
}

pub(crate) fn run(arg: &AutoPlayArg) -> anyhow::Result<()> {
    let AutoPlayArg {
        policy,
        seed,
        max_pieces,
        fps,
        realtime,
        output,
    } = arg;
    let policy = policy.load()?;
    let seed = seed.unwrap_or_else(rand::random);
    let fps = (*fps).max(1);
    let frame = Duration::from_nanos(1_000_000_000 / fps);

    eprintln!("Auto play with seed {seed}");
    let mut session = GameSession::with_seed(fps, seed);
    let mut orchestrator = Orchestrator::new(policy);
    let mut now = Instant::now();
    orchestrator.start(now);

    let mut last_reported = 0;
    let end = loop {
        if let Some(reason) = session.game_over_reason() {
            break GameEnd::TopOut {
                reason: reason.to_string(),
            };
        }
        if orchestrator.state().is_stopped() {
            break GameEnd::NoLegalPlacement;
        }
        let pieces = session.scores().completed_pieces();
        if pieces >= *max_pieces {
            break GameEnd::PieceLimit;
        }
        if pieces >= last_reported + PROGRESS_INTERVAL {
            last_reported = pieces;
            let scores = session.scores();
            eprintln!(
                "  Piece #{pieces}: score {}, lines {}, level {}, {} APM",
                scores.score(),
                scores.total_cleared_lines(),
                scores.level(),
                orchestrator.actions_per_minute(now),
            );
        }

        session.increment_frame();
        orchestrator.poll(now, &mut session);

        if *realtime {
            thread::sleep(frame);
            now = Instant::now();
        } else {
            now += frame;
        }
    };
    orchestrator.stop();

    let scores = session.scores();
    let summary = AutoPlaySummary {
        played_at: Utc::now(),
        seed,
        policy,
        end,
        score: scores.score(),
        level: scores.level(),
        completed_pieces: scores.completed_pieces(),
        total_cleared_lines: scores.total_cleared_lines(),
        line_clears: *scores.line_cleared_counter(),
        special_clears: scores.special_clears(),
        max_combo: scores.max_combo(),
        actions: orchestrator.total_actions(),
        plans: orchestrator.plans_made(),
        game_seconds: session.duration().as_secs_f64(),
    };

    eprintln!();
    eprintln!("Game finished: {:?}", summary.end);
    eprintln!("  Score: {}", summary.score);
    eprintln!("  Lines: {}", summary.total_cleared_lines);
    eprintln!("  Pieces: {}", summary.completed_pieces);
    eprintln!("  Game time: {:.1}s", summary.game_seconds);

    Output::save_json(&summary, output.clone())
}
