use std::path::PathBuf;

use clap::{Parser, Subcommand};
use spinstack_evaluator::{Difficulty, Personality, Policy};

use crate::util;

use self::{auto_play::AutoPlayArg, policy::PolicyCommandArg, versus::VersusArg};

mod auto_play;
mod policy;
mod versus;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Let the AI play one game
    AutoPlay(#[clap(flatten)] AutoPlayArg),
    /// Run AI versus AI matches with garbage exchange
    Versus(#[clap(flatten)] VersusArg),
    /// Print the merged policy as JSON
    Policy(#[clap(flatten)] PolicyCommandArg),
}

/// Policy selection shared by the single-player commands.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PolicyArg {
    /// Difficulty preset (easy, normal, hard)
    #[arg(long, default_value = "normal")]
    difficulty: Difficulty,
    /// Personality adjustment (lazy, balanced, aggressive)
    #[arg(long, default_value = "balanced")]
    personality: Personality,
    /// Policy JSON file; overrides difficulty and personality
    #[arg(long)]
    policy: Option<PathBuf>,
}

impl PolicyArg {
    fn load(&self) -> anyhow::Result<Policy> {
        util::load_policy(self.policy.as_deref(), self.difficulty, self.personality)
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::AutoPlay(arg) => auto_play::run(&arg)?,
        Mode::Versus(arg) => versus::run(&arg)?,
        Mode::Policy(arg) => policy::run(&arg)?,
    }
    Ok(())
}
