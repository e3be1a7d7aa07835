use std::path::PathBuf;

use crate::{command::PolicyArg, util::Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PolicyCommandArg {
    #[clap(flatten)]
    policy: PolicyArg,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &PolicyCommandArg) -> anyhow::Result<()> {
    let PolicyCommandArg { policy, output } = arg;
    let policy = policy.load()?;

    eprintln!("Policy:");
    eprintln!("  Search depth: {}", policy.search_depth);
    eprintln!(
        "  Budget: {} nodes / {} ms",
        policy.node_budget, policy.time_budget_ms
    );
    eprintln!("  Action pace: {} ms", policy.action_pace_ms);
    eprintln!("  Garbage factor: {:.2}", policy.garbage_factor);
    eprintln!("  Weights:");
    for (name, value) in policy.weights.entries() {
        eprintln!("    {name:<20} {value:.3}");
    }

    Output::save_json(&policy, output.clone())
}
