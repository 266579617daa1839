//! `decide`: command line front end for the decision engine.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use hitl_agents::telemetry::init_tracing;

use crate::cli::{Cli, Command};
use crate::commands::Runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = Runtime::load(&cli)?;
    init_tracing(&runtime.config().telemetry)?;

    match &cli.command {
        Command::Decide(args) => commands::decide(&runtime, args).await,
        Command::Batch(args) => commands::batch(&runtime, args).await,
        Command::KillSwitch { action } => commands::kill_switch(&runtime, action),
        Command::Feedback(args) => commands::feedback(&runtime, args).await,
        Command::FeedbackStats { last } => commands::feedback_stats(&runtime, *last).await,
        Command::Policies { action } => commands::policies(action),
    }
}
