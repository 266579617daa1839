//! Command line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use hitl_agents::journal::FeedbackOutcome;

/// Score signals, route them through agent policies, and record what humans
/// did with the result.
#[derive(Debug, Parser)]
#[command(name = "decide", version, about)]
pub struct Cli {
    /// Runtime configuration file (JSON).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Policy file; overrides the configured one. Built-in policies are used
    /// when neither is given.
    #[arg(long, global = true)]
    pub policy: Option<PathBuf>,

    /// Kill switch file; overrides the configured one.
    #[arg(long, global = true)]
    pub kill_switch: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one decision cycle.
    Decide(DecideArgs),
    /// Run every request of a JSON array concurrently.
    Batch(BatchArgs),
    /// Inspect or toggle the kill switch.
    KillSwitch {
        #[command(subcommand)]
        action: KillSwitchCommand,
    },
    /// Record how a human responded to a decision.
    Feedback(FeedbackArgs),
    /// Summarise recent feedback.
    FeedbackStats {
        /// Number of most recent events to include.
        #[arg(long, default_value_t = 100)]
        last: usize,
    },
    /// Validate or export policy files.
    Policies {
        #[command(subcommand)]
        action: PoliciesCommand,
    },
}

#[derive(Debug, Args)]
pub struct DecideArgs {
    /// Agent to decide for, e.g. `retention`.
    #[arg(long)]
    pub agent: String,

    /// JSON object mapping signal names to values.
    #[arg(long)]
    pub signals: PathBuf,

    /// Append the record to this audit journal.
    #[arg(long)]
    pub audit: Option<PathBuf>,

    /// Print a human-facing card instead of the JSON record.
    #[arg(long)]
    pub render: bool,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// JSON array of `{ "agent_id": ..., "signals": {...} }` requests.
    #[arg(long)]
    pub requests: PathBuf,

    /// Append successful records to this audit journal.
    #[arg(long)]
    pub audit: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum KillSwitchCommand {
    /// Print the current state.
    Show,
    /// Re-enable suggestions globally or for one agent.
    Enable {
        /// Agent to enable; omit for the global switch.
        #[arg(long)]
        agent: Option<String>,
    },
    /// Suppress suggestions globally or for one agent.
    Disable {
        /// Agent to disable; omit for the global switch.
        #[arg(long)]
        agent: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct FeedbackArgs {
    /// Decision record JSON as printed by `decide`.
    #[arg(long)]
    pub decision: PathBuf,

    /// What the human did: accepted, ignored, or edited.
    #[arg(long)]
    pub outcome: FeedbackOutcome,

    /// Customer, call, or rep the decision was about.
    #[arg(long)]
    pub subject: Option<String>,

    /// Free-form reviewer notes.
    #[arg(long)]
    pub notes: Option<String>,

    /// Feedback journal; overrides the configured one.
    #[arg(long)]
    pub log: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum PoliciesCommand {
    /// Load a policy file and report hard errors and soft findings.
    Validate {
        /// Policy file to check.
        file: PathBuf,
    },
    /// Write the built-in policies as a policy file.
    Export {
        /// Destination; printed to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
