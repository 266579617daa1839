//! Subcommand implementations.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use hitl_agents::config::{
    FileKillSwitch, PolicyFile, RuntimeConfig, builtin_policy_book, load_policy_book, read_json,
    write_json_atomic,
};
use hitl_agents::journal::{AuditJournal, FeedbackEvent, FeedbackJournal, FeedbackTally, Journal};
use hitl_agents::kernel::{
    BatchConfig, BatchRunner, DecisionKernel, DecisionRecord, DecisionRequest, KillSwitchGate,
    KillSwitchSource, PolicyStore,
};
use hitl_agents::policy::Action;
use hitl_agents::primitives::{AgentId, SignalSet};
use hitl_agents::render::{CardRenderer, Renderer, coaching_tips};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::cli::{BatchArgs, Cli, DecideArgs, FeedbackArgs, KillSwitchCommand, PoliciesCommand};

/// Resolved configuration plus the shared kill switch.
pub struct Runtime {
    config: RuntimeConfig,
    kill_switch: Arc<FileKillSwitch>,
}

impl Runtime {
    /// Loads the runtime configuration and applies command line overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => RuntimeConfig::load(path)
                .with_context(|| format!("loading runtime config {}", path.display()))?,
            None => RuntimeConfig::default(),
        };
        if let Some(path) = &cli.policy {
            config.policy_path = Some(path.clone());
        }
        if let Some(path) = &cli.kill_switch {
            config.kill_switch_path.clone_from(path);
        }

        let kill_switch = Arc::new(FileKillSwitch::new(config.kill_switch_path.clone()));
        Ok(Self { config, kill_switch })
    }

    /// The resolved configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn kernel(&self) -> Result<DecisionKernel> {
        let book = self.config.policy_book().context("loading policies")?;
        Ok(DecisionKernel::new(
            KillSwitchGate::new(Arc::clone(&self.kill_switch) as Arc<dyn KillSwitchSource>),
            Arc::new(PolicyStore::new(book)),
        ))
    }

    fn audit_path(&self, flag: Option<&Path>) -> Option<PathBuf> {
        flag.map(Path::to_path_buf).or_else(|| self.config.audit_path.clone())
    }

    async fn audit<'a>(
        &self,
        flag: Option<&Path>,
        records: impl IntoIterator<Item = &'a DecisionRecord>,
    ) -> Result<()> {
        let Some(path) = self.audit_path(flag) else {
            return Ok(());
        };
        let journal = AuditJournal::open(&path)
            .await
            .with_context(|| format!("opening audit journal {}", path.display()))?;
        let mut written = 0_usize;
        for record in records {
            journal.append(record).await.context("writing audit entry")?;
            written += 1;
        }
        info!(path = %path.display(), written, "decisions audited");
        Ok(())
    }
}

fn agent(name: &str) -> Result<AgentId> {
    AgentId::new(name).with_context(|| format!("invalid agent `{name}`"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `decide`: one cycle, printed as JSON or as a card.
pub async fn decide(runtime: &Runtime, args: &DecideArgs) -> Result<()> {
    let agent_id = agent(&args.agent)?;
    let signals: SignalSet = read_json(&args.signals).context("reading signals")?;
    let kernel = runtime.kernel()?;

    let record = kernel.decide(&agent_id, &signals)?;
    runtime.audit(args.audit.as_deref(), [&record]).await?;

    if args.render {
        let renderer = kernel
            .policies()
            .policy_for(&agent_id)
            .map_or_else(CardRenderer::new, |policy| CardRenderer::for_policy(&policy));
        println!("{}", renderer.render(&record));
        Ok(())
    } else {
        print_json(&record)
    }
}

/// `batch`: many cycles with bounded concurrency, one JSON line per request.
pub async fn batch(runtime: &Runtime, args: &BatchArgs) -> Result<()> {
    let requests: Vec<DecisionRequest> = read_json(&args.requests).context("reading requests")?;
    let agents: Vec<AgentId> = requests.iter().map(|request| request.agent_id.clone()).collect();
    let concurrency = NonZeroUsize::new(runtime.config().max_concurrency)
        .context("max_concurrency must be at least 1")?;

    let runner = BatchRunner::new(Arc::new(runtime.kernel()?), BatchConfig::new(concurrency));
    let results = runner.run(requests).await?;

    let mut failures = 0_usize;
    for (agent_id, result) in agents.iter().zip(&results) {
        let line = match result {
            Ok(record) => serde_json::to_string(record)?,
            Err(err) => {
                failures += 1;
                warn!(agent = %agent_id, error = %err, "decision failed");
                json!({ "agent_id": agent_id, "error": err.to_string() }).to_string()
            }
        };
        println!("{line}");
    }

    let records = results.iter().filter_map(|result| result.as_ref().ok());
    runtime.audit(args.audit.as_deref(), records).await?;
    info!(total = results.len(), failures, "batch finished");
    Ok(())
}

/// `kill-switch show|enable|disable`.
pub fn kill_switch(runtime: &Runtime, action: &KillSwitchCommand) -> Result<()> {
    let switch = &runtime.kill_switch;
    let version = match action {
        KillSwitchCommand::Show => {
            let snapshot = switch.snapshot();
            return print_json(&json!({
                "path": switch.path().display().to_string(),
                "version": snapshot.version(),
                "state": snapshot.value(),
            }));
        }
        KillSwitchCommand::Enable { agent: None } => switch.set_global_enabled(true)?,
        KillSwitchCommand::Disable { agent: None } => switch.set_global_enabled(false)?,
        KillSwitchCommand::Enable { agent: Some(name) } => switch.set_agent_enabled(&agent(name)?, true)?,
        KillSwitchCommand::Disable { agent: Some(name) } => {
            switch.set_agent_enabled(&agent(name)?, false)?
        }
    };
    print_json(&json!({ "version": version, "state": switch.snapshot().value() }))
}

/// `feedback`: append one event answering a stored decision.
pub async fn feedback(runtime: &Runtime, args: &FeedbackArgs) -> Result<()> {
    let record: DecisionRecord = read_json(&args.decision).context("reading decision record")?;
    let mut event = FeedbackEvent::for_decision(&record, args.outcome);
    if let Some(subject) = &args.subject {
        event = event.with_subject(subject.clone());
    }
    if let Some(notes) = &args.notes {
        event = event.with_notes(notes.clone());
    }
    if record.chosen_action() == Action::ScoreAndTips {
        event = event.with_tips(coaching_tips(&record));
    }

    let path = args.log.clone().unwrap_or_else(|| runtime.config().feedback_path.clone());
    let journal = FeedbackJournal::open(&path)
        .await
        .with_context(|| format!("opening feedback journal {}", path.display()))?;
    journal.append(&event).await.context("writing feedback")?;
    info!(path = %path.display(), outcome = %event.outcome(), "feedback recorded");
    print_json(&event)
}

/// `feedback-stats`: outcome counts over the latest events.
pub async fn feedback_stats(runtime: &Runtime, last: usize) -> Result<()> {
    let path = &runtime.config().feedback_path;
    let journal = FeedbackJournal::open(path)
        .await
        .with_context(|| format!("opening feedback journal {}", path.display()))?;
    let events = journal.tail(last).await?;
    let tally = FeedbackTally::from_events(&events);
    print_json(&json!({
        "events": tally.total(),
        "tally": tally,
        "acted_on_ratio": tally.acted_on_ratio(),
    }))
}

/// `policies validate|export`.
pub fn policies(action: &PoliciesCommand) -> Result<()> {
    match action {
        PoliciesCommand::Validate { file } => {
            let book = load_policy_book(file)
                .with_context(|| format!("policy file {} rejected", file.display()))?;
            let mut findings = 0_usize;
            for policy in book.policies() {
                for finding in policy.validate()?.entries() {
                    findings += 1;
                    println!("warning: {}: {finding}", policy.agent);
                }
            }
            println!(
                "ok: {} agent(s), version {}, {findings} finding(s)",
                book.len(),
                book.version()
            );
            Ok(())
        }
        PoliciesCommand::Export { out } => {
            let file = PolicyFile::from_book(&builtin_policy_book()?);
            match out {
                Some(path) => {
                    write_json_atomic(path, &file)?;
                    info!(path = %path.display(), "built-in policies exported");
                    Ok(())
                }
                None => print_json(&file),
            }
        }
    }
}
