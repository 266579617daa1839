use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use hitl_agents::config::{FileKillSwitch, PolicyFile, builtin_policy_book, load_policy_book, write_json_atomic};
use hitl_agents::journal::{AuditJournal, FeedbackEvent, FeedbackJournal, FeedbackOutcome, Journal};
use hitl_agents::kernel::{
    BatchConfig, BatchRunner, CycleState, DecisionKernel, DecisionRequest, KillSwitchGate,
    KillSwitchSource, PolicyStore,
};
use hitl_agents::policy::Action;
use hitl_agents::primitives::{AgentId, SignalSet};
use hitl_agents::render::{CardRenderer, Renderer};

struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("hitl-agents-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn kernel_with(switch: Arc<FileKillSwitch>, workspace: &Workspace) -> DecisionKernel {
    let policy_path = workspace.path("policies.json");
    let book = builtin_policy_book().unwrap();
    write_json_atomic(&policy_path, &PolicyFile::from_book(&book)).unwrap();

    DecisionKernel::new(
        KillSwitchGate::new(switch as Arc<dyn KillSwitchSource>),
        Arc::new(PolicyStore::new(load_policy_book(&policy_path).unwrap())),
    )
}

fn declining_account() -> SignalSet {
    SignalSet::new()
        .with("login_drop_pct", 0.9)
        .and_then(|set| set.with("active_minutes_drop_pct", 0.8))
        .and_then(|set| set.with("feature_usage_drop_pct", 0.7))
        .and_then(|set| set.with("inactive_streak_days", 6.0))
        .and_then(|set| set.with("low_usage_ratio", 0.9))
        .unwrap()
}

fn objection_call() -> SignalSet {
    SignalSet::new()
        .with("objection_detected", true)
        .and_then(|set| set.with("objection_keyword_hit", true))
        .and_then(|set| set.with("sentiment", "negative"))
        .unwrap()
}

#[test]
fn policy_file_drives_full_cycle() {
    let workspace = Workspace::new();
    let switch = Arc::new(FileKillSwitch::new(workspace.path("kill_switch.json")));
    let kernel = kernel_with(Arc::clone(&switch), &workspace);

    let record = kernel.decide(&AgentId::retention(), &declining_account()).unwrap();
    assert_eq!(record.chosen_action(), Action::Draft);
    assert!(!record.kill_switch_active());
    assert_eq!(record.policy_version(), 1);
    assert_eq!(record.cycle_trace().last(), Some(&CycleState::Recorded));

    let card = CardRenderer::for_policy(&kernel.policies().policy_for(&AgentId::retention()).unwrap())
        .render(&record);
    assert!(card.starts_with("[high risk] retention: Prepare re-engagement draft"));
}

#[test]
fn agent_kill_switch_blocks_only_that_agent() {
    let workspace = Workspace::new();
    let switch = Arc::new(FileKillSwitch::new(workspace.path("kill_switch.json")));
    let kernel = kernel_with(Arc::clone(&switch), &workspace);

    switch.set_agent_enabled(&AgentId::negotiator(), false).unwrap();

    let blocked = kernel.decide(&AgentId::negotiator(), &objection_call()).unwrap();
    assert!(blocked.kill_switch_active());
    assert_eq!(blocked.chosen_action(), Action::None);
    assert!(blocked.scores().is_empty());
    assert_eq!(blocked.reasons(), ["kill switch active: suggestions disabled for agent negotiator"]);

    let other = kernel.decide(&AgentId::retention(), &declining_account()).unwrap();
    assert!(!other.kill_switch_active());
    assert_eq!(other.chosen_action(), Action::Draft);

    switch.set_agent_enabled(&AgentId::negotiator(), true).unwrap();
    let resumed = kernel.decide(&AgentId::negotiator(), &objection_call()).unwrap();
    assert_eq!(resumed.chosen_action(), Action::Suggest);
    assert!(resumed.kill_switch_version() > blocked.kill_switch_version());
}

#[test]
fn hand_edited_kill_switch_file_is_picked_up() {
    let workspace = Workspace::new();
    let path = workspace.path("kill_switch.json");
    let switch = Arc::new(FileKillSwitch::new(&path));
    let kernel = kernel_with(Arc::clone(&switch), &workspace);

    std::fs::write(&path, r#"{ "global_enabled": false }"#).unwrap();
    let record = kernel.decide(&AgentId::retention(), &declining_account()).unwrap();
    assert!(record.kill_switch_active());
    assert_eq!(record.reasons(), ["kill switch active: suggestions disabled globally"]);

    // Corrupt edits keep the last good state.
    std::fs::write(&path, "{ not json").unwrap();
    let still_blocked = kernel.decide(&AgentId::retention(), &declining_account()).unwrap();
    assert!(still_blocked.kill_switch_active());
}

#[test]
fn concurrent_cycles_see_whole_snapshots() {
    let workspace = Workspace::new();
    let switch = Arc::new(FileKillSwitch::new(workspace.path("kill_switch.json")));
    let kernel = Arc::new(kernel_with(Arc::clone(&switch), &workspace));

    let toggler = {
        let switch = Arc::clone(&switch);
        thread::spawn(move || {
            for round in 0..20 {
                switch.set_global_enabled(round % 2 == 1).unwrap();
            }
        })
    };

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let kernel = Arc::clone(&kernel);
            thread::spawn(move || {
                (0..50)
                    .map(|_| kernel.decide(&AgentId::retention(), &declining_account()).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    toggler.join().unwrap();
    for worker in workers {
        for record in worker.join().unwrap() {
            if record.kill_switch_active() {
                assert_eq!(record.chosen_action(), Action::None);
                assert!(record.scores().is_empty());
            } else {
                assert_eq!(record.chosen_action(), Action::Draft);
                assert!(record.score("churn_risk").is_some());
            }
        }
    }
}

#[tokio::test]
async fn batch_decisions_are_audited_and_answered() {
    let workspace = Workspace::new();
    let switch = Arc::new(FileKillSwitch::new(workspace.path("kill_switch.json")));
    let kernel = Arc::new(kernel_with(Arc::clone(&switch), &workspace));
    let runner = BatchRunner::new(kernel, BatchConfig::new(NonZeroUsize::new(2).unwrap()));

    let requests = vec![
        DecisionRequest::new(AgentId::retention(), declining_account()),
        DecisionRequest::new(AgentId::negotiator(), objection_call()),
        DecisionRequest::new(AgentId::new("unknown-agent").unwrap(), SignalSet::new()),
    ];
    let results = runner.run(requests).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[2].is_err());

    let audit = AuditJournal::open(workspace.path("audit/decisions.jsonl")).await.unwrap();
    let feedback = FeedbackJournal::open(workspace.path("feedback/events.jsonl")).await.unwrap();
    for record in results.iter().filter_map(|result| result.as_ref().ok()) {
        audit.append(record).await.unwrap();
        let event = FeedbackEvent::for_decision(record, FeedbackOutcome::Accepted).with_subject("demo");
        feedback.append(&event).await.unwrap();
    }

    let audited = audit.tail(10).await.unwrap();
    assert_eq!(audited.len(), 2);
    assert_eq!(audited[0].agent_id(), &AgentId::retention());
    assert_eq!(audited[1].chosen_action(), Action::Suggest);

    let events = feedback.tail(10).await.unwrap();
    assert_eq!(events[1].recommended_action(), Action::Suggest);
    assert_eq!(events[0].subject_id(), Some("demo"));
}
