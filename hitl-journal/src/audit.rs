//! Persistence of decision records for later review.

use hitl_kernel::DecisionRecord;

use crate::feedback::FeedbackEvent;
use crate::journal::FileJournal;

/// JSONL journal of every decision surfaced to a human.
pub type AuditJournal = FileJournal<DecisionRecord>;

/// JSONL journal of human responses.
pub type FeedbackJournal = FileJournal<FeedbackEvent>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use hitl_policy::Action;
    use hitl_primitives::AgentId;
    use uuid::Uuid;

    use crate::feedback::FeedbackOutcome;
    use crate::journal::Journal;

    fn temp_path(kind: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("hitl-{kind}-{}", Uuid::new_v4()));
        path.push("journal.jsonl");
        path
    }

    #[tokio::test]
    async fn audit_journal_restores_records() {
        let path = temp_path("audit");
        let journal = AuditJournal::open(&path).await.unwrap();
        let record = DecisionRecord::builder(AgentId::negotiator())
            .action(Action::None, None)
            .reasons(vec!["kill switch active: suggestions disabled globally".into()])
            .kill_switch_active(true)
            .versions(3, 9)
            .build();

        journal.append(&record).await.unwrap();
        let restored = journal.tail(1).await.unwrap();
        assert_eq!(restored, [record]);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn feedback_journal_tails_latest_events() {
        let path = temp_path("feedback");
        let journal = FeedbackJournal::open(&path).await.unwrap();
        for outcome in [FeedbackOutcome::Ignored, FeedbackOutcome::Accepted] {
            let event = FeedbackEvent::new(AgentId::retention(), Action::Alert, outcome).with_subject("acct-7");
            journal.append(&event).await.unwrap();
        }

        let latest = journal.tail(1).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].outcome(), FeedbackOutcome::Accepted);
        assert_eq!(latest[0].subject_id(), Some("acct-7"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
