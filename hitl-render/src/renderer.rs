//! The seam between decision records and human-facing text.

use hitl_kernel::DecisionRecord;

/// Turns a finished decision into text for a human.
///
/// The decision kernel never depends on which renderer is used; template
/// cards, plain summaries, or generated suggestion text all plug in here.
pub trait Renderer: Send + Sync {
    /// Renders `record`.
    fn render(&self, record: &DecisionRecord) -> String;
}

impl<F> Renderer for F
where
    F: Fn(&DecisionRecord) -> String + Send + Sync,
{
    fn render(&self, record: &DecisionRecord) -> String {
        self(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hitl_policy::Action;
    use hitl_primitives::AgentId;

    #[test]
    fn closures_are_renderers() {
        let renderer: Box<dyn Renderer> =
            Box::new(|record: &DecisionRecord| format!("{} -> {}", record.agent_id(), record.chosen_action()));
        let record = DecisionRecord::builder(AgentId::negotiator())
            .action(Action::Suggest, Some("objection-raised".into()))
            .build();
        assert_eq!(renderer.render(&record), "negotiator -> suggest");
    }
}
