//! Review cards for account owners, reps, and coaches.

use std::collections::BTreeMap;
use std::fmt;

use hitl_kernel::DecisionRecord;
use hitl_policy::{Action, PolicyConfig};
use serde::Serialize;
use tracing::warn;

use crate::error::RenderResult;
use crate::renderer::Renderer;
use crate::template::Template;
use crate::tips::coaching_tips;

/// Default layout of a rendered card.
pub const DEFAULT_CARD_TEMPLATE: &str = "\
[{{risk_band}} risk] {{agent}}: {{action_label}}
confidence {{confidence}} | {{scores}}
{{reasons}}
next step: {{next_step}}
{{tips}}";

/// Variables a card template may reference.
pub const CARD_VARIABLES: &[&str] = &[
    "agent",
    "risk_band",
    "action",
    "action_label",
    "confidence",
    "scores",
    "reasons",
    "next_step",
    "tips",
    "kill_switch",
    "policy_version",
    "timestamp",
];

/// Coarse urgency band shown on cards. The chosen action decides the band,
/// not the raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    /// Nothing urgent.
    Low,
    /// Worth a human look.
    Medium,
    /// Act soon.
    High,
}

impl RiskBand {
    /// Band for a chosen action.
    #[must_use]
    pub const fn for_action(action: Action) -> Self {
        match action {
            Action::Draft => Self::High,
            Action::Alert => Self::Medium,
            Action::None | Action::Suggest | Action::ScoreAndTips => Self::Low,
        }
    }

    /// Lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured card contents, serializable for UIs that lay cards out
/// themselves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    /// Agent that produced the decision.
    pub agent: String,
    /// Urgency band.
    pub risk_band: RiskBand,
    /// Chosen action.
    pub action: Action,
    /// Human label of the action.
    pub action_label: String,
    /// Decision confidence, rounded to two decimals.
    pub confidence: f64,
    /// Score values by name.
    pub scores: BTreeMap<String, f64>,
    /// Reasons, most significant first.
    pub reasons: Vec<String>,
    /// Suggested follow-up for the reviewer.
    pub next_step: String,
    /// Coaching tips, present only for rubric decisions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<String>,
    /// Whether the kill switch suppressed the decision.
    pub kill_switch_active: bool,
}

/// Renders decision records as text cards through a [`Template`].
#[derive(Debug, Clone)]
pub struct CardRenderer {
    template: Template,
    labels: BTreeMap<Action, String>,
}

impl Default for CardRenderer {
    fn default() -> Self {
        Self {
            template: Template::new(DEFAULT_CARD_TEMPLATE),
            labels: BTreeMap::new(),
        }
    }
}

impl CardRenderer {
    /// Creates a renderer with the default layout and generic labels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the action labels declared in `policy`.
    #[must_use]
    pub fn for_policy(policy: &PolicyConfig) -> Self {
        let labels = policy
            .actions
            .iter()
            .map(|spec| (spec.action, spec.label.clone()))
            .collect();
        Self {
            labels,
            ..Self::default()
        }
    }

    /// Replaces the layout.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownVariable`](crate::RenderError::UnknownVariable)
    /// if the template references a name outside [`CARD_VARIABLES`].
    pub fn with_template(mut self, template: Template) -> RenderResult<Self> {
        template.ensure_only(CARD_VARIABLES)?;
        self.template = template;
        Ok(self)
    }

    /// Label shown for `action`.
    #[must_use]
    pub fn label_for(&self, action: Action) -> &str {
        self.labels
            .get(&action)
            .map_or_else(|| default_label(action), String::as_str)
    }

    /// Builds the structured card for `record`.
    #[must_use]
    pub fn card(&self, record: &DecisionRecord) -> Card {
        let action = record.chosen_action();
        let tips = if action == Action::ScoreAndTips {
            coaching_tips(record).to_vec()
        } else {
            Vec::new()
        };
        Card {
            agent: record.agent_id().to_string(),
            risk_band: RiskBand::for_action(action),
            action,
            action_label: self.label_for(action).to_owned(),
            confidence: (record.confidence() * 100.0).round() / 100.0,
            scores: record
                .scores()
                .iter()
                .map(|(name, score)| (name.clone(), score.value()))
                .collect(),
            reasons: record.reasons().to_vec(),
            next_step: next_step_hint(record).to_owned(),
            tips,
            kill_switch_active: record.kill_switch_active(),
        }
    }

    fn values(card: &Card, record: &DecisionRecord) -> BTreeMap<&'static str, String> {
        let scores = if card.scores.is_empty() {
            "no scores".to_owned()
        } else {
            card.scores
                .iter()
                .map(|(name, value)| format!("{name} {value:.2}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let reasons = if card.reasons.is_empty() {
            "- no reasons recorded".to_owned()
        } else {
            card.reasons
                .iter()
                .map(|reason| format!("- {reason}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let tips = if card.tips.is_empty() {
            String::new()
        } else {
            let numbered = card
                .tips
                .iter()
                .enumerate()
                .map(|(index, tip)| format!("{}. {tip}", index + 1))
                .collect::<Vec<_>>()
                .join("\n");
            format!("tips:\n{numbered}")
        };

        BTreeMap::from([
            ("agent", card.agent.clone()),
            ("risk_band", card.risk_band.to_string()),
            ("action", card.action.to_string()),
            ("action_label", card.action_label.clone()),
            ("confidence", format!("{:.2}", card.confidence)),
            ("scores", scores),
            ("reasons", reasons),
            ("next_step", card.next_step.clone()),
            ("tips", tips),
            (
                "kill_switch",
                if card.kill_switch_active { "active" } else { "off" }.to_owned(),
            ),
            ("policy_version", record.policy_version().to_string()),
            ("timestamp", record.timestamp().to_rfc3339()),
        ])
    }
}

impl Renderer for CardRenderer {
    fn render(&self, record: &DecisionRecord) -> String {
        let card = self.card(record);
        let values = Self::values(&card, record);
        match self.template.render(&values) {
            Ok(text) => text.trim_end().to_owned(),
            Err(err) => {
                warn!(error = %err, "card template failed, using default layout");
                Template::new(DEFAULT_CARD_TEMPLATE)
                    .render(&values)
                    .map(|text| text.trim_end().to_owned())
                    .unwrap_or_else(|_| card.reasons.join("\n"))
            }
        }
    }
}

fn default_label(action: Action) -> &'static str {
    match action {
        Action::None => "No action",
        Action::ScoreAndTips => "Review scores and coaching tips",
        Action::Suggest => "Suggested reply",
        Action::Alert => "Alert account owner",
        Action::Draft => "Draft message for review",
    }
}

fn next_step_hint(record: &DecisionRecord) -> &'static str {
    if record.kill_switch_active() {
        return "Suggestions are paused by the kill switch. Nothing was surfaced.";
    }
    match record.chosen_action() {
        Action::Draft => {
            "Review the draft message and (if appropriate) reach out to the customer with help/resources."
        }
        Action::Alert => "Review usage trends and decide whether a check-in call or email is needed.",
        Action::Suggest => "Adapt the suggested reply to the conversation before using it.",
        Action::ScoreAndTips => "Pick one tip to practise on the next call.",
        Action::None => "No action needed. Continue monitoring in the next batch.",
    }
}
