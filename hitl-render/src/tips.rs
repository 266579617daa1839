//! Coaching tips derived from rubric scores.

use hitl_kernel::DecisionRecord;
use hitl_policy::ScoreRange;

const BASE_TIPS: [&str; 3] = [
    "Acknowledge the customer's concern first before presenting a solution.",
    "When objections come up, ask one clarifying question before responding.",
    "End with a clear recap and confirm the next step with a date/time.",
];

/// Names of the two lowest percent scores, lowest first. Ties keep name
/// order.
#[must_use]
pub fn top_gaps(record: &DecisionRecord) -> Vec<&str> {
    let mut rubric: Vec<(&str, f64)> = record
        .scores()
        .iter()
        .filter(|(_, score)| score.range() == ScoreRange::Percent)
        .map(|(name, score)| (name.as_str(), score.value()))
        .collect();
    rubric.sort_by(|a, b| a.1.total_cmp(&b.1));
    rubric.into_iter().take(2).map(|(name, _)| name).collect()
}

/// Exactly three tips. Each gap replaces the generic tip in its slot with a
/// targeted one; the lowest gap wins when both gaps target the same slot.
#[must_use]
pub fn coaching_tips(record: &DecisionRecord) -> [String; 3] {
    let mut tips = BASE_TIPS.map(str::to_owned);
    let mut claimed = [false; 3];

    for gap in top_gaps(record) {
        let Some((slot, tip)) = targeted_tip(gap) else {
            continue;
        };
        if !claimed[slot] {
            tips[slot] = tip.to_owned();
            claimed[slot] = true;
        }
    }
    tips
}

fn targeted_tip(gap: &str) -> Option<(usize, &'static str)> {
    let gap = gap.to_ascii_lowercase();
    if gap.contains("empathy") {
        Some((0, "Start by reflecting the customer's concern in one sentence before pitching value."))
    } else if gap.contains("objection") {
        Some((
            1,
            "Handle objections by confirming the concern, asking one question, then tying back to outcomes.",
        ))
    } else if gap.contains("pacing") {
        Some((1, "Break long explanations into short turns and pause so the customer can respond."))
    } else if gap.contains("closing") || gap.contains("next step") {
        Some((2, "Close with one clear next step and ask for explicit confirmation (yes/no)."))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use hitl_policy::{Action, Score};
    use hitl_primitives::AgentId;

    fn rubric(entries: &[(&str, f64)]) -> DecisionRecord {
        let scores = entries
            .iter()
            .map(|(name, value)| ((*name).to_owned(), Score::clamped(ScoreRange::Percent, *value).0))
            .collect::<BTreeMap<_, _>>();
        DecisionRecord::builder(AgentId::sales_coach())
            .scores(scores)
            .action(Action::ScoreAndTips, Some("rubric".into()))
            .build()
    }

    #[test]
    fn picks_two_lowest_percent_scores() {
        let record = rubric(&[("empathy", 60.0), ("pacing", 70.0), ("objection_handling", 80.0), ("closing", 45.0)]);
        assert_eq!(top_gaps(&record), ["closing", "empathy"]);

        let tips = coaching_tips(&record);
        assert!(tips[0].starts_with("Start by reflecting"));
        assert_eq!(tips[1], BASE_TIPS[1]);
        assert!(tips[2].starts_with("Close with one clear next step"));
    }

    #[test]
    fn unit_scores_are_not_rubric_gaps() {
        let (churn, _) = Score::clamped(ScoreRange::Unit, 0.1);
        let record = DecisionRecord::builder(AgentId::retention())
            .scores(BTreeMap::from([("churn_risk".to_owned(), churn)]))
            .build();
        assert!(top_gaps(&record).is_empty());
        assert_eq!(coaching_tips(&record), BASE_TIPS.map(str::to_owned));
    }

    #[test]
    fn lowest_gap_keeps_a_shared_slot() {
        let record = rubric(&[("pacing", 10.0), ("objection_handling", 20.0), ("empathy", 90.0), ("closing", 85.0)]);
        let tips = coaching_tips(&record);
        assert!(tips[1].starts_with("Break long explanations"));
        assert_eq!(tips[0], BASE_TIPS[0]);
        assert_eq!(tips[2], BASE_TIPS[2]);
    }
}
