//! Policy schema: scores, contribution functions, threshold rules, and the
//! action catalog of one agent.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use hitl_primitives::AgentId;
use hitl_telemetry::{DiagnosticKind, Diagnostics};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::decision::{Action, ScoreRange};
use crate::error::{PolicyError, PolicyResult};

/// Maps a raw signal value to a contribution in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Contribution {
    /// Numeric signal normalised linearly between `min` and `max`.
    Linear {
        /// Value mapping to 0.
        min: f64,
        /// Value mapping to 1.
        max: f64,
        /// Map `min` to 1 and `max` to 0 instead.
        #[serde(default)]
        invert: bool,
    },
    /// Label lookup, e.g. sentiment `negative` → 1.0.
    Categorical {
        /// Contribution per label. Unknown labels are unusable.
        map: BTreeMap<String, f64>,
    },
    /// Boolean flag.
    Flag {
        /// Contribution when the flag is set.
        #[serde(default = "one")]
        when_true: f64,
        /// Contribution when the flag is clear.
        #[serde(default)]
        when_false: f64,
    },
}

fn one() -> f64 {
    1.0
}

impl Contribution {
    /// Linear mapping over `[min, max]`.
    #[must_use]
    pub fn linear(min: f64, max: f64) -> Self {
        Self::Linear {
            min,
            max,
            invert: false,
        }
    }

    /// Inverted linear mapping over `[min, max]`.
    #[must_use]
    pub fn inverted(min: f64, max: f64) -> Self {
        Self::Linear {
            min,
            max,
            invert: true,
        }
    }

    /// Label lookup built from `(label, contribution)` pairs.
    #[must_use]
    pub fn categorical<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::Categorical {
            map: entries
                .into_iter()
                .map(|(label, value)| (label.into(), value))
                .collect(),
        }
    }

    /// Flag contributing 1.0 when set and 0.0 otherwise.
    #[must_use]
    pub fn flag() -> Self {
        Self::Flag {
            when_true: 1.0,
            when_false: 0.0,
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Linear { min, max, .. } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err("linear bounds must be finite".into());
                }
                if min >= max {
                    return Err(format!("linear min {min} must be below max {max}"));
                }
            }
            Self::Categorical { map } => {
                if map.is_empty() {
                    return Err("categorical map cannot be empty".into());
                }
                if let Some((label, value)) = map.iter().find(|(_, v)| !unit_interval(**v)) {
                    return Err(format!("label `{label}` maps to {value}, outside [0, 1]"));
                }
            }
            Self::Flag {
                when_true,
                when_false,
            } => {
                if !unit_interval(*when_true) || !unit_interval(*when_false) {
                    return Err("flag contributions must lie in [0, 1]".into());
                }
            }
        }
        Ok(())
    }
}

fn unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// One signal feeding a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreInput {
    /// Signal name in the [`SignalSet`](hitl_primitives::SignalSet).
    pub signal: String,
    /// Relative weight; normalised per score.
    pub weight: f64,
    /// Redundancy group; inputs sharing a group are expected to agree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Value to contribution mapping.
    pub contribution: Contribution,
}

impl ScoreInput {
    /// Creates an input without a redundancy group.
    #[must_use]
    pub fn new(signal: impl Into<String>, weight: f64, contribution: Contribution) -> Self {
        Self {
            signal: signal.into(),
            weight,
            group: None,
            contribution,
        }
    }

    /// Places the input in a redundancy group.
    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Treatment of inputs whose signal is missing or unusable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSignals {
    /// Missing inputs contribute zero; the remaining weights are not rescaled.
    #[default]
    Zero,
    /// Present inputs are rescaled to carry the full weight.
    Renormalize,
}

/// Mapping applied to the unit aggregate before scaling into range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreTransform {
    /// Aggregate is used as is.
    #[default]
    Identity,
    /// Logistic calibration `1 / (1 + exp(-(x - center) / scale))`.
    Sigmoid {
        /// Aggregate mapping to 0.5.
        center: f64,
        /// Steepness; zero is treated as one.
        scale: f64,
    },
}

impl ScoreTransform {
    /// Applies the transform to a unit aggregate.
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Identity => x,
            Self::Sigmoid { center, scale } => {
                let scale = if scale == 0.0 { 1.0 } else { scale };
                1.0 / (1.0 + (-(x - center) / scale).exp())
            }
        }
    }
}

/// Declaration of one score computed for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSpec {
    /// Score name referenced by rules.
    pub name: String,
    /// Declared bounds.
    #[serde(default)]
    pub range: ScoreRange,
    /// Missing signal treatment.
    #[serde(default)]
    pub missing: MissingSignals,
    /// Value used when no input is present, in range units.
    #[serde(default)]
    pub default: f64,
    /// Calibration of the aggregate.
    #[serde(default)]
    pub transform: ScoreTransform,
    /// Contributing signals.
    pub inputs: Vec<ScoreInput>,
}

impl ScoreSpec {
    /// Declares a `[0, 1]` score.
    #[must_use]
    pub fn unit(name: impl Into<String>, inputs: Vec<ScoreInput>) -> Self {
        Self {
            name: name.into(),
            range: ScoreRange::Unit,
            missing: MissingSignals::default(),
            default: 0.0,
            transform: ScoreTransform::Identity,
            inputs,
        }
    }

    /// Declares a `[0, 100]` score.
    #[must_use]
    pub fn percent(name: impl Into<String>, inputs: Vec<ScoreInput>) -> Self {
        Self {
            range: ScoreRange::Percent,
            ..Self::unit(name, inputs)
        }
    }

    /// Sets the degraded default value.
    #[must_use]
    pub fn with_default(mut self, default: f64) -> Self {
        self.default = default;
        self
    }

    /// Sets the missing signal treatment.
    #[must_use]
    pub fn with_missing(mut self, missing: MissingSignals) -> Self {
        self.missing = missing;
        self
    }

    /// Sets the aggregate transform.
    #[must_use]
    pub fn with_transform(mut self, transform: ScoreTransform) -> Self {
        self.transform = transform;
        self
    }

    fn validate(&self, agent: &AgentId) -> PolicyResult<()> {
        let invalid = |reason: String| PolicyError::InvalidScore {
            agent: agent.clone(),
            score: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("score name cannot be empty".into()));
        }
        if self.inputs.is_empty() {
            return Err(invalid("score declares no inputs".into()));
        }
        if !self.default.is_finite() || self.range.clamp(self.default) != self.default {
            return Err(invalid(format!(
                "default {} lies outside [0, {}]",
                self.default,
                self.range.upper()
            )));
        }
        if let ScoreTransform::Sigmoid { center, scale } = self.transform {
            if !center.is_finite() || !scale.is_finite() {
                return Err(invalid("sigmoid parameters must be finite".into()));
            }
        }

        let mut seen = BTreeSet::new();
        for input in &self.inputs {
            if input.signal.trim().is_empty() {
                return Err(invalid("input signal name cannot be empty".into()));
            }
            if input.signal.trim() != input.signal {
                return Err(invalid(format!(
                    "input signal `{}` has surrounding whitespace and would never match",
                    input.signal
                )));
            }
            if !seen.insert(input.signal.as_str()) {
                return Err(invalid(format!("signal `{}` listed twice", input.signal)));
            }
            if !input.weight.is_finite() || input.weight < 0.0 {
                return Err(invalid(format!(
                    "weight {} for `{}` must be finite and non-negative",
                    input.weight, input.signal
                )));
            }
            input
                .contribution
                .validate()
                .map_err(|reason| invalid(format!("input `{}`: {reason}", input.signal)))?;
        }
        Ok(())
    }
}

/// Comparison applied by a threshold rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum RuleCondition {
    /// `score >= cutoff`.
    #[serde(rename = ">=")]
    AtLeast {
        /// Inclusive lower bound.
        cutoff: f64,
    },
    /// `score < cutoff`.
    #[serde(rename = "<")]
    Below {
        /// Exclusive upper bound.
        cutoff: f64,
    },
    /// `min <= score < max`.
    #[serde(rename = "range")]
    Range {
        /// Inclusive lower bound.
        min: f64,
        /// Exclusive upper bound.
        max: f64,
    },
}

impl RuleCondition {
    /// `score >= cutoff`.
    #[must_use]
    pub const fn at_least(cutoff: f64) -> Self {
        Self::AtLeast { cutoff }
    }

    /// `score < cutoff`.
    #[must_use]
    pub const fn below(cutoff: f64) -> Self {
        Self::Below { cutoff }
    }

    /// `min <= score < max`.
    #[must_use]
    pub const fn range(min: f64, max: f64) -> Self {
        Self::Range { min, max }
    }

    /// Returns `true` when `value` satisfies the condition.
    #[must_use]
    pub fn holds(self, value: f64) -> bool {
        match self {
            Self::AtLeast { cutoff } => value >= cutoff,
            Self::Below { cutoff } => value < cutoff,
            Self::Range { min, max } => value >= min && value < max,
        }
    }

    /// Distance between `value` and the nearest binding cutoff. Smaller means
    /// the condition fits the observation more tightly.
    #[must_use]
    pub fn distance(self, value: f64) -> f64 {
        match self {
            Self::AtLeast { cutoff } => (value - cutoff).abs(),
            Self::Below { cutoff } => (cutoff - value).abs(),
            Self::Range { min, max } => (value - min).abs().min((max - value).abs()),
        }
    }

    fn validate(self) -> Result<(), String> {
        match self {
            Self::AtLeast { cutoff } | Self::Below { cutoff } if !cutoff.is_finite() => {
                Err("cutoff must be finite".into())
            }
            Self::Range { min, max } if !min.is_finite() || !max.is_finite() => {
                Err("range bounds must be finite".into())
            }
            Self::Range { min, max } if min >= max => {
                Err(format!("range min {min} must be below max {max}"))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for RuleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtLeast { cutoff } => write!(f, ">= {cutoff:.2}"),
            Self::Below { cutoff } => write!(f, "< {cutoff:.2}"),
            Self::Range { min, max } => write!(f, "in [{min:.2}, {max:.2})"),
        }
    }
}

/// Ordered routing rule: when `score` satisfies `condition`, offer `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Rule name used in reasons and diagnostics.
    pub name: String,
    /// Score the condition reads.
    pub score: String,
    /// Comparison against the score.
    pub condition: RuleCondition,
    /// Action offered when the rule is selected.
    pub action: Action,
    /// Evaluation order; lower numbers are evaluated first.
    pub priority: u32,
}

impl ThresholdRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        score: impl Into<String>,
        condition: RuleCondition,
        action: Action,
        priority: u32,
    ) -> Self {
        Self {
            name: name.into(),
            score: score.into(),
            condition,
            action,
            priority,
        }
    }
}

/// Catalog entry describing an action the agent may offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// The action.
    pub action: Action,
    /// Human-facing label, e.g. "Prepare re-engagement draft".
    pub label: String,
    /// Minimum confidence required before the action may be offered.
    #[serde(default)]
    pub min_confidence: f64,
}

impl ActionSpec {
    /// Creates a catalog entry.
    #[must_use]
    pub fn new(action: Action, label: impl Into<String>, min_confidence: f64) -> Self {
        Self {
            action,
            label: label.into(),
            min_confidence,
        }
    }
}

/// Policy-selected formula turning coverage and agreement into confidence.
///
/// Every variant is non-decreasing in both inputs, bounded to `[0, 1]`, and
/// yields zero when no expected signal is present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "formula", rename_all = "snake_case")]
pub enum ConfidenceFormula {
    /// Confidence equals coverage.
    CoverageOnly,
    /// `coverage * agreement ^ agreement_exponent`.
    Product {
        /// Exponent applied to agreement; zero ignores agreement.
        agreement_exponent: f64,
    },
    /// `floor + (1 - floor) * (cw * coverage + aw * agreement) / (cw + aw)`.
    Weighted {
        /// Confidence granted as soon as any signal is present.
        #[serde(default)]
        floor: f64,
        /// Weight of coverage.
        coverage_weight: f64,
        /// Weight of agreement.
        agreement_weight: f64,
    },
}

impl Default for ConfidenceFormula {
    fn default() -> Self {
        Self::Weighted {
            floor: 0.0,
            coverage_weight: 0.7,
            agreement_weight: 0.3,
        }
    }
}

impl ConfidenceFormula {
    /// Evaluates the formula. Inputs are clamped to `[0, 1]` first.
    #[must_use]
    pub fn evaluate(self, coverage: f64, agreement: f64) -> f64 {
        let coverage = ScoreRange::Unit.clamp(coverage);
        let agreement = ScoreRange::Unit.clamp(agreement);
        if coverage <= 0.0 {
            return 0.0;
        }
        let raw = match self {
            Self::CoverageOnly => coverage,
            Self::Product { agreement_exponent } => {
                coverage * agreement.powf(agreement_exponent.max(0.0))
            }
            Self::Weighted {
                floor,
                coverage_weight,
                agreement_weight,
            } => {
                let total = coverage_weight + agreement_weight;
                let mix = if total > 0.0 {
                    (coverage_weight * coverage + agreement_weight * agreement) / total
                } else {
                    coverage
                };
                floor + (1.0 - floor) * mix
            }
        };
        ScoreRange::Unit.clamp(raw)
    }

    fn validate(self) -> Result<(), String> {
        match self {
            Self::CoverageOnly => Ok(()),
            Self::Product { agreement_exponent } => {
                if agreement_exponent.is_finite() && agreement_exponent >= 0.0 {
                    Ok(())
                } else {
                    Err("agreement_exponent must be finite and non-negative".into())
                }
            }
            Self::Weighted {
                floor,
                coverage_weight,
                agreement_weight,
            } => {
                if !unit_interval(floor) {
                    return Err("floor must lie in [0, 1]".into());
                }
                let weights_ok = [coverage_weight, agreement_weight]
                    .iter()
                    .all(|w| w.is_finite() && *w >= 0.0);
                if !weights_ok || coverage_weight + agreement_weight <= 0.0 {
                    return Err("confidence weights must be non-negative and not both zero".into());
                }
                Ok(())
            }
        }
    }
}

/// What the router does when the selected rule fails its confidence gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceGate {
    /// Offer nothing.
    #[default]
    Abstain,
    /// Continue with the next priority level.
    FallThrough,
}

/// Complete, read-only policy for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Agent the policy applies to.
    pub agent: AgentId,
    /// Score explained by the reasons; defaults to the highest normalised score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_score: Option<String>,
    /// Behaviour when the selected rule fails its confidence gate.
    #[serde(default)]
    pub confidence_gate: ConfidenceGate,
    /// Confidence formula.
    #[serde(default)]
    pub confidence: ConfidenceFormula,
    /// Action catalog.
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
    /// Declared scores.
    pub scores: Vec<ScoreSpec>,
    /// Threshold rules, in any order.
    #[serde(default)]
    pub rules: Vec<ThresholdRule>,
}

impl PolicyConfig {
    /// Starts an empty policy for `agent`.
    #[must_use]
    pub fn new(agent: AgentId) -> Self {
        Self {
            agent,
            primary_score: None,
            confidence_gate: ConfidenceGate::default(),
            confidence: ConfidenceFormula::default(),
            actions: Vec::new(),
            scores: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Adds a score declaration.
    #[must_use]
    pub fn with_score(mut self, score: ScoreSpec) -> Self {
        self.scores.push(score);
        self
    }

    /// Adds an action catalog entry.
    #[must_use]
    pub fn with_action(mut self, action: ActionSpec) -> Self {
        self.actions.push(action);
        self
    }

    /// Adds a threshold rule.
    #[must_use]
    pub fn with_rule(mut self, rule: ThresholdRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Sets the confidence formula.
    #[must_use]
    pub fn with_confidence(mut self, formula: ConfidenceFormula) -> Self {
        self.confidence = formula;
        self
    }

    /// Sets the confidence gate behaviour.
    #[must_use]
    pub fn with_confidence_gate(mut self, gate: ConfidenceGate) -> Self {
        self.confidence_gate = gate;
        self
    }

    /// Names the score the reasons should explain.
    #[must_use]
    pub fn with_primary_score(mut self, score: impl Into<String>) -> Self {
        self.primary_score = Some(score.into());
        self
    }

    /// Returns the declaration of `name`.
    #[must_use]
    pub fn score_spec(&self, name: &str) -> Option<&ScoreSpec> {
        self.scores.iter().find(|spec| spec.name == name)
    }

    /// Returns the catalog entry for `action`.
    #[must_use]
    pub fn action_spec(&self, action: Action) -> Option<&ActionSpec> {
        self.actions.iter().find(|spec| spec.action == action)
    }

    /// Minimum confidence for `action`; [`Action::None`] is never gated.
    #[must_use]
    pub fn min_confidence_for(&self, action: Action) -> f64 {
        if action.is_none() {
            return 0.0;
        }
        self.action_spec(action).map_or(0.0, |spec| spec.min_confidence)
    }

    /// Distinct signal names referenced by any score.
    #[must_use]
    pub fn expected_signals(&self) -> BTreeSet<&str> {
        self.scores
            .iter()
            .flat_map(|spec| spec.inputs.iter().map(|input| input.signal.as_str()))
            .collect()
    }

    /// Rules sorted by priority, declaration order breaking ties.
    #[must_use]
    pub fn rules_in_order(&self) -> Vec<&ThresholdRule> {
        let mut rules: Vec<_> = self.rules.iter().collect();
        rules.sort_by_key(|rule| rule.priority);
        rules
    }

    /// Checks the policy for structural errors.
    ///
    /// Returns soft findings (such as duplicate priorities) as diagnostics.
    ///
    /// # Errors
    ///
    /// Returns the first [`PolicyError`] found: malformed scores, catalog
    /// entries, or rules referencing undeclared scores or actions.
    pub fn validate(&self) -> PolicyResult<Diagnostics> {
        let mut findings = Diagnostics::new();

        if self.scores.is_empty() {
            return Err(PolicyError::InvalidScore {
                agent: self.agent.clone(),
                score: String::new(),
                reason: "policy declares no scores".into(),
            });
        }

        let mut score_names = BTreeSet::new();
        for spec in &self.scores {
            spec.validate(&self.agent)?;
            if !score_names.insert(spec.name.as_str()) {
                return Err(PolicyError::InvalidScore {
                    agent: self.agent.clone(),
                    score: spec.name.clone(),
                    reason: "score declared twice".into(),
                });
            }
        }

        self.validate_catalog()?;

        if let Some(primary) = &self.primary_score {
            if !score_names.contains(primary.as_str()) {
                return Err(PolicyError::InvalidScore {
                    agent: self.agent.clone(),
                    score: primary.clone(),
                    reason: "primary score is not declared".into(),
                });
            }
        }

        self.confidence
            .validate()
            .map_err(|reason| PolicyError::InvalidCatalog {
                agent: self.agent.clone(),
                reason: format!("confidence formula: {reason}"),
            })?;

        let mut rule_names = BTreeSet::new();
        let mut priorities: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
        for rule in &self.rules {
            let invalid = |reason: String| PolicyError::InvalidRule {
                agent: self.agent.clone(),
                rule: rule.name.clone(),
                reason,
            };
            if rule.name.trim().is_empty() {
                return Err(invalid("rule name cannot be empty".into()));
            }
            if !rule_names.insert(rule.name.as_str()) {
                return Err(invalid("rule declared twice".into()));
            }
            if !score_names.contains(rule.score.as_str()) {
                return Err(invalid(format!("score `{}` is not declared", rule.score)));
            }
            if !rule.action.is_none() && self.action_spec(rule.action).is_none() {
                return Err(invalid(format!(
                    "action `{}` is missing from the catalog",
                    rule.action
                )));
            }
            rule.condition.validate().map_err(invalid)?;
            priorities.entry(rule.priority).or_default().push(&rule.name);
        }

        for (priority, names) in priorities.iter().filter(|(_, names)| names.len() > 1) {
            findings.push(
                DiagnosticKind::ConfigurationConflict,
                format!("priority {priority}"),
                format!(
                    "rules {} share a priority; ties resolve by tightest cutoff",
                    names.join(", ")
                ),
            );
        }

        if self.rules.is_empty() {
            warn!(agent = %self.agent, "policy has no threshold rules; every cycle routes to none");
        }

        Ok(findings)
    }

    fn validate_catalog(&self) -> PolicyResult<()> {
        let mut seen = BTreeSet::new();
        for spec in &self.actions {
            let invalid = |reason: String| PolicyError::InvalidCatalog {
                agent: self.agent.clone(),
                reason,
            };
            if !seen.insert(spec.action) {
                return Err(invalid(format!("action `{}` listed twice", spec.action)));
            }
            if spec.label.trim().is_empty() {
                return Err(invalid(format!("action `{}` has an empty label", spec.action)));
            }
            if !unit_interval(spec.min_confidence) {
                return Err(invalid(format!(
                    "action `{}` min_confidence {} lies outside [0, 1]",
                    spec.action, spec.min_confidence
                )));
            }
        }
        Ok(())
    }
}

/// Immutable set of validated policies, one per agent.
#[derive(Debug, Clone, Default)]
pub struct PolicyBook {
    version: u64,
    policies: BTreeMap<AgentId, Arc<PolicyConfig>>,
}

impl PolicyBook {
    /// Creates an empty book carrying `version`.
    #[must_use]
    pub fn new(version: u64) -> Self {
        Self {
            version,
            policies: BTreeMap::new(),
        }
    }

    /// Builds a book from policies, validating each one.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or
    /// [`PolicyError::DuplicateAgent`] when an agent appears twice.
    pub fn from_policies<I>(version: u64, policies: I) -> PolicyResult<Self>
    where
        I: IntoIterator<Item = PolicyConfig>,
    {
        let mut book = Self::new(version);
        for policy in policies {
            book.insert(policy)?;
        }
        Ok(book)
    }

    /// Validates and adds a policy.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or [`PolicyError::DuplicateAgent`] when a
    /// policy for the same agent is already present.
    pub fn insert(&mut self, policy: PolicyConfig) -> PolicyResult<()> {
        policy.validate()?;
        if self.policies.contains_key(&policy.agent) {
            return Err(PolicyError::DuplicateAgent(policy.agent));
        }
        self.policies.insert(policy.agent.clone(), Arc::new(policy));
        Ok(())
    }

    /// Returns the policy for `agent`.
    #[must_use]
    pub fn get(&self, agent: &AgentId) -> Option<&Arc<PolicyConfig>> {
        self.policies.get(agent)
    }

    /// Returns the declared version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Iterates over covered agents.
    pub fn agents(&self) -> impl Iterator<Item = &AgentId> {
        self.policies.keys()
    }

    /// Iterates over the policies in agent order.
    pub fn policies(&self) -> impl Iterator<Item = &Arc<PolicyConfig>> {
        self.policies.values()
    }

    /// Number of policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns `true` when the book holds no policy.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
