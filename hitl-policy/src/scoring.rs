//! Weighted, explainable scoring of a signal set against a policy.

use std::collections::{BTreeMap, BTreeSet};

use hitl_primitives::{SignalSet, SignalValue};
use hitl_telemetry::{DiagnosticKind, Diagnostics};
use tracing::debug;

use crate::contracts::{Contribution, MissingSignals, PolicyConfig, ScoreSpec};
use crate::decision::{Score, ScoreRange, ScoreSheet};

const WEIGHT_TOLERANCE: f64 = 1e-6;
const MAX_DRIVERS: usize = 2;

/// Reason emitted when nothing usable was supplied.
pub const NO_SIGNALS_REASON: &str = "no signals present";

/// Stateless scorer. Missing or malformed signals degrade the result and
/// are reported; they never fail the computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

struct Driver<'a> {
    signal: &'a str,
    weighted: f64,
}

struct Evaluation<'a> {
    name: &'a str,
    score: Score,
    degraded: bool,
    drivers: Vec<Driver<'a>>,
}

struct Present<'a> {
    signal: &'a str,
    group: Option<&'a str>,
    weight: f64,
    contribution: f64,
}

impl ScoringEngine {
    /// Creates a scorer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes every declared score, the confidence, and the reasons.
    #[must_use]
    pub fn score(&self, signals: &SignalSet, policy: &PolicyConfig) -> ScoreSheet {
        let mut diagnostics = Diagnostics::new();
        let mut usable: BTreeSet<&str> = BTreeSet::new();
        let mut unusable: BTreeSet<&str> = BTreeSet::new();
        let mut agreements = Vec::new();
        let mut evaluations = Vec::with_capacity(policy.scores.len());

        for spec in &policy.scores {
            let weights = normalized_weights(spec, &mut diagnostics);
            let mut present = Vec::new();

            for (input, weight) in spec.inputs.iter().zip(weights) {
                let Some(value) = signals.get(&input.signal) else {
                    continue;
                };
                match contribution_of(&input.contribution, value) {
                    Ok((contribution, raw)) => {
                        if let Some(raw) = raw {
                            diagnostics.push(
                                DiagnosticKind::SignalClamped,
                                &input.signal,
                                format!("value {raw} outside the declared domain; clamped"),
                            );
                        }
                        usable.insert(&input.signal);
                        present.push(Present {
                            signal: &input.signal,
                            group: input.group.as_deref(),
                            weight,
                            contribution,
                        });
                    }
                    Err(reason) => {
                        if unusable.insert(&input.signal) {
                            diagnostics.push(DiagnosticKind::SignalUnusable, &input.signal, reason);
                        }
                    }
                }
            }

            agreements.extend(group_agreements(&present));
            evaluations.push(evaluate(spec, &present, &mut diagnostics));
        }

        let expected = policy.expected_signals();
        let missing: Vec<&str> = expected
            .iter()
            .copied()
            .filter(|signal| !usable.contains(signal))
            .collect();
        for signal in missing.iter().filter(|signal| !unusable.contains(*signal)) {
            diagnostics.push(
                DiagnosticKind::SignalMissing,
                *signal,
                "expected signal not supplied; contributes zero weight",
            );
        }

        #[allow(clippy::cast_precision_loss)]
        let coverage = if expected.is_empty() {
            0.0
        } else {
            (expected.len() - missing.len()) as f64 / expected.len() as f64
        };
        #[allow(clippy::cast_precision_loss)]
        let agreement = if agreements.is_empty() {
            1.0
        } else {
            agreements.iter().sum::<f64>() / agreements.len() as f64
        };
        let confidence = policy.confidence.evaluate(coverage, agreement);

        let dominant = dominant_index(policy, &evaluations);
        let reasons = explain(
            dominant.map(|index| &evaluations[index]),
            usable.is_empty(),
            &missing,
        );

        debug!(
            agent = %policy.agent,
            coverage,
            agreement,
            confidence,
            "scoring complete"
        );

        ScoreSheet {
            scores: evaluations
                .iter()
                .map(|evaluation| (evaluation.name.to_owned(), evaluation.score))
                .collect(),
            confidence,
            coverage,
            agreement,
            dominant: dominant.map(|index| evaluations[index].name.to_owned()),
            reasons,
            diagnostics,
        }
    }
}

fn normalized_weights(spec: &ScoreSpec, diagnostics: &mut Diagnostics) -> Vec<f64> {
    let total: f64 = spec.inputs.iter().map(|input| input.weight).sum();
    if total <= 0.0 {
        diagnostics.push(
            DiagnosticKind::WeightsNormalized,
            &spec.name,
            "weights sum to zero; using equal weights",
        );
        #[allow(clippy::cast_precision_loss)]
        let equal = 1.0 / spec.inputs.len().max(1) as f64;
        return vec![equal; spec.inputs.len()];
    }
    if (total - 1.0).abs() > WEIGHT_TOLERANCE {
        diagnostics.push(
            DiagnosticKind::WeightsNormalized,
            &spec.name,
            format!("weights sum to {total:.4}; normalised to 1.0"),
        );
    }
    spec.inputs.iter().map(|input| input.weight / total).collect()
}

/// Maps a signal value through its contribution function. On success the
/// second element holds the raw value when clamping was needed.
fn contribution_of(
    contribution: &Contribution,
    value: &SignalValue,
) -> Result<(f64, Option<f64>), String> {
    match contribution {
        Contribution::Linear { min, max, invert } => {
            let raw = value
                .as_number()
                .ok_or_else(|| format!("expected a number, got a {}", value.kind()))?;
            if !raw.is_finite() {
                return Err(format!("non-finite value {raw}"));
            }
            let scaled = (raw - min) / (max - min);
            let clamped = scaled.clamp(0.0, 1.0);
            let contribution = if *invert { 1.0 - clamped } else { clamped };
            let was_clamped = scaled < 0.0 || scaled > 1.0;
            Ok((contribution, was_clamped.then_some(raw)))
        }
        Contribution::Categorical { map } => {
            let label = value
                .as_label()
                .ok_or_else(|| format!("expected a label, got a {}", value.kind()))?;
            map.get(label)
                .or_else(|| map.get(label.trim().to_lowercase().as_str()))
                .map(|contribution| (*contribution, None))
                .ok_or_else(|| format!("unknown label `{label}`"))
        }
        Contribution::Flag {
            when_true,
            when_false,
        } => {
            let flag = value
                .as_flag()
                .ok_or_else(|| format!("expected a flag, got a {}", value.kind()))?;
            Ok((if flag { *when_true } else { *when_false }, None))
        }
    }
}

fn group_agreements(present: &[Present<'_>]) -> Vec<f64> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for entry in present {
        if let Some(group) = entry.group {
            groups.entry(group).or_default().push(entry.contribution);
        }
    }
    groups
        .values()
        .filter(|members| members.len() > 1)
        .map(|members| {
            let high = members.iter().copied().fold(f64::MIN, f64::max);
            let low = members.iter().copied().fold(f64::MAX, f64::min);
            1.0 - (high - low)
        })
        .collect()
}

fn evaluate<'a>(
    spec: &'a ScoreSpec,
    present: &[Present<'a>],
    diagnostics: &mut Diagnostics,
) -> Evaluation<'a> {
    if present.is_empty() {
        let (score, _) = Score::clamped(spec.range, spec.default);
        return Evaluation {
            name: &spec.name,
            score,
            degraded: true,
            drivers: Vec::new(),
        };
    }

    let weighted_sum: f64 = present.iter().map(|p| p.weight * p.contribution).sum();
    let present_weight: f64 = present.iter().map(|p| p.weight).sum();
    let aggregate = match spec.missing {
        MissingSignals::Zero => weighted_sum,
        MissingSignals::Renormalize if present_weight > 0.0 => weighted_sum / present_weight,
        MissingSignals::Renormalize => 0.0,
    };
    let unit = spec.transform.apply(aggregate);
    let (score, raw) = Score::clamped(spec.range, unit * spec.range.upper());
    if let Some(raw) = raw {
        diagnostics.push(
            DiagnosticKind::SignalClamped,
            &spec.name,
            format!("score {raw} outside [0, {}]; clamped", spec.range.upper()),
        );
    }

    let mut drivers: Vec<Driver<'a>> = present
        .iter()
        .map(|p| Driver {
            signal: p.signal,
            weighted: p.weight * p.contribution,
        })
        .collect();
    drivers.sort_by(|a, b| {
        b.weighted
            .total_cmp(&a.weighted)
            .then_with(|| a.signal.cmp(b.signal))
    });
    drivers.truncate(MAX_DRIVERS);

    Evaluation {
        name: &spec.name,
        score,
        degraded: false,
        drivers,
    }
}

fn dominant_index(policy: &PolicyConfig, evaluations: &[Evaluation<'_>]) -> Option<usize> {
    // Degraded scores only lead when nothing was computed from signals.
    let any_driven = evaluations.iter().any(|e| !e.degraded);
    let eligible = |e: &Evaluation<'_>| !(any_driven && e.degraded);

    if let Some(primary) = &policy.primary_score {
        if let Some(index) = evaluations
            .iter()
            .position(|e| e.name == primary && eligible(e))
        {
            return Some(index);
        }
    }
    let mut best: Option<(usize, f64)> = None;
    for (index, evaluation) in evaluations.iter().enumerate() {
        if !eligible(evaluation) {
            continue;
        }
        let normalized = evaluation.score.normalized();
        if best.is_none_or(|(_, value)| normalized > value) {
            best = Some((index, normalized));
        }
    }
    best.map(|(index, _)| index)
}

fn format_score(score: Score) -> String {
    match score.range() {
        ScoreRange::Unit => format!("{:.2}", score.value()),
        ScoreRange::Percent => format!("{:.0}", score.value()),
    }
}

fn explain(dominant: Option<&Evaluation<'_>>, nothing_usable: bool, missing: &[&str]) -> Vec<String> {
    let mut reasons = Vec::new();

    if nothing_usable {
        reasons.push(NO_SIGNALS_REASON.to_owned());
    } else if let Some(evaluation) = dominant {
        if evaluation.degraded {
            reasons.push(format!(
                "{} {} is a degraded default; none of its signals were present",
                evaluation.name,
                format_score(evaluation.score)
            ));
        } else {
            for driver in &evaluation.drivers {
                reasons.push(format!(
                    "{} {} driven by {} (weighted contribution {:.2})",
                    evaluation.name,
                    format_score(evaluation.score),
                    driver.signal,
                    driver.weighted
                ));
            }
        }
    }

    if !missing.is_empty() {
        reasons.push(format!("missing signals: {}", missing.join(", ")));
    }

    reasons
}
