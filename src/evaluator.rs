// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Evaluation orchestration: metrics in, scored feedback out.
//!
//! The [`Evaluator`] runs measured values through scoring strategies and
//! aggregates them with weighted means, measurement to stage to action. It
//! supports full evaluation and incremental re-evaluation of a subset of
//! stages, where every untouched stage is carried over from the previous
//! result bit for bit and only the overall score and summary are
//! recomputed.
//!
//! The evaluator takes its configuration by injection and never mutates it,
//! so one process can evaluate several actions (or sports) concurrently
//! from independent evaluators.

use std::collections::HashMap;

use serde::Serialize;

use crate::feedback;
use crate::metrics::ActionMetricsResult;
use crate::refine::{RefineRequest, TextRefiner};
use crate::rules::{ActionEvaluationConfig, MeasurementRule, StageRule};
use crate::scoring::{deviation_pass, ScoreCategory, ScoringRegistry};
use crate::utils::weighted_mean;

/// One measured value at the evaluator's input boundary.
///
/// The typed counterpart of the loose mapping upstream producers emit;
/// see [`ActionMetrics::from_result`] for the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MeasurementInput {
    /// The measured value, absent when the measurement failed upstream.
    pub value: Option<f32>,
    /// Expected value supplied by the producer, used only when the rule
    /// itself carries no target.
    pub expected: Option<f32>,
}

impl MeasurementInput {
    /// Create an input carrying just a value.
    #[must_use]
    pub const fn new(value: f32) -> Self {
        Self {
            value: Some(value),
            expected: None,
        }
    }

    /// Attach a producer-supplied expected value.
    #[must_use]
    pub const fn with_expected(mut self, expected: f32) -> Self {
        self.expected = Some(expected);
        self
    }
}

/// Measurement key to input for one stage.
pub type StageMetrics = HashMap<String, MeasurementInput>;

/// Typed metrics input for one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionMetrics {
    /// Stage name to that stage's measured values.
    pub stages: HashMap<String, StageMetrics>,
}

impl ActionMetrics {
    /// Create an empty metrics container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a single measured value, builder style.
    #[must_use]
    pub fn with_value(mut self, stage: impl Into<String>, key: impl Into<String>, value: f32) -> Self {
        self.stages
            .entry(stage.into())
            .or_default()
            .insert(key.into(), MeasurementInput::new(value));
        self
    }

    /// Insert a measurement input in place.
    pub fn insert(&mut self, stage: impl Into<String>, key: impl Into<String>, input: MeasurementInput) {
        self.stages
            .entry(stage.into())
            .or_default()
            .insert(key.into(), input);
    }

    /// Adapt a measurement-engine result into evaluator input.
    ///
    /// Only successful measurements contribute a value; missing and invalid
    /// ones become inputs with no value, which the evaluator treats as "no
    /// contribution" rather than zero.
    ///
    /// # Arguments
    ///
    /// * `result` - Output of [`crate::metrics::MetricsEngine::compute_action`].
    ///
    /// # Returns
    ///
    /// * The converted metrics.
    #[must_use]
    pub fn from_result(result: &ActionMetricsResult) -> Self {
        let mut metrics = Self::new();
        for (stage_name, stage_result) in &result.stages {
            let stage = metrics.stages.entry(stage_name.clone()).or_default();
            for (key, measurement) in &stage_result.measurements {
                stage.insert(
                    key.clone(),
                    MeasurementInput {
                        value: measurement.value,
                        expected: None,
                    },
                );
            }
        }
        metrics
    }
}

/// Evaluation of one measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementEvaluation {
    /// Machine key of the measurement rule.
    pub key: String,
    /// Measured value, absent when the metric was missing.
    pub value: Option<f32>,
    /// Expected value: the rule's target, else the producer-supplied one.
    pub expected: Option<f32>,
    /// Absolute deviation of value from expected, when both are present.
    pub deviation: Option<f32>,
    /// Normalized score in [0, 1], absent without a value.
    pub score: Option<f32>,
    /// Tri-state pass/fail; `None` when undefined (no target or no value).
    pub passed: Option<bool>,
    /// Localized feedback text.
    pub feedback: String,
}

/// Evaluation of one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageEvaluation {
    /// Stage name from the configuration.
    pub name: String,
    /// Measurement evaluations in configured order.
    pub measurements: Vec<MeasurementEvaluation>,
    /// Weighted mean of measurement scores; `None` when nothing contributed.
    pub score: Option<f32>,
    /// Localized stage feedback.
    pub feedback: String,
}

/// Immutable snapshot of one evaluation pass over an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionEvaluation {
    /// Action identifier from the configuration.
    pub action_name: String,
    /// Stage evaluations in configured order.
    pub stages: Vec<StageEvaluation>,
    /// Weighted mean of stage scores; `None` when nothing contributed.
    pub score: Option<f32>,
    /// Localized overall summary.
    pub summary: String,
    /// Optional refined sibling of `summary`; never replaces it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refined_summary: Option<String>,
    /// Locale the feedback was generated in.
    pub language: String,
}

impl ActionEvaluation {
    /// Look up a stage evaluation by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageEvaluation> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Category of the overall score.
    #[must_use]
    pub fn category(&self) -> ScoreCategory {
        ScoreCategory::from_score(self.score)
    }
}

/// Runs metrics through scoring and aggregation for one configuration.
pub struct Evaluator {
    config: ActionEvaluationConfig,
    scoring: ScoringRegistry,
    refiner: Option<Box<dyn TextRefiner>>,
}

impl Evaluator {
    /// Create an evaluator for a configuration with default scoring.
    #[must_use]
    pub fn new(config: ActionEvaluationConfig) -> Self {
        Self {
            config,
            scoring: ScoringRegistry::new(),
            refiner: None,
        }
    }

    /// Replace the scoring registry.
    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringRegistry) -> Self {
        self.scoring = scoring;
        self
    }

    /// Install a summary refiner.
    ///
    /// Used only when the configuration enables refinement, and only for
    /// the summary string; numeric results are out of its reach.
    #[must_use]
    pub fn with_refiner(mut self, refiner: impl TextRefiner + 'static) -> Self {
        self.refiner = Some(Box::new(refiner));
        self
    }

    /// The injected configuration.
    #[must_use]
    pub const fn config(&self) -> &ActionEvaluationConfig {
        &self.config
    }

    fn evaluate_measurement(
        &self,
        rule: &MeasurementRule,
        input: Option<&MeasurementInput>,
    ) -> MeasurementEvaluation {
        let value = input.and_then(|i| i.value);
        let expected = rule.target.or_else(|| input.and_then(|i| i.expected));
        let deviation = match (value, expected) {
            (Some(v), Some(e)) => Some((v - e).abs()),
            _ => None,
        };
        let passed = value.and_then(|v| deviation_pass(rule, v));
        let score = value.map(|v| {
            self.scoring
                .resolve(rule, self.config.enable_scoring)
                .score(rule, v)
        });

        let mut evaluation = MeasurementEvaluation {
            key: rule.key.clone(),
            value,
            expected,
            deviation,
            score,
            passed,
            feedback: String::new(),
        };
        evaluation.feedback =
            feedback::measurement_feedback(rule, &evaluation, &self.config.language);
        evaluation
    }

    fn evaluate_stage(
        &self,
        stage_rule: &StageRule,
        stage_metrics: Option<&StageMetrics>,
    ) -> StageEvaluation {
        let measurements: Vec<MeasurementEvaluation> = stage_rule
            .measurements
            .iter()
            .map(|rule| {
                self.evaluate_measurement(rule, stage_metrics.and_then(|m| m.get(&rule.key)))
            })
            .collect();

        let score = weighted_mean(
            stage_rule
                .measurements
                .iter()
                .zip(&measurements)
                .filter_map(|(rule, evaluation)| evaluation.score.map(|s| (s, rule.weight))),
        );

        let feedback =
            feedback::stage_feedback(stage_rule, &measurements, &self.config.language);

        StageEvaluation {
            name: stage_rule.name.clone(),
            measurements,
            score,
            feedback,
        }
    }

    fn finalize(&self, stages: Vec<StageEvaluation>) -> ActionEvaluation {
        let score = weighted_mean(stages.iter().filter_map(|stage| {
            let weight = self.config.stage(&stage.name).map(|rule| rule.weight)?;
            stage.score.map(|s| (s, weight))
        }));

        let category = ScoreCategory::from_score(score);
        let summary =
            feedback::action_summary(&self.config.action_name, category, &self.config.language);

        let refined_summary = if self.config.enable_llm_refine {
            match &self.refiner {
                Some(refiner) if refiner.available() => {
                    let mut request =
                        RefineRequest::new(summary.clone(), self.config.language.clone());
                    if let Some(style) = &self.config.llm_style {
                        request = request.with_style(style.clone());
                    }
                    Some(refiner.refine(&request))
                }
                Some(refiner) => {
                    tracing::debug!(
                        target: "technique::evaluator",
                        reason = refiner.reason_unavailable().as_deref().unwrap_or("unknown"),
                        "refiner unavailable, keeping raw summary"
                    );
                    None
                }
                None => None,
            }
        } else {
            None
        };

        tracing::debug!(
            target: "technique::evaluator",
            action = %self.config.action_name,
            stages = stages.len(),
            score = ?score,
            category = %category,
            "evaluation finalized"
        );

        ActionEvaluation {
            action_name: self.config.action_name.clone(),
            stages,
            score,
            summary,
            refined_summary,
            language: self.config.language.clone(),
        }
    }

    /// Evaluate every configured stage against the supplied metrics.
    ///
    /// Stages and measurements absent from `metrics` evaluate with no value
    /// (and thus no score); nothing aborts the pass.
    ///
    /// # Arguments
    ///
    /// * `metrics` - Measured values keyed by stage and measurement key.
    ///
    /// # Returns
    ///
    /// * A fresh [`ActionEvaluation`] snapshot.
    #[must_use]
    pub fn evaluate(&self, metrics: &ActionMetrics) -> ActionEvaluation {
        let stages: Vec<StageEvaluation> = self
            .config
            .stages
            .iter()
            .map(|stage_rule| self.evaluate_stage(stage_rule, metrics.stages.get(&stage_rule.name)))
            .collect();
        self.finalize(stages)
    }

    /// Re-evaluate only the named stages, reusing the rest of a previous
    /// evaluation.
    ///
    /// With no previous evaluation this is a full [`Evaluator::evaluate`].
    /// Otherwise each updated name matching a configured stage is recomputed
    /// from `metrics`; every other stage is carried over from `previous`
    /// unchanged. Configured stages missing from `previous` are computed
    /// fresh defensively. The result lists stages in configured order
    /// regardless of update order, and the overall score and summary are
    /// always recomputed from the final stage list. Names matching no
    /// configured stage are silently ignored.
    ///
    /// # Arguments
    ///
    /// * `previous` - The evaluation to reuse untouched stages from.
    /// * `updated_stage_names` - Stage names to recompute.
    /// * `metrics` - Measured values for the recomputed stages.
    ///
    /// # Returns
    ///
    /// * A new [`ActionEvaluation`] snapshot; `previous` is never mutated.
    #[must_use]
    pub fn evaluate_incremental(
        &self,
        previous: Option<&ActionEvaluation>,
        updated_stage_names: &[&str],
        metrics: &ActionMetrics,
    ) -> ActionEvaluation {
        let Some(previous) = previous else {
            return self.evaluate(metrics);
        };

        let mut working: HashMap<String, StageEvaluation> = previous
            .stages
            .iter()
            .map(|stage| (stage.name.clone(), stage.clone()))
            .collect();

        for name in updated_stage_names {
            if let Some(stage_rule) = self.config.stage(name) {
                working.insert(
                    stage_rule.name.clone(),
                    self.evaluate_stage(stage_rule, metrics.stages.get(&stage_rule.name)),
                );
            }
        }

        // Rebuild the ordered list according to config order
        let stages: Vec<StageEvaluation> = self
            .config
            .stages
            .iter()
            .map(|stage_rule| {
                working.remove(&stage_rule.name).unwrap_or_else(|| {
                    self.evaluate_stage(stage_rule, metrics.stages.get(&stage_rule.name))
                })
            })
            .collect();

        self.finalize(stages)
    }
}
