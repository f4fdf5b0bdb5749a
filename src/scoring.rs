// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pluggable scoring strategies.
//!
//! A strategy maps a (rule, raw value) pair to a normalized score in
//! [0, 1]. Strategies are registered by name in a [`ScoringRegistry`]; rules
//! select one explicitly via `score_strategy`, fall back to `linear`, and
//! are forced to `none` when scoring is globally disabled so an intentional
//! off-switch never penalizes anyone.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::rules::{BandLevel, MeasurementRule};

/// Strategy name: constant 1.0, used when scoring is disabled.
pub const STRATEGY_NONE: &str = "none";
/// Strategy name: tolerance plateau with a linear ramp to zero (default).
pub const STRATEGY_LINEAR: &str = "linear";
/// Strategy name: stepped credit from nested quality bands.
pub const STRATEGY_BANDED: &str = "banded";

/// Maps a measured value to a normalized score in [0, 1] for a rule.
pub trait ScoreStrategy: Send + Sync {
    /// Score `value` against `rule`'s criteria.
    fn score(&self, rule: &MeasurementRule, value: f32) -> f32;
}

impl<F> ScoreStrategy for F
where
    F: Fn(&MeasurementRule, f32) -> f32 + Send + Sync,
{
    fn score(&self, rule: &MeasurementRule, value: f32) -> f32 {
        self(rule, value)
    }
}

/// Always returns 1.0.
///
/// Installed for every measurement when scoring is globally disabled, so a
/// deliberately unscored run reads as passing rather than failing.
fn score_none(_rule: &MeasurementRule, _value: f32) -> f32 {
    1.0
}

/// Default strategy: plateau inside tolerance, linear ramp to zero.
///
/// With `target`/`tolerance` configured, the score is 1.0 while the
/// deviation stays within tolerance, then falls linearly to 0.0 at exactly
/// three times the tolerance. With only `min_value`/`max_value`, the value
/// is clamped into the range and normalized across it. With neither, the
/// score is a neutral 1.0, distinguishable from a genuine perfect score
/// only by the rule's missing criteria.
fn score_linear(rule: &MeasurementRule, value: f32) -> f32 {
    if let (Some(target), Some(tolerance)) = (rule.target, rule.tolerance) {
        let deviation = (value - target).abs();
        if deviation <= tolerance {
            return 1.0;
        }
        if deviation >= 3.0 * tolerance {
            return 0.0;
        }
        return 1.0 - (deviation - tolerance) / (2.0 * tolerance);
    }

    if let (Some(min), Some(max)) = (rule.min_value, rule.max_value) {
        if max > min {
            let clamped = value.clamp(min, max);
            return (clamped - min) / (max - min);
        }
    }

    1.0
}

/// Stepped credit from nested quality bands.
///
/// 1.0 / 0.75 / 0.5 inside the excellent / good / acceptable band, 0.0
/// outside all bands. Falls back to [`score_linear`] when the rule carries
/// no bands.
fn score_banded(rule: &MeasurementRule, value: f32) -> f32 {
    match &rule.bands {
        Some(bands) => match bands.classify(value) {
            Some(BandLevel::Excellent) => 1.0,
            Some(BandLevel::Good) => 0.75,
            Some(BandLevel::Acceptable) => 0.5,
            None => 0.0,
        },
        None => score_linear(rule, value),
    }
}

/// Tri-state pass/fail against the rule's target and tolerance.
///
/// # Arguments
///
/// * `rule` - The measurement rule.
/// * `value` - The measured value.
///
/// # Returns
///
/// * `None` when no target/tolerance is configured (pass/fail undefined),
///   otherwise whether the deviation stays within tolerance.
#[must_use]
pub fn deviation_pass(rule: &MeasurementRule, value: f32) -> Option<bool> {
    match (rule.target, rule.tolerance) {
        (Some(target), Some(tolerance)) => Some((value - target).abs() <= tolerance),
        _ => None,
    }
}

/// Named scoring strategies with built-ins registered.
pub struct ScoringRegistry {
    strategies: HashMap<String, Box<dyn ScoreStrategy>>,
}

impl Default for ScoringRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringRegistry {
    /// Create a registry with `none`, `linear` and `banded` registered.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            strategies: HashMap::new(),
        };
        registry.register(STRATEGY_NONE, score_none);
        registry.register(STRATEGY_LINEAR, score_linear);
        registry.register(STRATEGY_BANDED, score_banded);
        registry
    }

    /// Register a strategy under a name, replacing any existing one.
    pub fn register(&mut self, name: impl Into<String>, strategy: impl ScoreStrategy + 'static) {
        self.strategies.insert(name.into(), Box::new(strategy));
    }

    /// Check whether a strategy name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Resolve the strategy for a rule.
    ///
    /// When `enable_scoring` is false every rule resolves to `none`
    /// regardless of its own setting; otherwise the rule's explicit,
    /// registered `score_strategy` wins, falling back to `linear`.
    ///
    /// # Arguments
    ///
    /// * `rule` - The measurement rule.
    /// * `enable_scoring` - The configuration's global scoring switch.
    ///
    /// # Returns
    ///
    /// * The resolved strategy.
    ///
    /// # Panics
    ///
    /// Panics if the built-in `none`/`linear` strategies were removed, which
    /// the registry API does not allow.
    #[must_use]
    pub fn resolve(&self, rule: &MeasurementRule, enable_scoring: bool) -> &dyn ScoreStrategy {
        let name = if enable_scoring {
            rule.score_strategy
                .as_deref()
                .filter(|name| self.strategies.contains_key(*name))
                .unwrap_or(STRATEGY_LINEAR)
        } else {
            STRATEGY_NONE
        };
        self.strategies
            .get(name)
            .expect("built-in strategy registered in new()")
            .as_ref()
    }
}

/// Natural-language category derived from an aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    /// Score at or above 0.8.
    Good,
    /// Score in [0.4, 0.8), or no score at all (indeterminate).
    Mixed,
    /// Score below 0.4.
    Poor,
}

impl ScoreCategory {
    /// Categorize an optional aggregate score.
    ///
    /// A missing score maps to [`ScoreCategory::Mixed`]: indeterminate, not
    /// failing.
    #[must_use]
    pub fn from_score(score: Option<f32>) -> Self {
        match score {
            Some(s) if s >= 0.8 => Self::Good,
            Some(s) if s < 0.4 => Self::Poor,
            _ => Self::Mixed,
        }
    }

    /// Returns the string representation used in templates and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Mixed => "mixed",
            Self::Poor => "poor",
        }
    }
}

impl fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
