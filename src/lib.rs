// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Ultralytics Technique Evaluation Library
//!
//! Rule-based sports technique evaluation over pose keypoints, written in
//! Rust. Given a detected [`Pose`] per movement stage and a data-driven
//! [`ActionEvaluationConfig`], the library computes biomechanical
//! measurements (joint angles, distances, directional offsets), scores them
//! with pluggable strategies, aggregates the scores with weighted means up
//! to a single action score, and generates localized natural-language
//! feedback at every level.
//!
//! ## Features
//!
//! - **Measurement Engine** - Angle, distance, height and directional offset
//!   measurements over named skeletal landmarks, extensible by type name
//! - **Data-Driven Rules** - Action, stage and measurement configuration as
//!   plain data with JSON loading and an invariant validator
//! - **Pluggable Scoring** - Tolerance plateau, range and banded strategies,
//!   selectable per measurement and replaceable at runtime
//! - **Incremental Evaluation** - Re-evaluate only dirty stages while
//!   carrying every untouched stage over unchanged
//! - **Localized Feedback** - Template-based feedback in English and
//!   Chinese with deterministic locale fallback
//! - **Best-Effort Refinement** - Optional summary polishing behind a
//!   fail-safe interface that can never change a score
//!
//! ## Quick Start
//!
//! ```rust
//! use technique::{ActionEvaluationConfig, ActionMetrics, Evaluator};
//!
//! // The built-in badminton forehand clear rule-set
//! let config = ActionEvaluationConfig::forehand_clear();
//! let evaluator = Evaluator::new(config);
//!
//! let metrics = ActionMetrics::new()
//!     .with_value("power", "elbow_extension", 160.0)
//!     .with_value("power", "contact_height", 55.0);
//!
//! let evaluation = evaluator.evaluate(&metrics);
//! for stage in &evaluation.stages {
//!     println!("{}: {:?}", stage.name, stage.score);
//! }
//! println!("{}", evaluation.summary);
//! ```
//!
//! ## Measuring Poses
//!
//! Poses come from any upstream detector that names its keypoints; the
//! engine turns them into the metrics the evaluator consumes:
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use technique::keypoint::parts;
//! use technique::{ActionEvaluationConfig, ActionMetrics, Keypoint, MetricsEngine, Pose};
//!
//! let config = ActionEvaluationConfig::forehand_clear();
//! let engine = MetricsEngine::new();
//!
//! let pose = Pose::new(42)
//!     .with_point(parts::RIGHT_SHOULDER, Keypoint::new(310.0, 220.0, 0.93))
//!     .with_point(parts::RIGHT_ELBOW, Keypoint::new(370.0, 250.0, 0.91))
//!     .with_point(parts::RIGHT_WRIST, Keypoint::new(400.0, 190.0, 0.88));
//!
//! let mut poses = HashMap::new();
//! poses.insert("setup".to_string(), pose);
//!
//! let result = engine.compute_action(&config, &poses);
//! let metrics = ActionMetrics::from_result(&result);
//! ```
//!
//! ## Incremental Re-Evaluation
//!
//! When only some stages changed (say the user re-recorded the power
//! stage), re-evaluate just those; everything else is carried over from the
//! previous snapshot bit for bit:
//!
//! ```rust
//! use technique::{ActionEvaluationConfig, ActionMetrics, Evaluator};
//!
//! let evaluator = Evaluator::new(ActionEvaluationConfig::forehand_clear());
//! let first = evaluator.evaluate(&ActionMetrics::new().with_value(
//!     "power",
//!     "elbow_extension",
//!     150.0,
//! ));
//!
//! let better = ActionMetrics::new().with_value("power", "elbow_extension", 165.0);
//! let second = evaluator.evaluate_incremental(Some(&first), &["power"], &better);
//! assert_eq!(second.stage("setup"), first.stage("setup"));
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`keypoint`] | [`Pose`] and [`Keypoint`] data model with COCO part names |
//! | [`rules`] | Rule/configuration model, JSON loading and the validator |
//! | [`metrics`] | [`MetricsEngine`] measurement computations |
//! | [`scoring`] | Scoring strategies and the [`ScoringRegistry`] |
//! | [`evaluator`] | [`Evaluator`] full + incremental evaluation |
//! | [`feedback`] | Localized template-based feedback |
//! | [`refine`] | Fail-safe summary refinement hooks |
//! | [`error`] | Error types ([`TechniqueError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `llm` | Network-backed summary refinement via an LLM endpoint |

// Modules
pub mod error;
pub mod evaluator;
pub mod feedback;
pub mod keypoint;
pub mod metrics;
pub mod refine;
pub mod rules;
pub mod scoring;
pub mod utils;

// Re-export main types for convenience
pub use error::{Result, TechniqueError};
pub use evaluator::{
    ActionEvaluation, ActionMetrics, Evaluator, MeasurementEvaluation, MeasurementInput,
    StageEvaluation, StageMetrics,
};
pub use keypoint::{Keypoint, Pose};
pub use metrics::{
    ActionMetricsResult, MeasurementStatus, MeasurementValue, MetricsEngine, StageMetricsResult,
};
pub use refine::{CachedRefiner, DisabledRefiner, LocalRefiner, RefineRequest, TextRefiner};
pub use rules::{
    validate_config, ActionEvaluationConfig, Direction, MeasurementRule, ScoreBands, StageRule,
};
pub use scoring::{deviation_pass, ScoreCategory, ScoreStrategy, ScoringRegistry};

#[cfg(feature = "llm")]
#[cfg_attr(docsrs, doc(cfg(feature = "llm")))]
pub use refine::LlmRefiner;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        // Version should be semver format like "0.1.0"
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "ultralytics-technique");
    }
}
