// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Rule and configuration model.
//!
//! An action is evaluated against a hierarchical configuration: an
//! [`ActionEvaluationConfig`] holds ordered [`StageRule`]s, each holding
//! ordered [`MeasurementRule`]s. Rule definitions are data, not code: they
//! can be built in-process with the builder methods here or loaded from
//! JSON, and [`validate_config`] reports invariant violations over any
//! externally-loaded configuration without silently correcting them.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::keypoint::parts;

/// Tolerance used when checking that sibling weights sum to 1.0.
pub const WEIGHT_SUM_TOLERANCE: f32 = 0.01;

/// Built-in measurement type names.
///
/// The measurement engine registers a handler for each of these; additional
/// type names may be registered at runtime without touching the built-ins.
pub mod measurement_types {
    /// Angle at a vertex between three ordered keypoints, in degrees.
    pub const ANGLE: &str = "angle";
    /// Euclidean distance between two keypoints.
    pub const DISTANCE: &str = "distance";
    /// Signed height of a target keypoint above a reference point.
    pub const HEIGHT: &str = "height";
    /// Height with a configurable sign convention.
    pub const VERTICAL_DISTANCE: &str = "vertical_distance";
    /// Horizontal offset with a configurable sign convention.
    pub const HORIZONTAL_DISTANCE: &str = "horizontal_distance";
}

/// Directional convention for offset measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Positive means the target is above the reference.
    Up,
    /// Positive means the target is below the reference.
    Down,
    /// Positive means the target is forward of the reference (+x).
    Forward,
    /// Positive means the target is behind the reference (-x).
    Back,
    /// Alias of [`Direction::Back`].
    Backward,
}

impl Direction {
    /// Returns the string representation used in rule configurations.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Forward => "forward",
            Self::Back => "back",
            Self::Backward => "backward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Direction {
    type Err = DirectionParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "forward" => Ok(Self::Forward),
            "back" => Ok(Self::Back),
            "backward" => Ok(Self::Backward),
            _ => Err(DirectionParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid direction string.
#[derive(Debug, Clone)]
pub struct DirectionParseError(String);

impl fmt::Display for DirectionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid direction '{}', expected one of: up, down, forward, back, backward",
            self.0
        )
    }
}

impl std::error::Error for DirectionParseError {}

/// Nested quality bands for the richer banded scoring variant.
///
/// Each band is an inclusive `(low, high)` value range; a valid
/// configuration nests them as excellent ⊆ good ⊆ acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBands {
    /// Tightest range, full credit.
    pub excellent: (f32, f32),
    /// Middle range.
    pub good: (f32, f32),
    /// Widest range still earning partial credit.
    pub acceptable: (f32, f32),
}

/// Band a measured value falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandLevel {
    /// Inside the excellent range.
    Excellent,
    /// Inside the good range (but not excellent).
    Good,
    /// Inside the acceptable range (but not good).
    Acceptable,
}

impl ScoreBands {
    /// Classify a value into the tightest band containing it.
    ///
    /// # Arguments
    ///
    /// * `value` - The measured value.
    ///
    /// # Returns
    ///
    /// * The tightest matching [`BandLevel`], or `None` when the value falls
    ///   outside every band.
    #[must_use]
    pub fn classify(&self, value: f32) -> Option<BandLevel> {
        let within = |range: (f32, f32)| value >= range.0 && value <= range.1;
        if within(self.excellent) {
            Some(BandLevel::Excellent)
        } else if within(self.good) {
            Some(BandLevel::Good)
        } else if within(self.acceptable) {
            Some(BandLevel::Acceptable)
        } else {
            None
        }
    }
}

fn default_weight() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

/// A configured recipe for computing and scoring one biomechanical quantity.
///
/// `key` is the stable machine key used for metric lookups, caching and
/// incremental diffing; the locale-keyed `description` map is the display
/// layer, resolved only at feedback-generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRule {
    /// Stable machine key, unique within its stage.
    pub key: String,
    /// Measurement type name (see [`measurement_types`]).
    pub measurement_type: String,
    /// Ordered body-part names consumed by the measurement.
    #[serde(default)]
    pub keypoints: Vec<String>,
    /// Reference point for height/offset measurements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_point: Option<String>,
    /// Directional sign convention for offset measurements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Unit label carried through to results and feedback.
    #[serde(default)]
    pub unit: String,
    /// Ideal value for deviation scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f32>,
    /// Full-credit deviation radius around `target`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f32>,
    /// Lower bound for range scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f32>,
    /// Upper bound for range scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f32>,
    /// Relative weight within the stage.
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Explicit scoring strategy name; defaults to `linear` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_strategy: Option<String>,
    /// Optional nested quality bands for the `banded` strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bands: Option<ScoreBands>,
    /// Locale code to display name.
    #[serde(default)]
    pub description: HashMap<String, String>,
    /// Locale code to corrective advice.
    #[serde(default)]
    pub advice: HashMap<String, String>,
}

impl MeasurementRule {
    /// Create a rule with the given key and measurement type.
    ///
    /// # Arguments
    ///
    /// * `key` - Stable machine key.
    /// * `measurement_type` - Measurement type name (see [`measurement_types`]).
    ///
    /// # Returns
    ///
    /// * A new `MeasurementRule` with weight 1.0 and no scoring criteria.
    #[must_use]
    pub fn new(key: impl Into<String>, measurement_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            measurement_type: measurement_type.into(),
            keypoints: Vec::new(),
            reference_point: None,
            direction: None,
            unit: String::new(),
            target: None,
            tolerance: None,
            min_value: None,
            max_value: None,
            weight: 1.0,
            score_strategy: None,
            bands: None,
            description: HashMap::new(),
            advice: HashMap::new(),
        }
    }

    /// Set the ordered keypoint names.
    #[must_use]
    pub fn with_keypoints(mut self, keypoints: &[&str]) -> Self {
        self.keypoints = keypoints.iter().map(ToString::to_string).collect();
        self
    }

    /// Set the reference point.
    #[must_use]
    pub fn with_reference_point(mut self, part: impl Into<String>) -> Self {
        self.reference_point = Some(part.into());
        self
    }

    /// Set the directional sign convention.
    #[must_use]
    pub const fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Set the unit label.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Set target and tolerance for deviation scoring.
    #[must_use]
    pub const fn with_target(mut self, target: f32, tolerance: f32) -> Self {
        self.target = Some(target);
        self.tolerance = Some(tolerance);
        self
    }

    /// Set min/max bounds for range scoring.
    #[must_use]
    pub const fn with_range(mut self, min_value: f32, max_value: f32) -> Self {
        self.min_value = Some(min_value);
        self.max_value = Some(max_value);
        self
    }

    /// Set the relative weight within the stage.
    #[must_use]
    pub const fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Select an explicit scoring strategy by name.
    #[must_use]
    pub fn with_strategy(mut self, name: impl Into<String>) -> Self {
        self.score_strategy = Some(name.into());
        self
    }

    /// Attach nested quality bands.
    #[must_use]
    pub const fn with_bands(mut self, bands: ScoreBands) -> Self {
        self.bands = Some(bands);
        self
    }

    /// Add a localized display name.
    #[must_use]
    pub fn with_description(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.description.insert(locale.into(), text.into());
        self
    }

    /// Add localized corrective advice.
    #[must_use]
    pub fn with_advice(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.advice.insert(locale.into(), text.into());
        self
    }

    /// All body-part names this rule resolves against a pose.
    pub fn required_points(&self) -> impl Iterator<Item = &str> {
        self.keypoints
            .iter()
            .map(String::as_str)
            .chain(self.reference_point.as_deref())
    }

    /// Whether deviation-based pass/fail is defined for this rule.
    #[must_use]
    pub const fn has_target(&self) -> bool {
        self.target.is_some() && self.tolerance.is_some()
    }
}

/// A discrete phase of a technique with its own measurements and weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRule {
    /// Stable stage name, unique within the action.
    pub name: String,
    /// Ordered measurement rules.
    #[serde(default)]
    pub measurements: Vec<MeasurementRule>,
    /// Relative weight within the action.
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Locale code to display name.
    #[serde(default)]
    pub description: HashMap<String, String>,
    /// Locale code to stage-level advice.
    #[serde(default)]
    pub advice: HashMap<String, String>,
}

impl StageRule {
    /// Create an empty stage rule.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            measurements: Vec::new(),
            weight: 1.0,
            description: HashMap::new(),
            advice: HashMap::new(),
        }
    }

    /// Append a measurement rule, builder style.
    #[must_use]
    pub fn with_measurement(mut self, rule: MeasurementRule) -> Self {
        self.measurements.push(rule);
        self
    }

    /// Set the relative weight within the action.
    #[must_use]
    pub const fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Add a localized display name.
    #[must_use]
    pub fn with_description(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.description.insert(locale.into(), text.into());
        self
    }

    /// Look up a measurement rule by machine key.
    #[must_use]
    pub fn measurement(&self, key: &str) -> Option<&MeasurementRule> {
        self.measurements.iter().find(|m| m.key == key)
    }
}

/// Top-level evaluation configuration for one action.
///
/// Treated as read-only once constructed; the evaluator takes it by
/// injection so several configurations (e.g. several sports) can coexist in
/// one process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvaluationConfig {
    /// Action identifier (e.g. `forehand_clear`).
    pub action_name: String,
    /// Ordered stage rules.
    #[serde(default)]
    pub stages: Vec<StageRule>,
    /// Locale code used for generated feedback.
    #[serde(default = "default_language")]
    pub language: String,
    /// When false, every measurement scores 1.0 regardless of deviation.
    #[serde(default = "default_true")]
    pub enable_scoring: bool,
    /// When true and a refiner is installed, summaries get a refined sibling.
    #[serde(default)]
    pub enable_llm_refine: bool,
    /// Optional style hint forwarded to the refiner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_style: Option<String>,
}

impl ActionEvaluationConfig {
    /// Create an empty configuration for the given action.
    #[must_use]
    pub fn new(action_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            stages: Vec::new(),
            language: default_language(),
            enable_scoring: true,
            enable_llm_refine: false,
            llm_style: None,
        }
    }

    /// Append a stage rule, builder style.
    #[must_use]
    pub fn with_stage(mut self, stage: StageRule) -> Self {
        self.stages.push(stage);
        self
    }

    /// Set the feedback locale.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Enable or disable scoring globally.
    #[must_use]
    pub const fn with_scoring(mut self, enable: bool) -> Self {
        self.enable_scoring = enable;
        self
    }

    /// Enable or disable summary refinement.
    #[must_use]
    pub const fn with_llm_refine(mut self, enable: bool) -> Self {
        self.enable_llm_refine = enable;
        self
    }

    /// Look up a stage rule by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageRule> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Parse a configuration from a JSON string.
    ///
    /// # Arguments
    ///
    /// * `json` - JSON document matching the serde shape of this type.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or missing required fields.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Run the invariant validator over this configuration.
    ///
    /// # Returns
    ///
    /// * Human-readable violation strings; empty when the configuration is
    ///   clean. Violations never block evaluation.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        validate_config(self)
    }

    /// The badminton forehand clear rule-set the library ships with.
    ///
    /// Three stages (setup, backswing, power) measured over COCO right-arm
    /// and leg landmarks, with English and Chinese feedback text. Weights at
    /// both levels sum to 1.0.
    #[must_use]
    pub fn forehand_clear() -> Self {
        Self::new("forehand_clear")
            .with_stage(
                StageRule::new("setup")
                    .with_weight(0.2)
                    .with_description("en", "Setup")
                    .with_description("zh", "准备姿势")
                    .with_measurement(
                        MeasurementRule::new("elbow_angle", measurement_types::ANGLE)
                            .with_keypoints(&[
                                parts::RIGHT_SHOULDER,
                                parts::RIGHT_ELBOW,
                                parts::RIGHT_WRIST,
                            ])
                            .with_unit("deg")
                            .with_target(90.0, 15.0)
                            .with_weight(0.6)
                            .with_description("en", "Racket-arm elbow angle")
                            .with_description("zh", "持拍臂肘关节角度")
                            .with_advice("en", "Keep the racket-side elbow relaxed near 90 degrees.")
                            .with_advice("zh", "持拍侧肘部放松，保持约90度。"),
                    )
                    .with_measurement(
                        MeasurementRule::new("stance_width", measurement_types::DISTANCE)
                            .with_keypoints(&[parts::LEFT_ANKLE, parts::RIGHT_ANKLE])
                            .with_unit("px")
                            .with_range(60.0, 200.0)
                            .with_weight(0.4)
                            .with_description("en", "Stance width")
                            .with_description("zh", "站位宽度")
                            .with_advice("en", "Stand about shoulder width, ready to push off.")
                            .with_advice("zh", "双脚约与肩同宽，便于蹬地发力。"),
                    ),
            )
            .with_stage(
                StageRule::new("backswing")
                    .with_weight(0.4)
                    .with_description("en", "Backswing")
                    .with_description("zh", "引拍")
                    .with_measurement(
                        MeasurementRule::new("shoulder_abduction", measurement_types::ANGLE)
                            .with_keypoints(&[
                                parts::RIGHT_ELBOW,
                                parts::RIGHT_SHOULDER,
                                parts::RIGHT_HIP,
                            ])
                            .with_unit("deg")
                            .with_target(100.0, 20.0)
                            .with_weight(0.5)
                            .with_description("en", "Shoulder abduction")
                            .with_description("zh", "肩部外展角度")
                            .with_advice("en", "Raise the upper arm until it is roughly level with the shoulder.")
                            .with_advice("zh", "大臂抬起至与肩部大致持平。"),
                    )
                    .with_measurement(
                        MeasurementRule::new("wrist_above_shoulder", measurement_types::HEIGHT)
                            .with_keypoints(&[parts::RIGHT_WRIST])
                            .with_reference_point(parts::RIGHT_SHOULDER)
                            .with_unit("px")
                            .with_range(0.0, 150.0)
                            .with_weight(0.3)
                            .with_description("en", "Wrist height above shoulder")
                            .with_description("zh", "手腕高于肩部的高度")
                            .with_advice("en", "Lift the racket hand above the shoulder line.")
                            .with_advice("zh", "持拍手抬至肩线以上。"),
                    )
                    .with_measurement(
                        MeasurementRule::new("racket_drop", measurement_types::VERTICAL_DISTANCE)
                            .with_keypoints(&[parts::RIGHT_ELBOW])
                            .with_reference_point(parts::RIGHT_SHOULDER)
                            .with_direction(Direction::Down)
                            .with_unit("px")
                            .with_target(40.0, 20.0)
                            .with_weight(0.2)
                            .with_description("en", "Racket drop depth")
                            .with_description("zh", "引拍下沉深度")
                            .with_advice("en", "Let the elbow drop behind the shoulder to load the swing.")
                            .with_advice("zh", "肘部沉至肩后，充分蓄力。"),
                    ),
            )
            .with_stage(
                StageRule::new("power")
                    .with_weight(0.4)
                    .with_description("en", "Power")
                    .with_description("zh", "发力击球")
                    .with_measurement(
                        MeasurementRule::new("elbow_extension", measurement_types::ANGLE)
                            .with_keypoints(&[
                                parts::RIGHT_SHOULDER,
                                parts::RIGHT_ELBOW,
                                parts::RIGHT_WRIST,
                            ])
                            .with_unit("deg")
                            .with_target(165.0, 10.0)
                            .with_weight(0.5)
                            .with_description("en", "Elbow extension at contact")
                            .with_description("zh", "击球瞬间肘部伸展角度")
                            .with_advice("en", "Extend the arm fully as the racket meets the shuttle.")
                            .with_advice("zh", "击球瞬间手臂充分伸展。"),
                    )
                    .with_measurement(
                        MeasurementRule::new("contact_height", measurement_types::HEIGHT)
                            .with_keypoints(&[parts::RIGHT_WRIST])
                            .with_reference_point(parts::NOSE)
                            .with_unit("px")
                            .with_target(60.0, 30.0)
                            .with_weight(0.3)
                            .with_description("en", "Contact point height")
                            .with_description("zh", "击球点高度")
                            .with_advice("en", "Strike the shuttle at the highest comfortable point.")
                            .with_advice("zh", "在最高点附近击球。"),
                    )
                    .with_measurement(
                        MeasurementRule::new(
                            "weight_transfer",
                            measurement_types::HORIZONTAL_DISTANCE,
                        )
                        .with_keypoints(&[parts::RIGHT_ANKLE])
                        .with_reference_point(parts::LEFT_ANKLE)
                        .with_direction(Direction::Forward)
                        .with_unit("px")
                        .with_range(0.0, 120.0)
                        .with_weight(0.2)
                        .with_description("en", "Forward weight transfer")
                        .with_description("zh", "重心前移幅度")
                        .with_advice("en", "Drive the rear foot forward through the stroke.")
                        .with_advice("zh", "后脚蹬地，重心随挥拍前移。"),
                    ),
            )
    }
}

fn check_weight_sum(violations: &mut Vec<String>, scope: &str, name: &str, weights: &[f32]) {
    if weights.len() <= 1 {
        return;
    }
    let sum: f32 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        violations.push(format!(
            "{scope} '{name}': weights sum to {sum:.2}, expected 1.00"
        ));
    }
}

fn band_nested(inner: (f32, f32), outer: (f32, f32)) -> bool {
    inner.0 >= outer.0 && inner.1 <= outer.1
}

fn check_measurement(violations: &mut Vec<String>, stage: &str, rule: &MeasurementRule) {
    let label = format!("stage '{}' measurement '{}'", stage, rule.key);

    if rule.weight < 0.0 {
        violations.push(format!("{label}: negative weight {}", rule.weight));
    }

    match rule.measurement_type.as_str() {
        measurement_types::ANGLE => {
            if rule.keypoints.len() < 3 {
                violations.push(format!(
                    "{label}: angle requires 3 keypoints, got {}",
                    rule.keypoints.len()
                ));
            }
        }
        measurement_types::DISTANCE => {
            if rule.keypoints.len() < 2 {
                violations.push(format!(
                    "{label}: distance requires 2 keypoints, got {}",
                    rule.keypoints.len()
                ));
            }
        }
        measurement_types::HEIGHT
        | measurement_types::VERTICAL_DISTANCE
        | measurement_types::HORIZONTAL_DISTANCE => {
            if rule.keypoints.is_empty() {
                violations.push(format!("{label}: requires a target keypoint"));
            }
            if rule.reference_point.is_none() {
                violations.push(format!("{label}: requires a reference_point"));
            }
        }
        // Registered extension types carry their own arity conventions
        _ => {}
    }

    if let (Some(min), Some(max)) = (rule.min_value, rule.max_value) {
        if max <= min {
            violations.push(format!(
                "{label}: max_value {max} must exceed min_value {min}"
            ));
        }
    }

    if let Some(bands) = &rule.bands {
        for (band, range) in [
            ("excellent", bands.excellent),
            ("good", bands.good),
            ("acceptable", bands.acceptable),
        ] {
            if range.1 < range.0 {
                violations.push(format!("{label}: {band} band is inverted"));
            }
        }
        if !band_nested(bands.excellent, bands.good) || !band_nested(bands.good, bands.acceptable) {
            violations.push(format!(
                "{label}: bands must nest excellent within good within acceptable"
            ));
        }
    }
}

/// Validate configuration invariants, reporting rather than correcting.
///
/// Checks weight sums at stage and measurement level, keypoint arity per
/// measurement type, range ordering and band nesting. Violations never block
/// evaluation; callers should surface them to the configuration author.
///
/// # Arguments
///
/// * `config` - The configuration to check.
///
/// # Returns
///
/// * Human-readable violation strings, empty when clean.
#[must_use]
pub fn validate_config(config: &ActionEvaluationConfig) -> Vec<String> {
    let mut violations = Vec::new();

    let stage_weights: Vec<f32> = config.stages.iter().map(|s| s.weight).collect();
    check_weight_sum(
        &mut violations,
        "action",
        &config.action_name,
        &stage_weights,
    );

    for stage in &config.stages {
        if stage.weight < 0.0 {
            violations.push(format!(
                "stage '{}': negative weight {}",
                stage.name, stage.weight
            ));
        }
        let weights: Vec<f32> = stage.measurements.iter().map(|m| m.weight).collect();
        check_weight_sum(&mut violations, "stage", &stage.name, &weights);

        for rule in &stage.measurements {
            check_measurement(&mut violations, &stage.name, rule);
        }
    }

    for violation in &violations {
        tracing::warn!(target: "technique::rules", "config violation: {violation}");
    }

    violations
}
