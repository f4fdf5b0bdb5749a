// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Measurement engine: geometric computations over pose keypoints.
//!
//! [`MetricsEngine`] turns a [`MeasurementRule`] and a [`Pose`] into a
//! [`MeasurementValue`]. Missing keypoints and degenerate geometry are
//! reported as status values, never as errors, so a partially detected pose
//! still yields a usable (if sparse) result. Handlers are registered by
//! measurement type name; additional types can be added at runtime without
//! modifying the built-ins.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;

use crate::keypoint::{Keypoint, Pose};
use crate::rules::{measurement_types, ActionEvaluationConfig, Direction, MeasurementRule, StageRule};

/// Vector magnitudes below this are treated as degenerate.
const ZERO_LENGTH_EPS: f32 = 1e-6;

/// Outcome status of a single measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementStatus {
    /// The measurement produced a value.
    Ok,
    /// One or more required keypoints were not detected.
    Missing,
    /// Degenerate geometry or an unsupported measurement type.
    Invalid,
}

/// Result of computing one measurement rule against one pose.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementValue {
    /// The computed scalar, absent when status is not [`MeasurementStatus::Ok`].
    pub value: Option<f32>,
    /// Unit label from the rule.
    pub unit: String,
    /// Outcome status.
    pub status: MeasurementStatus,
    /// Diagnostic notes (missing keypoint names, degeneracy details).
    pub notes: Vec<String>,
}

impl MeasurementValue {
    /// Construct a successful measurement.
    #[must_use]
    pub fn ok(value: f32, unit: &str) -> Self {
        Self {
            value: Some(value),
            unit: unit.to_string(),
            status: MeasurementStatus::Ok,
            notes: Vec::new(),
        }
    }

    /// Construct a missing-keypoint measurement listing the absent names.
    #[must_use]
    pub fn missing(missing_names: &[String], unit: &str) -> Self {
        Self {
            value: None,
            unit: unit.to_string(),
            status: MeasurementStatus::Missing,
            notes: vec![format!("missing keypoints: {}", missing_names.join(", "))],
        }
    }

    /// Construct an invalid measurement with an explanatory note.
    #[must_use]
    pub fn invalid(note: impl Into<String>, unit: &str) -> Self {
        Self {
            value: None,
            unit: unit.to_string(),
            status: MeasurementStatus::Invalid,
            notes: vec![note.into()],
        }
    }
}

/// A measurement computation for one type name.
///
/// Handlers run after the engine has verified that every keypoint named by
/// the rule is present in the pose.
pub trait MeasurementHandler: Send + Sync {
    /// Compute the measurement for `rule` against `pose`.
    fn compute(&self, pose: &Pose, rule: &MeasurementRule) -> MeasurementValue;
}

impl<F> MeasurementHandler for F
where
    F: Fn(&Pose, &MeasurementRule) -> MeasurementValue + Send + Sync,
{
    fn compute(&self, pose: &Pose, rule: &MeasurementRule) -> MeasurementValue {
        self(pose, rule)
    }
}

/// Per-stage measurement output.
#[derive(Debug, Clone, Serialize)]
pub struct StageMetricsResult {
    /// Stage name from the rule.
    pub stage_name: String,
    /// Frame the pose was taken from.
    pub frame_index: usize,
    /// Measurement key to computed value.
    pub measurements: HashMap<String, MeasurementValue>,
    /// Every keypoint name referenced anywhere in the stage that the pose
    /// lacks, sorted and deduplicated, independent of per-rule status.
    pub missing_keypoints: Vec<String>,
    /// Wall-clock time spent computing this stage.
    pub processing_time_ms: f64,
}

/// Per-action measurement output.
#[derive(Debug, Clone, Serialize)]
pub struct ActionMetricsResult {
    /// Action name from the configuration.
    pub action_name: String,
    /// Stage name to stage result; configured stages with no supplied pose
    /// are skipped.
    pub stages: HashMap<String, StageMetricsResult>,
    /// Wall-clock time spent computing all stages.
    pub processing_time_ms: f64,
}

/// Computes measurement rules against poses via registered type handlers.
pub struct MetricsEngine {
    handlers: HashMap<String, Box<dyn MeasurementHandler>>,
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsEngine {
    /// Create an engine with the built-in measurement types registered.
    #[must_use]
    pub fn new() -> Self {
        let mut engine = Self {
            handlers: HashMap::new(),
        };
        engine.register_handler(measurement_types::ANGLE, compute_angle);
        engine.register_handler(measurement_types::DISTANCE, compute_distance);
        engine.register_handler(measurement_types::HEIGHT, compute_height);
        engine.register_handler(measurement_types::VERTICAL_DISTANCE, compute_vertical);
        engine.register_handler(measurement_types::HORIZONTAL_DISTANCE, compute_horizontal);
        engine
    }

    /// Register a handler for a measurement type name.
    ///
    /// Registering an existing name replaces its handler.
    ///
    /// # Arguments
    ///
    /// * `type_name` - Measurement type name used by rules.
    /// * `handler` - The computation to run for that type.
    pub fn register_handler(
        &mut self,
        type_name: impl Into<String>,
        handler: impl MeasurementHandler + 'static,
    ) {
        self.handlers.insert(type_name.into(), Box::new(handler));
    }

    /// Check whether a measurement type is registered.
    #[must_use]
    pub fn supports(&self, type_name: &str) -> bool {
        self.handlers.contains_key(type_name)
    }

    /// Compute a single measurement rule against a pose.
    ///
    /// Resolves every keypoint the rule names (ordered keypoints plus the
    /// reference point); if any is absent the result is
    /// [`MeasurementStatus::Missing`] with the absent names listed. Unknown
    /// measurement types yield [`MeasurementStatus::Invalid`]. Never errors.
    ///
    /// # Arguments
    ///
    /// * `pose` - The detected pose.
    /// * `rule` - The measurement rule to compute.
    ///
    /// # Returns
    ///
    /// * The computed [`MeasurementValue`].
    #[must_use]
    pub fn compute(&self, pose: &Pose, rule: &MeasurementRule) -> MeasurementValue {
        let missing = pose.missing_from(rule.required_points());
        if !missing.is_empty() {
            return MeasurementValue::missing(&missing, &rule.unit);
        }

        self.handlers.get(rule.measurement_type.as_str()).map_or_else(
            || {
                MeasurementValue::invalid(
                    format!(
                        "unsupported measurement type '{}'",
                        rule.measurement_type
                    ),
                    &rule.unit,
                )
            },
            |handler| handler.compute(pose, rule),
        )
    }

    /// Compute every measurement rule in a stage against one pose.
    ///
    /// # Arguments
    ///
    /// * `stage_rule` - The stage whose rules to run.
    /// * `pose` - The detected pose for this stage.
    /// * `frame_index` - Frame the pose was taken from.
    ///
    /// # Returns
    ///
    /// * A [`StageMetricsResult`] with per-rule values, the full set of
    ///   missing keypoint names referenced anywhere in the stage, and timing.
    #[must_use]
    pub fn compute_stage(
        &self,
        stage_rule: &StageRule,
        pose: &Pose,
        frame_index: usize,
    ) -> StageMetricsResult {
        let start = Instant::now();

        let mut measurements = HashMap::with_capacity(stage_rule.measurements.len());
        for rule in &stage_rule.measurements {
            measurements.insert(rule.key.clone(), self.compute(pose, rule));
        }

        let missing_keypoints = pose.missing_from(
            stage_rule
                .measurements
                .iter()
                .flat_map(MeasurementRule::required_points),
        );

        let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(
            target: "technique::metrics",
            stage = %stage_rule.name,
            frame = frame_index,
            rules = stage_rule.measurements.len(),
            missing = missing_keypoints.len(),
            "stage metrics computed"
        );

        StageMetricsResult {
            stage_name: stage_rule.name.clone(),
            frame_index,
            measurements,
            missing_keypoints,
            processing_time_ms,
        }
    }

    /// Compute every configured stage that has a pose in `stage_pose_map`.
    ///
    /// Configured stages absent from the map are silently skipped.
    ///
    /// # Arguments
    ///
    /// * `config` - The action configuration.
    /// * `stage_pose_map` - Stage name to detected pose.
    ///
    /// # Returns
    ///
    /// * An [`ActionMetricsResult`] covering the supplied stages.
    #[must_use]
    pub fn compute_action(
        &self,
        config: &ActionEvaluationConfig,
        stage_pose_map: &HashMap<String, Pose>,
    ) -> ActionMetricsResult {
        let start = Instant::now();

        let mut stages = HashMap::new();
        for stage_rule in &config.stages {
            if let Some(pose) = stage_pose_map.get(&stage_rule.name) {
                stages.insert(
                    stage_rule.name.clone(),
                    self.compute_stage(stage_rule, pose, pose.frame_index),
                );
            }
        }

        ActionMetricsResult {
            action_name: config.action_name.clone(),
            stages,
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

/// Component-wise vector between two keypoints.
///
/// The depth component participates only when `use_z` is set; callers enable
/// it when every point involved carries depth, so 2D detections never mix
/// with phantom zeros.
fn vector(from: &Keypoint, to: &Keypoint, use_z: bool) -> [f32; 3] {
    let dz = if use_z {
        to.z.unwrap_or(0.0) - from.z.unwrap_or(0.0)
    } else {
        0.0
    };
    [to.x - from.x, to.y - from.y, dz]
}

fn magnitude(v: [f32; 3]) -> f32 {
    v[2].mul_add(v[2], v[0].mul_add(v[0], v[1] * v[1])).sqrt()
}

/// Angle at the vertex between three ordered keypoints, in degrees [0, 180].
fn compute_angle(pose: &Pose, rule: &MeasurementRule) -> MeasurementValue {
    if rule.keypoints.len() < 3 {
        return MeasurementValue::invalid(
            format!("angle requires 3 keypoints, got {}", rule.keypoints.len()),
            &rule.unit,
        );
    }
    let (Some(p1), Some(vertex), Some(p2)) = (
        pose.get(&rule.keypoints[0]),
        pose.get(&rule.keypoints[1]),
        pose.get(&rule.keypoints[2]),
    ) else {
        return MeasurementValue::invalid("keypoint resolution failed", &rule.unit);
    };

    let use_z = p1.z.is_some() && vertex.z.is_some() && p2.z.is_some();
    let v1 = vector(vertex, p1, use_z);
    let v2 = vector(vertex, p2, use_z);

    let mag1 = magnitude(v1);
    let mag2 = magnitude(v2);
    if mag1 < ZERO_LENGTH_EPS || mag2 < ZERO_LENGTH_EPS {
        return MeasurementValue::invalid("zero-length vector at angle vertex", &rule.unit);
    }

    let dot = v1[2].mul_add(v2[2], v1[0].mul_add(v2[0], v1[1] * v2[1]));
    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    MeasurementValue::ok(cos_angle.acos().to_degrees(), &rule.unit)
}

/// Euclidean distance between the first two named keypoints.
fn compute_distance(pose: &Pose, rule: &MeasurementRule) -> MeasurementValue {
    if rule.keypoints.len() < 2 {
        return MeasurementValue::invalid(
            format!("distance requires 2 keypoints, got {}", rule.keypoints.len()),
            &rule.unit,
        );
    }
    let (Some(a), Some(b)) = (pose.get(&rule.keypoints[0]), pose.get(&rule.keypoints[1])) else {
        return MeasurementValue::invalid("keypoint resolution failed", &rule.unit);
    };
    MeasurementValue::ok(a.distance_to(b), &rule.unit)
}

/// Resolve the target/reference pair for height and offset measurements.
fn target_and_reference<'a>(
    pose: &'a Pose,
    rule: &MeasurementRule,
) -> Option<(&'a Keypoint, &'a Keypoint)> {
    let target = pose.get(rule.keypoints.first()?)?;
    let reference = pose.get(rule.reference_point.as_deref()?)?;
    Some((target, reference))
}

/// Signed height of the target above the reference.
///
/// Image-space convention: smaller y is higher, so positive means the target
/// sits above the reference.
fn compute_height(pose: &Pose, rule: &MeasurementRule) -> MeasurementValue {
    let Some((target, reference)) = target_and_reference(pose, rule) else {
        return MeasurementValue::invalid(
            "height requires a target keypoint and a reference_point",
            &rule.unit,
        );
    };
    MeasurementValue::ok(reference.y - target.y, &rule.unit)
}

/// Height with the sign flipped when the rule reads downward.
fn compute_vertical(pose: &Pose, rule: &MeasurementRule) -> MeasurementValue {
    let Some((target, reference)) = target_and_reference(pose, rule) else {
        return MeasurementValue::invalid(
            "vertical_distance requires a target keypoint and a reference_point",
            &rule.unit,
        );
    };
    let base = reference.y - target.y;
    let value = match rule.direction {
        Some(Direction::Down) => -base,
        _ => base,
    };
    MeasurementValue::ok(value, &rule.unit)
}

/// Horizontal offset of the target from the reference.
///
/// Sign flips for back/backward, stays for forward, and collapses to the
/// absolute offset when no direction is configured.
fn compute_horizontal(pose: &Pose, rule: &MeasurementRule) -> MeasurementValue {
    let Some((target, reference)) = target_and_reference(pose, rule) else {
        return MeasurementValue::invalid(
            "horizontal_distance requires a target keypoint and a reference_point",
            &rule.unit,
        );
    };
    let base = target.x - reference.x;
    let value = match rule.direction {
        Some(Direction::Back | Direction::Backward) => -base,
        Some(_) => base,
        None => base.abs(),
    };
    MeasurementValue::ok(value, &rule.unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoint::parts;

    fn angle_rule() -> MeasurementRule {
        MeasurementRule::new("elbow", measurement_types::ANGLE)
            .with_keypoints(&[parts::RIGHT_SHOULDER, parts::RIGHT_ELBOW, parts::RIGHT_WRIST])
            .with_unit("deg")
    }

    fn arm_pose(shoulder: (f32, f32), elbow: (f32, f32), wrist: (f32, f32)) -> Pose {
        Pose::new(0)
            .with_point(parts::RIGHT_SHOULDER, Keypoint::new(shoulder.0, shoulder.1, 0.9))
            .with_point(parts::RIGHT_ELBOW, Keypoint::new(elbow.0, elbow.1, 0.9))
            .with_point(parts::RIGHT_WRIST, Keypoint::new(wrist.0, wrist.1, 0.9))
    }

    #[test]
    fn test_straight_arm_angle() {
        let engine = MetricsEngine::new();
        let result = engine.compute(
            &arm_pose((0.0, 0.0), (0.5, 0.0), (1.0, 0.0)),
            &angle_rule(),
        );
        assert_eq!(result.status, MeasurementStatus::Ok);
        assert!((result.value.unwrap() - 180.0).abs() < 0.5);
    }

    #[test]
    fn test_bent_arm_angle() {
        let engine = MetricsEngine::new();
        let result = engine.compute(
            &arm_pose((0.0, 0.0), (0.5, 0.0), (0.5, 0.5)),
            &angle_rule(),
        );
        assert!((result.value.unwrap() - 90.0).abs() < 0.5);
    }

    #[test]
    fn test_angle_range_bounds() {
        let engine = MetricsEngine::new();
        for wrist in [(1.0, 0.0), (0.0, 0.1), (0.7, -0.3), (0.2, 0.9)] {
            let result = engine.compute(&arm_pose((0.0, 0.0), (0.5, 0.0), wrist), &angle_rule());
            let angle = result.value.unwrap();
            assert!((0.0..=180.0).contains(&angle), "angle {angle} out of range");
        }
    }

    #[test]
    fn test_degenerate_angle_is_invalid() {
        let engine = MetricsEngine::new();
        // Wrist coincides with the elbow vertex
        let result = engine.compute(
            &arm_pose((0.0, 0.0), (0.5, 0.0), (0.5, 0.0)),
            &angle_rule(),
        );
        assert_eq!(result.status, MeasurementStatus::Invalid);
        assert!(result.value.is_none());
        assert!(result.notes[0].contains("zero-length"));
    }

    #[test]
    fn test_missing_keypoints_reported_and_deterministic() {
        let engine = MetricsEngine::new();
        let pose = Pose::new(0).with_point(parts::RIGHT_ELBOW, Keypoint::new(0.5, 0.5, 0.9));

        let first = engine.compute(&pose, &angle_rule());
        let second = engine.compute(&pose, &angle_rule());

        assert_eq!(first.status, MeasurementStatus::Missing);
        assert!(first.notes[0].contains("right_shoulder"));
        assert!(first.notes[0].contains("right_wrist"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_distance_non_negative() {
        let engine = MetricsEngine::new();
        let rule = MeasurementRule::new("stance", measurement_types::DISTANCE)
            .with_keypoints(&[parts::LEFT_ANKLE, parts::RIGHT_ANKLE]);
        let pose = Pose::new(0)
            .with_point(parts::LEFT_ANKLE, Keypoint::new(10.0, 50.0, 0.9))
            .with_point(parts::RIGHT_ANKLE, Keypoint::new(4.0, 42.0, 0.9));
        let result = engine.compute(&pose, &rule);
        assert!((result.value.unwrap() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_height_sign_convention() {
        let engine = MetricsEngine::new();
        let rule = MeasurementRule::new("wrist_height", measurement_types::HEIGHT)
            .with_keypoints(&[parts::RIGHT_WRIST])
            .with_reference_point(parts::RIGHT_SHOULDER);
        // Wrist at smaller y = above the shoulder = positive height
        let pose = Pose::new(0)
            .with_point(parts::RIGHT_WRIST, Keypoint::new(0.0, 20.0, 0.9))
            .with_point(parts::RIGHT_SHOULDER, Keypoint::new(0.0, 80.0, 0.9));
        let result = engine.compute(&pose, &rule);
        assert!((result.value.unwrap() - 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_vertical_distance_down_flips_sign() {
        let engine = MetricsEngine::new();
        let pose = Pose::new(0)
            .with_point(parts::RIGHT_ELBOW, Keypoint::new(0.0, 120.0, 0.9))
            .with_point(parts::RIGHT_SHOULDER, Keypoint::new(0.0, 80.0, 0.9));

        let up_rule = MeasurementRule::new("v", measurement_types::VERTICAL_DISTANCE)
            .with_keypoints(&[parts::RIGHT_ELBOW])
            .with_reference_point(parts::RIGHT_SHOULDER);
        let down_rule = up_rule.clone().with_direction(Direction::Down);

        let up = engine.compute(&pose, &up_rule).value.unwrap();
        let down = engine.compute(&pose, &down_rule).value.unwrap();
        assert!((up - -40.0).abs() < f32::EPSILON);
        assert!((down - 40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_horizontal_distance_directions() {
        let engine = MetricsEngine::new();
        let pose = Pose::new(0)
            .with_point(parts::RIGHT_ANKLE, Keypoint::new(30.0, 0.0, 0.9))
            .with_point(parts::LEFT_ANKLE, Keypoint::new(50.0, 0.0, 0.9));

        let base = MeasurementRule::new("h", measurement_types::HORIZONTAL_DISTANCE)
            .with_keypoints(&[parts::RIGHT_ANKLE])
            .with_reference_point(parts::LEFT_ANKLE);

        let unset = engine.compute(&pose, &base).value.unwrap();
        assert!((unset - 20.0).abs() < f32::EPSILON); // absolute when unset

        let forward = engine
            .compute(&pose, &base.clone().with_direction(Direction::Forward))
            .value
            .unwrap();
        assert!((forward - -20.0).abs() < f32::EPSILON);

        let back = engine
            .compute(&pose, &base.clone().with_direction(Direction::Back))
            .value
            .unwrap();
        assert!((back - 20.0).abs() < f32::EPSILON);

        let backward = engine
            .compute(&pose, &base.with_direction(Direction::Backward))
            .value
            .unwrap();
        assert!((backward - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unsupported_type_is_invalid() {
        let engine = MetricsEngine::new();
        let rule = MeasurementRule::new("x", "torque").with_keypoints(&[parts::RIGHT_WRIST]);
        let pose = Pose::new(0).with_point(parts::RIGHT_WRIST, Keypoint::new(0.0, 0.0, 0.9));
        let result = engine.compute(&pose, &rule);
        assert_eq!(result.status, MeasurementStatus::Invalid);
        assert!(result.notes[0].contains("torque"));
    }

    #[test]
    fn test_register_custom_handler() {
        let mut engine = MetricsEngine::new();
        engine.register_handler("confidence", |pose: &Pose, rule: &MeasurementRule| {
            match pose.get(&rule.keypoints[0]) {
                Some(kp) => MeasurementValue::ok(kp.confidence, &rule.unit),
                None => MeasurementValue::invalid("keypoint resolution failed", &rule.unit),
            }
        });
        assert!(engine.supports("confidence"));

        let rule = MeasurementRule::new("c", "confidence").with_keypoints(&[parts::NOSE]);
        let pose = Pose::new(0).with_point(parts::NOSE, Keypoint::new(0.0, 0.0, 0.77));
        let result = engine.compute(&pose, &rule);
        assert!((result.value.unwrap() - 0.77).abs() < f32::EPSILON);
    }

    #[test]
    fn test_compute_stage_collects_missing() {
        let engine = MetricsEngine::new();
        let config = ActionEvaluationConfig::forehand_clear();
        let stage = config.stage("setup").unwrap();

        // Only the elbow is detected
        let pose = Pose::new(12).with_point(parts::RIGHT_ELBOW, Keypoint::new(0.5, 0.5, 0.9));
        let result = engine.compute_stage(stage, &pose, 12);

        assert_eq!(result.stage_name, "setup");
        assert_eq!(result.frame_index, 12);
        assert_eq!(result.measurements.len(), 2);
        assert_eq!(
            result.missing_keypoints,
            vec!["left_ankle", "right_ankle", "right_shoulder", "right_wrist"]
        );
        assert!(result.processing_time_ms >= 0.0);
    }

    #[test]
    fn test_compute_action_skips_absent_stages() {
        let engine = MetricsEngine::new();
        let config = ActionEvaluationConfig::forehand_clear();

        let mut poses = HashMap::new();
        poses.insert(
            "setup".to_string(),
            arm_pose((0.0, 0.0), (0.5, 0.0), (0.5, 0.5)),
        );

        let result = engine.compute_action(&config, &poses);
        assert_eq!(result.action_name, "forehand_clear");
        assert_eq!(result.stages.len(), 1);
        assert!(result.stages.contains_key("setup"));
    }
}
