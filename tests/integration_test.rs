// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Integration tests for the technique evaluation pipeline

use std::collections::HashMap;

use technique::keypoint::parts;
use technique::rules::measurement_types;
use technique::{
    ActionEvaluationConfig, ActionMetrics, Evaluator, Keypoint, MeasurementRule, MetricsEngine,
    Pose, ScoreCategory, StageRule,
};

/// Two stages, two target-based measurements each, weights summing to 1.0.
fn clear_config() -> ActionEvaluationConfig {
    ActionEvaluationConfig::new("forehand_clear")
        .with_stage(
            StageRule::new("backswing")
                .with_weight(0.5)
                .with_measurement(
                    MeasurementRule::new("shoulder_abduction", measurement_types::ANGLE)
                        .with_keypoints(&[parts::RIGHT_ELBOW, parts::RIGHT_SHOULDER, parts::RIGHT_HIP])
                        .with_unit("deg")
                        .with_target(100.0, 20.0)
                        .with_weight(0.6),
                )
                .with_measurement(
                    MeasurementRule::new("racket_drop", measurement_types::VERTICAL_DISTANCE)
                        .with_keypoints(&[parts::RIGHT_ELBOW])
                        .with_reference_point(parts::RIGHT_SHOULDER)
                        .with_unit("px")
                        .with_target(40.0, 20.0)
                        .with_weight(0.4),
                ),
        )
        .with_stage(
            StageRule::new("power")
                .with_weight(0.5)
                .with_measurement(
                    MeasurementRule::new("elbow_extension", measurement_types::ANGLE)
                        .with_keypoints(&[parts::RIGHT_SHOULDER, parts::RIGHT_ELBOW, parts::RIGHT_WRIST])
                        .with_unit("deg")
                        .with_target(165.0, 10.0)
                        .with_weight(0.6),
                )
                .with_measurement(
                    MeasurementRule::new("contact_height", measurement_types::HEIGHT)
                        .with_keypoints(&[parts::RIGHT_WRIST])
                        .with_reference_point(parts::NOSE)
                        .with_unit("px")
                        .with_target(60.0, 30.0)
                        .with_weight(0.4),
                ),
        )
}

fn on_target_metrics() -> ActionMetrics {
    ActionMetrics::new()
        .with_value("backswing", "shoulder_abduction", 100.0)
        .with_value("backswing", "racket_drop", 40.0)
        .with_value("power", "elbow_extension", 165.0)
        .with_value("power", "contact_height", 60.0)
}

#[test]
fn test_scenario_perfect_execution() {
    let evaluator = Evaluator::new(clear_config());
    let result = evaluator.evaluate(&on_target_metrics());

    for stage in &result.stages {
        for measurement in &stage.measurements {
            assert_eq!(measurement.passed, Some(true));
            assert!((measurement.score.unwrap() - 1.0).abs() < f32::EPSILON);
            assert!((measurement.deviation.unwrap()).abs() < f32::EPSILON);
        }
        assert!((stage.score.unwrap() - 1.0).abs() < f32::EPSILON);
    }
    assert!((result.score.unwrap() - 1.0).abs() < f32::EPSILON);
    assert_eq!(result.category(), ScoreCategory::Good);
}

#[test]
fn test_scenario_scoring_disabled() {
    let evaluator = Evaluator::new(clear_config().with_scoring(false));
    let metrics = ActionMetrics::new()
        .with_value("backswing", "shoulder_abduction", 7.0)
        .with_value("backswing", "racket_drop", -300.0)
        .with_value("power", "elbow_extension", 12.0)
        .with_value("power", "contact_height", 999.0);

    let result = evaluator.evaluate(&metrics);
    for stage in &result.stages {
        for measurement in &stage.measurements {
            assert!((measurement.score.unwrap() - 1.0).abs() < f32::EPSILON);
        }
    }
    assert!((result.score.unwrap() - 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_scenario_missing_stage() {
    let config = ActionEvaluationConfig::new("forehand_clear").with_stage(
        StageRule::new("power").with_measurement(
            MeasurementRule::new("elbow_extension", measurement_types::ANGLE)
                .with_keypoints(&[parts::RIGHT_SHOULDER, parts::RIGHT_ELBOW, parts::RIGHT_WRIST])
                .with_target(165.0, 10.0),
        ),
    );
    let evaluator = Evaluator::new(config);

    // The metrics dict omits the only configured stage entirely
    let result = evaluator.evaluate(&ActionMetrics::new());

    let power = result.stage("power").unwrap();
    for measurement in &power.measurements {
        assert_eq!(measurement.value, None);
        assert_eq!(measurement.score, None);
    }
    assert_eq!(power.score, None);
    assert_eq!(result.score, None);
    assert_eq!(result.category(), ScoreCategory::Mixed);
}

#[test]
fn test_scenario_out_of_range_is_poor() {
    let config = ActionEvaluationConfig::new("forehand_clear").with_stage(
        StageRule::new("power").with_weight(1.0).with_measurement(
            MeasurementRule::new("elbow_extension", measurement_types::ANGLE)
                .with_keypoints(&[parts::RIGHT_SHOULDER, parts::RIGHT_ELBOW, parts::RIGHT_WRIST])
                .with_target(165.0, 10.0)
                .with_weight(1.0),
        ),
    );
    let evaluator = Evaluator::new(config);

    // Deviation of 3x the tolerance lands exactly on the ramp's zero
    let metrics = ActionMetrics::new().with_value("power", "elbow_extension", 135.0);
    let result = evaluator.evaluate(&metrics);

    assert!(result.stage("power").unwrap().score.unwrap().abs() < f32::EPSILON);
    assert!(result.score.unwrap().abs() < f32::EPSILON);
    assert_eq!(result.category(), ScoreCategory::Poor);
}

#[test]
fn test_incremental_update_all_equals_fresh() {
    let evaluator = Evaluator::new(clear_config());
    let first = evaluator.evaluate(&on_target_metrics());

    let updated = ActionMetrics::new()
        .with_value("backswing", "shoulder_abduction", 130.0)
        .with_value("backswing", "racket_drop", 10.0)
        .with_value("power", "elbow_extension", 150.0)
        .with_value("power", "contact_height", 20.0);

    let incremental =
        evaluator.evaluate_incremental(Some(&first), &["backswing", "power"], &updated);
    let fresh = evaluator.evaluate(&updated);

    assert_eq!(incremental, fresh);
}

#[test]
fn test_incremental_locality() {
    let evaluator = Evaluator::new(clear_config());
    let first = evaluator.evaluate(&on_target_metrics());

    let updated = ActionMetrics::new()
        .with_value("backswing", "shoulder_abduction", 100.0)
        .with_value("backswing", "racket_drop", 40.0)
        .with_value("power", "elbow_extension", 300.0)
        .with_value("power", "contact_height", -100.0);

    let second = evaluator.evaluate_incremental(Some(&first), &["power"], &updated);

    // Every stage other than the updated one is identical to the previous run
    assert_eq!(second.stage("backswing"), first.stage("backswing"));
    // The updated stage and the aggregate moved
    assert!(second.stage("power").unwrap().score.unwrap() < 1.0);
    assert!(second.score.unwrap() < first.score.unwrap());
}

#[test]
fn test_pose_to_evaluation_pipeline() {
    let config = ActionEvaluationConfig::forehand_clear();
    assert!(config.validate().is_empty());

    let engine = MetricsEngine::new();

    // A power-stage pose: arm nearly extended overhead, wrist above the nose
    let power_pose = Pose::new(57)
        .with_point(parts::NOSE, Keypoint::new(320.0, 200.0, 0.97))
        .with_point(parts::RIGHT_SHOULDER, Keypoint::new(340.0, 260.0, 0.95))
        .with_point(parts::RIGHT_ELBOW, Keypoint::new(360.0, 180.0, 0.94))
        .with_point(parts::RIGHT_WRIST, Keypoint::new(372.0, 110.0, 0.90))
        .with_point(parts::LEFT_ANKLE, Keypoint::new(300.0, 640.0, 0.85))
        .with_point(parts::RIGHT_ANKLE, Keypoint::new(380.0, 635.0, 0.86));

    let mut poses = HashMap::new();
    poses.insert("power".to_string(), power_pose);

    let result = engine.compute_action(&config, &poses);
    assert_eq!(result.stages.len(), 1);
    let power_metrics = &result.stages["power"];
    assert_eq!(power_metrics.frame_index, 57);
    assert!(power_metrics.missing_keypoints.is_empty());

    let evaluator = Evaluator::new(config);
    let evaluation = evaluator.evaluate(&ActionMetrics::from_result(&result));

    let power = evaluation.stage("power").unwrap();
    for measurement in &power.measurements {
        assert!(measurement.value.is_some(), "{} lost its value", measurement.key);
        let score = measurement.score.unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert!(!measurement.feedback.is_empty());
    }
    assert!(power.score.is_some());

    // Unmeasured stages stay indeterminate without aborting the pass
    assert_eq!(evaluation.stage("setup").unwrap().score, None);
    assert!(!evaluation.summary.is_empty());
}

#[test]
fn test_config_file_round_trip() {
    let config = ActionEvaluationConfig::forehand_clear();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forehand_clear.json");
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = ActionEvaluationConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert!(loaded.validate().is_empty());
}

#[test]
fn test_serialized_evaluation_shape() {
    let evaluator = Evaluator::new(clear_config());
    let result = evaluator.evaluate(&on_target_metrics());

    let json: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&result).unwrap()).unwrap();
    assert_eq!(json["action_name"], "forehand_clear");
    assert_eq!(json["stages"][0]["name"], "backswing");
    assert_eq!(
        json["stages"][0]["measurements"][0]["key"],
        "shoulder_abduction"
    );
    assert!(json["stages"][0]["measurements"][0]["score"].is_number());
    assert!(json["score"].is_number());
    assert!(json["summary"].is_string());
    // The refined sibling is omitted, not null, when refinement is off
    assert!(json.get("refined_summary").is_none());
}
