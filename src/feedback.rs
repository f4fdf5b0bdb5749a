// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Template-based natural-language feedback.
//!
//! Pure functions mapping evaluation results and a locale to feedback
//! strings at measurement, stage and action level. Feedback is independent
//! of the scoring math: it reads evaluation values, never changes them.
//! Unknown locales fall back to the base `en` bundle, and rule-level
//! description/advice maps fall back per key (requested locale, then `en`,
//! then the machine key) so a partially translated configuration still
//! renders.

use std::collections::HashMap;

use crate::evaluator::MeasurementEvaluation;
use crate::rules::{MeasurementRule, StageRule};
use crate::scoring::ScoreCategory;
use crate::utils::ratio;

/// Base locale used when a requested locale has no bundle or key.
pub const DEFAULT_LOCALE: &str = "en";

/// All feedback templates for one locale.
struct LocaleBundle {
    measurement_pass: &'static str,
    measurement_deviation: &'static str,
    measurement_fail: &'static str,
    stage_good: &'static str,
    stage_mixed: &'static str,
    stage_poor: &'static str,
    action_good: &'static str,
    action_mixed: &'static str,
    action_poor: &'static str,
}

static EN: LocaleBundle = LocaleBundle {
    measurement_pass: "{description}: {value}{unit}, on target",
    measurement_deviation: "{description} measured {value}{unit}, off the {target}{unit} target by {deviation}{unit} (tolerance {tolerance}{unit}). {advice}",
    measurement_fail: "{description}: {value}{unit}, needs work. {advice}",
    stage_good: "{stage}: solid execution across the key checkpoints",
    stage_mixed: "{stage}: some checkpoints on target, room to improve",
    stage_poor: "{stage}: well off the reference on most checkpoints, worth focused practice",
    action_good: "Overall {action} execution is strong. Keep it up.",
    action_mixed: "Overall {action} execution is mixed. A few stages need attention.",
    action_poor: "Overall {action} execution is well off the reference. Work through the stages one at a time.",
};

static ZH: LocaleBundle = LocaleBundle {
    measurement_pass: "{description}：{value}{unit}，动作标准",
    measurement_deviation: "{description}为{value}{unit}，与目标{target}{unit}相差{deviation}{unit}（允许误差{tolerance}{unit}）。{advice}",
    measurement_fail: "{description}：{value}{unit}，仍需改进。{advice}",
    stage_good: "{stage}阶段完成质量很高",
    stage_mixed: "{stage}阶段部分要点达标，仍有提升空间",
    stage_poor: "{stage}阶段与标准动作差距较大，建议重点练习",
    action_good: "本次{action}动作整体完成度很高，继续保持。",
    action_mixed: "本次{action}动作完成度一般，个别阶段需要加强。",
    action_poor: "本次{action}动作与标准差距较大，建议分阶段强化练习。",
};

fn bundle(locale: &str) -> &'static LocaleBundle {
    match locale {
        "zh" => &ZH,
        _ => &EN,
    }
}

/// Resolve a locale-keyed text map with per-key fallback.
///
/// # Arguments
///
/// * `map` - Locale code to text.
/// * `locale` - Requested locale.
/// * `fallback` - Used when neither the requested locale nor the base
///   locale has an entry (typically the machine key).
///
/// # Returns
///
/// * The resolved text.
#[must_use]
pub fn localized<'a>(map: &'a HashMap<String, String>, locale: &str, fallback: &'a str) -> &'a str {
    map.get(locale)
        .or_else(|| map.get(DEFAULT_LOCALE))
        .map_or(fallback, String::as_str)
}

fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out.trim().to_string()
}

fn fmt_value(value: Option<f32>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"))
}

/// Feedback string for one measurement evaluation.
///
/// A passing measurement gets the pass template; a failing one with a
/// configured target and a known deviation gets the deviation template
/// (including the rule's corrective advice); anything else gets the generic
/// fail template.
///
/// # Arguments
///
/// * `rule` - The measurement rule that produced the evaluation.
/// * `evaluation` - The evaluation to describe.
/// * `locale` - Requested locale.
///
/// # Returns
///
/// * The rendered feedback string.
#[must_use]
pub fn measurement_feedback(
    rule: &MeasurementRule,
    evaluation: &MeasurementEvaluation,
    locale: &str,
) -> String {
    let templates = bundle(locale);
    let description = localized(&rule.description, locale, &rule.key).to_string();
    let advice = localized(&rule.advice, locale, "").to_string();

    let template = if evaluation.passed == Some(true) {
        templates.measurement_pass
    } else if rule.has_target() && evaluation.deviation.is_some() {
        templates.measurement_deviation
    } else {
        templates.measurement_fail
    };

    render(
        template,
        &[
            ("description", description),
            ("value", fmt_value(evaluation.value)),
            ("unit", rule.unit.clone()),
            ("target", fmt_value(rule.target)),
            ("tolerance", fmt_value(rule.tolerance)),
            ("deviation", fmt_value(evaluation.deviation)),
            ("advice", advice),
        ],
    )
}

/// Feedback string for one stage.
///
/// The category is chosen by the fraction of measurements that passed:
/// at least 0.8 reads good, at least 0.4 mixed, below that poor. A stage
/// with no measurements yields an empty string.
///
/// # Arguments
///
/// * `stage` - The stage rule.
/// * `measurements` - The stage's measurement evaluations.
/// * `locale` - Requested locale.
///
/// # Returns
///
/// * The rendered feedback string, empty for a measurement-less stage.
#[must_use]
pub fn stage_feedback(
    stage: &StageRule,
    measurements: &[MeasurementEvaluation],
    locale: &str,
) -> String {
    let passed = measurements
        .iter()
        .filter(|m| m.passed == Some(true))
        .count();
    let Some(pass_ratio) = ratio(passed, measurements.len()) else {
        return String::new();
    };

    let templates = bundle(locale);
    let template = if pass_ratio >= 0.8 {
        templates.stage_good
    } else if pass_ratio >= 0.4 {
        templates.stage_mixed
    } else {
        templates.stage_poor
    };

    let stage_name = localized(&stage.description, locale, &stage.name).to_string();
    render(template, &[("stage", stage_name)])
}

/// Summary string for the whole action, chosen by score category.
///
/// # Arguments
///
/// * `action_name` - Action identifier substituted into the template.
/// * `category` - Category derived from the overall score.
/// * `locale` - Requested locale.
///
/// # Returns
///
/// * The rendered summary string.
#[must_use]
pub fn action_summary(action_name: &str, category: ScoreCategory, locale: &str) -> String {
    let templates = bundle(locale);
    let template = match category {
        ScoreCategory::Good => templates.action_good,
        ScoreCategory::Mixed => templates.action_mixed,
        ScoreCategory::Poor => templates.action_poor,
    };
    render(template, &[("action", action_name.to_string())])
}
