// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Numeric helpers shared across evaluation modules.

/// Weighted mean over `(value, weight)` pairs.
///
/// Pairs with non-positive weight are excluded from both numerator and
/// denominator.
///
/// # Arguments
///
/// * `pairs` - `(value, weight)` pairs to aggregate.
///
/// # Returns
///
/// * The weighted mean, or `None` when no pair contributed positive weight.
#[must_use]
pub fn weighted_mean<I>(pairs: I) -> Option<f32>
where
    I: IntoIterator<Item = (f32, f32)>,
{
    let mut weighted_sum = 0.0f32;
    let mut total_weight = 0.0f32;
    for (value, weight) in pairs {
        if weight > 0.0 {
            weighted_sum += value * weight;
            total_weight += weight;
        }
    }
    if total_weight > 0.0 {
        Some(weighted_sum / total_weight)
    } else {
        None
    }
}

/// Ratio of hits to total, `None` when total is zero.
#[must_use]
pub fn ratio(hits: usize, total: usize) -> Option<f32> {
    if total == 0 {
        None
    } else {
        #[allow(clippy::cast_precision_loss)]
        Some(hits as f32 / total as f32)
    }
}
