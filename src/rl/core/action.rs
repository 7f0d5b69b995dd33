//! Action Handling
//!
//! Actions are proposed target weights as emitted by a policy. They may be
//! negative or fail to sum to one; this module turns them into valid weights.

/// Equal weight per asset
pub fn uniform_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Normalize a raw action into portfolio weights
///
/// Each component is clipped to [0, 1] (non-finite components count as 0),
/// then divided by the sum. A zero sum falls back to uniform weights.
pub fn normalize_weights(action: &[f64]) -> Vec<f64> {
    let clipped: Vec<f64> = action
        .iter()
        .map(|&w| if w.is_finite() { w.clamp(0.0, 1.0) } else { 0.0 })
        .collect();
    let total: f64 = clipped.iter().sum();

    if total > 0.0 {
        clipped.into_iter().map(|w| w / total).collect()
    } else {
        uniform_weights(action.len())
    }
}

/// Normalize an f32 action as produced by the policy network
pub fn normalize_action(action: &[f32]) -> Vec<f64> {
    let widened: Vec<f64> = action.iter().map(|&a| a as f64).collect();
    normalize_weights(&widened)
}

/// Per-asset change from `current` to `target`
pub fn weight_changes(current: &[f64], target: &[f64]) -> Vec<f64> {
    target
        .iter()
        .zip(current.iter())
        .map(|(t, c)| t - c)
        .collect()
}

/// Total absolute weight moved (one-way turnover counted on both legs)
pub fn turnover(current: &[f64], target: &[f64]) -> f64 {
    target
        .iter()
        .zip(current.iter())
        .map(|(t, c)| (t - c).abs())
        .sum()
}
