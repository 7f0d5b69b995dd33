//! Reward Function
//!
//! Per-step reward for the rebalancing environment, kept in its raw
//! (unnormalized) scale:
//!
//! `reward = 100·Δvalue/old_value − 10·stdev(returns ⊙ weights) + 0.1·entropy(weights)`

use serde::{Deserialize, Serialize};

/// Scale applied to the percentage value change
pub const RETURN_SCALE: f64 = 100.0;
/// Scale applied to the cross-asset dispersion of weighted returns
pub const RISK_SCALE: f64 = 10.0;
/// Scale applied to the weight entropy
pub const DIVERSIFICATION_SCALE: f64 = 0.1;
/// Keeps `ln(w)` finite when a weight is exactly zero
pub const ENTROPY_EPS: f64 = 1e-8;

/// Reward signal components
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    /// Scaled portfolio return
    pub return_reward: f64,
    /// Scaled dispersion of weighted returns (subtracted)
    pub risk_penalty: f64,
    /// Scaled weight entropy (added)
    pub diversification_bonus: f64,
    /// Total reward
    pub total: f64,
}

impl RewardBreakdown {
    /// Compute the reward for one transition
    ///
    /// `weights` are the weights held after the rebalance. A non-positive
    /// `old_value` yields a zero return component instead of dividing by it.
    pub fn compute(old_value: f64, new_value: f64, returns: &[f64], weights: &[f64]) -> Self {
        let return_reward = if old_value > 0.0 {
            RETURN_SCALE * (new_value - old_value) / old_value
        } else {
            0.0
        };

        let weighted: Vec<f64> = returns
            .iter()
            .zip(weights.iter())
            .map(|(r, w)| r * w)
            .collect();
        let risk_penalty = RISK_SCALE * population_std(&weighted);
        let diversification_bonus = DIVERSIFICATION_SCALE * weight_entropy(weights);

        Self {
            return_reward,
            risk_penalty,
            diversification_bonus,
            total: return_reward - risk_penalty + diversification_bonus,
        }
    }
}

/// Shannon entropy of a weight vector: `−Σ wᵢ·ln(wᵢ + ε)`
pub fn weight_entropy(weights: &[f64]) -> f64 {
    -weights
        .iter()
        .map(|&w| w * (w + ENTROPY_EPS).ln())
        .sum::<f64>()
}

/// Population standard deviation (divides by n)
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy_finite_with_zero_weight() {
        let entropy = weight_entropy(&[0.0, 1.0]);
        assert!(entropy.is_finite());
        assert!(entropy.abs() < 1e-6);
    }

    #[test]
    fn test_uniform_entropy_is_ln_n() {
        let entropy = weight_entropy(&[0.25; 4]);
        assert!((entropy - 4f64.ln()).abs() < 1e-6);
    }

    #[test]
    fn test_population_std() {
        assert_eq!(population_std(&[]), 0.0);
        assert!((population_std(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reward_components() {
        let reward = RewardBreakdown::compute(100.0, 101.0, &[0.01, 0.01], &[0.5, 0.5]);
        assert!((reward.return_reward - 1.0).abs() < 1e-9);
        assert_eq!(reward.risk_penalty, 0.0);
        assert!((reward.diversification_bonus - 0.1 * 2f64.ln()).abs() < 1e-6);
        assert!(
            (reward.total - (reward.return_reward - reward.risk_penalty + reward.diversification_bonus))
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn test_zero_old_value_does_not_divide() {
        let reward = RewardBreakdown::compute(0.0, -5.0, &[0.1], &[1.0]);
        assert_eq!(reward.return_reward, 0.0);
        assert!(reward.total.is_finite());
    }
}
