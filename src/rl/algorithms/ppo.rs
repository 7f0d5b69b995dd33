//! Proximal Policy Optimization
//!
//! Batch container, advantage normalization, diagnostics and the clipped
//! surrogate loss. The parameter update itself lives with the model that owns
//! the optimizer.

use serde::{Deserialize, Serialize};

/// Added to the advantage standard deviation before dividing
pub const ADVANTAGE_EPS: f32 = 1e-8;

/// Batch of experiences for PPO training
#[derive(Debug, Clone, Default)]
pub struct PPOBatch {
    /// States [batch_size, state_dim]
    pub states: Vec<Vec<f32>>,
    /// Actions [batch_size, action_dim]
    pub actions: Vec<Vec<f32>>,
    /// Old log probabilities [batch_size]
    pub old_log_probs: Vec<f32>,
    /// Returns (value targets) [batch_size]
    pub returns: Vec<f32>,
    /// Advantages [batch_size]
    pub advantages: Vec<f32>,
    /// Old value estimates [batch_size]
    pub old_values: Vec<f32>,
}

impl PPOBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Get batch size
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Append another batch (barrier merge of independent rollouts)
    pub fn extend(&mut self, other: PPOBatch) {
        self.states.extend(other.states);
        self.actions.extend(other.actions);
        self.old_log_probs.extend(other.old_log_probs);
        self.returns.extend(other.returns);
        self.advantages.extend(other.advantages);
        self.old_values.extend(other.old_values);
    }

    /// Whether every per-sample column has the same length
    pub fn is_consistent(&self) -> bool {
        let n = self.states.len();
        self.actions.len() == n
            && self.old_log_probs.len() == n
            && self.returns.len() == n
            && self.advantages.len() == n
            && self.old_values.len() == n
    }
}

/// Output from a PPO update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PPOOutput {
    /// Policy loss (clipped surrogate), last epoch
    pub policy_loss: f32,
    /// Value function loss, last epoch
    pub value_loss: f32,
    /// Mean policy entropy, last epoch
    pub entropy: f32,
    /// Approximate KL divergence from the collecting policy
    pub approx_kl: f32,
    /// Fraction of samples whose ratio fell outside the clip range
    pub clip_fraction: f32,
    /// Epochs actually applied (non-finite losses are skipped)
    pub epochs_applied: usize,
}

/// Normalize advantages to zero mean and unit variance within the batch
///
/// Uses the sample standard deviation; a single-element batch is only
/// centered.
pub fn normalize_advantages(advantages: &mut [f32]) {
    let n = advantages.len();
    if n == 0 {
        return;
    }
    let mean = advantages.iter().sum::<f32>() / n as f32;
    let std = if n > 1 {
        let var = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / (n - 1) as f32;
        var.sqrt()
    } else {
        0.0
    };
    for adv in advantages.iter_mut() {
        *adv = (*adv - mean) / (std + ADVANTAGE_EPS);
    }
}

/// Approximate KL and clip fraction from old/new log probabilities
pub fn ratio_diagnostics(old_log_probs: &[f32], new_log_probs: &[f32], clip_ratio: f32) -> (f32, f32) {
    let n = old_log_probs.len().min(new_log_probs.len());
    if n == 0 {
        return (0.0, 0.0);
    }
    let mut kl = 0.0f32;
    let mut clipped = 0usize;
    for (old, new) in old_log_probs.iter().zip(new_log_probs.iter()) {
        kl += old - new;
        if ((new - old).exp() - 1.0).abs() > clip_ratio {
            clipped += 1;
        }
    }
    (kl / n as f32, clipped as f32 / n as f32)
}

#[cfg(feature = "rl")]
pub use tensor_loss::{ppo_loss, PPOLoss};

#[cfg(feature = "rl")]
mod tensor_loss {
    use burn::prelude::*;

    use crate::rl::config::PPOConfig;

    /// Loss terms of one PPO pass, still attached to the autodiff graph
    #[derive(Debug, Clone)]
    pub struct PPOLoss<B: Backend> {
        pub total: Tensor<B, 1>,
        pub policy_loss: Tensor<B, 1>,
        pub value_loss: Tensor<B, 1>,
        pub entropy: Tensor<B, 1>,
    }

    /// Clipped surrogate objective plus value and entropy terms
    ///
    /// `total = policy_loss + value_coef·value_loss − entropy_coef·mean(entropy)`
    pub fn ppo_loss<B: Backend>(
        new_log_probs: Tensor<B, 1>,
        values: Tensor<B, 1>,
        entropy: Tensor<B, 1>,
        old_log_probs: Tensor<B, 1>,
        advantages: Tensor<B, 1>,
        returns: Tensor<B, 1>,
        config: &PPOConfig,
    ) -> PPOLoss<B> {
        let ratio = (new_log_probs - old_log_probs).exp();
        let surr1 = ratio.clone() * advantages.clone();
        let surr2 = ratio.clamp(1.0 - config.clip_ratio, 1.0 + config.clip_ratio) * advantages;
        let policy_loss = surr1.min_pair(surr2).mean().mul_scalar(-1.0);

        let value_loss = (values - returns).powf_scalar(2.0).mean();
        let entropy = entropy.mean();

        let total = policy_loss.clone() + value_loss.clone().mul_scalar(config.value_coef)
            - entropy.clone().mul_scalar(config.entropy_coef);

        PPOLoss {
            total,
            policy_loss,
            value_loss,
            entropy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ppo_batch() {
        let mut batch = PPOBatch::new();
        assert!(batch.is_empty());
        batch.states.push(vec![0.0; 3]);
        batch.actions.push(vec![0.5]);
        batch.old_log_probs.push(-1.0);
        batch.returns.push(1.0);
        batch.advantages.push(0.5);
        batch.old_values.push(0.5);
        assert_eq!(batch.len(), 1);
        assert!(batch.is_consistent());

        let other = batch.clone();
        batch.extend(other);
        assert_eq!(batch.len(), 2);
        assert!(batch.is_consistent());
    }

    #[test]
    fn test_normalize_advantages() {
        let mut adv = vec![1.0, 2.0, 3.0, 4.0];
        normalize_advantages(&mut adv);
        let mean: f32 = adv.iter().sum::<f32>() / 4.0;
        let var: f32 = adv.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / 3.0;
        assert!(mean.abs() < 1e-6);
        assert!((var - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_normalize_constant_advantages_is_finite() {
        let mut adv = vec![2.0; 5];
        normalize_advantages(&mut adv);
        assert!(adv.iter().all(|a| a.is_finite() && a.abs() < 1e-6));

        let mut single = vec![3.0];
        normalize_advantages(&mut single);
        assert_eq!(single, vec![0.0]);
    }

    #[test]
    fn test_ratio_diagnostics() {
        let (kl, clip) = ratio_diagnostics(&[-1.0, -1.0], &[-1.0, -1.0], 0.2);
        assert_eq!(kl, 0.0);
        assert_eq!(clip, 0.0);

        let (_, clip) = ratio_diagnostics(&[-1.0, -1.0], &[-1.0, -0.5], 0.2);
        assert!((clip - 0.5).abs() < 1e-6);
    }

    #[cfg(feature = "rl")]
    mod tensor {
        use super::super::*;
        use crate::rl::config::PPOConfig;
        use burn::prelude::*;
        use burn::tensor::{ElementConversion, TensorData};
        use burn_ndarray::NdArray;

        type TestBackend = NdArray<f32>;

        fn tensor(values: &[f32]) -> Tensor<TestBackend, 1> {
            Tensor::from_data(TensorData::new(values.to_vec(), [values.len()]), &Default::default())
        }

        fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
            t.into_scalar().elem::<f32>()
        }

        #[test]
        fn test_unit_ratio_policy_loss_is_negative_mean_advantage() {
            let log_probs = [-1.2, -0.7, -3.0];
            let advantages = [0.5, -1.5, 2.5];
            let loss = ppo_loss(
                tensor(&log_probs),
                tensor(&[0.0; 3]),
                tensor(&[0.0; 3]),
                tensor(&log_probs),
                tensor(&advantages),
                tensor(&[0.0; 3]),
                &PPOConfig::default(),
            );
            let expected = -(0.5 - 1.5 + 2.5) / 3.0;
            assert!((scalar(loss.policy_loss) - expected).abs() < 1e-6);
        }

        #[test]
        fn test_ratio_is_clipped_for_positive_advantage() {
            // ratio = e^1 > 1.2, advantage positive -> clipped at 1.2
            let loss = ppo_loss(
                tensor(&[0.0]),
                tensor(&[1.0]),
                tensor(&[0.0]),
                tensor(&[-1.0]),
                tensor(&[1.0]),
                tensor(&[3.0]),
                &PPOConfig::default(),
            );
            assert!((scalar(loss.policy_loss) + 1.2).abs() < 1e-5);
            assert!((scalar(loss.value_loss) - 4.0).abs() < 1e-5);
        }

        #[test]
        fn test_total_combines_terms() {
            let config = PPOConfig::default();
            let loss = ppo_loss(
                tensor(&[-1.0, -1.0]),
                tensor(&[1.0, 2.0]),
                tensor(&[0.4, 0.6]),
                tensor(&[-1.0, -1.0]),
                tensor(&[1.0, -1.0]),
                tensor(&[0.0, 0.0]),
                &config,
            );
            let expected = 0.0 + config.value_coef * 2.5 - config.entropy_coef * 0.5;
            assert!((scalar(loss.total) - expected).abs() < 1e-5);
        }
    }
}
