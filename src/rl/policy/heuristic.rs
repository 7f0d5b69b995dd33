use std::path::Path;

use rand::RngCore;

use super::{ActionEvaluation, ActionSample, PolicySource, PolicyValueModel};
use crate::error::{RebalanceError, Result};
use crate::rl::core::action::normalize_weights;
use crate::rl::core::state::{state_dim, StateView};

/// Added to the L1 norm of returns before dividing
pub const MOMENTUM_EPS: f64 = 1e-8;

/// Tilt `weights` toward assets with higher returns
///
/// `target = normalize(weights + step · returns / (Σ|returns| + ε))`
pub fn momentum_target(weights: &[f64], returns: &[f64], step: f64) -> Vec<f64> {
    let l1: f64 = returns.iter().map(|r| r.abs()).sum();
    let tilted: Vec<f64> = weights
        .iter()
        .zip(returns.iter())
        .map(|(w, r)| w + step * r / (l1 + MOMENTUM_EPS))
        .collect();
    normalize_weights(&tilted)
}

/// Deterministic momentum rule standing in for a trained policy
///
/// Sampling returns the mean action with zero log-probability and value, so
/// the heuristic also drives the environment for evaluation.
#[derive(Debug, Clone)]
pub struct MomentumPolicy {
    n_assets: usize,
    step: f64,
}

impl MomentumPolicy {
    pub fn new(n_assets: usize, step: f64) -> Self {
        Self { n_assets, step }
    }

    fn view<'a>(&self, state: &'a [f32]) -> Result<StateView<'a>> {
        let expected = state_dim(self.n_assets);
        if state.len() != expected {
            return Err(RebalanceError::dimension("state", expected, state.len()));
        }
        StateView::new(state).ok_or_else(|| RebalanceError::dimension("state", expected, state.len()))
    }
}

impl PolicyValueModel for MomentumPolicy {
    fn source(&self) -> PolicySource {
        PolicySource::Heuristic
    }

    fn state_dim(&self) -> usize {
        state_dim(self.n_assets)
    }

    fn action_dim(&self) -> usize {
        self.n_assets
    }

    fn sample_action(&self, state: &[f32], _rng: &mut dyn RngCore) -> Result<ActionSample> {
        Ok(ActionSample {
            action: self.mean_action(state)?,
            log_prob: 0.0,
            value: 0.0,
        })
    }

    fn evaluate(&self, state: &[f32], action: &[f32]) -> Result<ActionEvaluation> {
        self.view(state)?;
        if action.len() != self.n_assets {
            return Err(RebalanceError::dimension("action", self.n_assets, action.len()));
        }
        Ok(ActionEvaluation {
            log_prob: 0.0,
            value: 0.0,
            entropy: 0.0,
        })
    }

    fn mean_action(&self, state: &[f32]) -> Result<Vec<f32>> {
        let view = self.view(state)?;
        let weights: Vec<f64> = view.weights().iter().map(|&w| w as f64).collect();
        let returns: Vec<f64> = view.returns().iter().map(|&r| r as f64).collect();
        Ok(momentum_target(&weights, &returns, self.step)
            .into_iter()
            .map(|w| w as f32)
            .collect())
    }

    fn value(&self, state: &[f32]) -> Result<f32> {
        self.view(state)?;
        Ok(0.0)
    }

    fn save(&self, _path: &Path) -> Result<()> {
        Err(RebalanceError::ModelUnavailable(
            "the momentum heuristic has no parameters to save".to_string(),
        ))
    }

    fn load(&mut self, _path: &Path) -> Result<()> {
        Err(RebalanceError::ModelUnavailable(
            "the momentum heuristic cannot load learned parameters".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::core::state::PortfolioState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn state(weights: Vec<f64>, returns: Vec<f64>) -> Vec<f32> {
        let n = weights.len();
        PortfolioState {
            weights,
            returns,
            volatilities: vec![0.0; n],
            value_ratio: 1.0,
            days_since_trade: 0,
            trade_available: true,
        }
        .to_vector()
    }

    #[test]
    fn test_momentum_tilts_toward_higher_return() {
        let target = momentum_target(&[0.5, 0.5], &[0.0, 0.2], 0.1);
        assert!(target[1] > 0.5);
        assert!(target[0] < 0.5);
        assert!((target.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_returns_keep_weights() {
        let target = momentum_target(&[0.2, 0.8], &[0.0, 0.0], 0.1);
        assert!((target[0] - 0.2).abs() < 1e-9);
        assert!((target[1] - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_sample_is_deterministic_mean() {
        let policy = MomentumPolicy::new(2, 0.1);
        let s = state(vec![0.5, 0.5], vec![0.01, -0.01]);
        let mut rng = StdRng::seed_from_u64(3);
        let sample = policy.sample_action(&s, &mut rng).unwrap();
        assert_eq!(sample.action, policy.mean_action(&s).unwrap());
        assert_eq!(sample.log_prob, 0.0);
        assert_eq!(policy.source(), PolicySource::Heuristic);
        assert!(!policy.is_trainable());
    }

    #[test]
    fn test_wrong_state_length_rejected() {
        let policy = MomentumPolicy::new(3, 0.1);
        assert!(policy.mean_action(&[0.0; 9]).is_err());
    }

    #[test]
    fn test_save_is_unavailable() {
        let policy = MomentumPolicy::new(2, 0.1);
        let err = policy.save(Path::new("unused.bin")).unwrap_err();
        assert!(matches!(err, RebalanceError::ModelUnavailable(_)));
    }
}
