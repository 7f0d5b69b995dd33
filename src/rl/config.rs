//! RL Configuration
//!
//! Configuration structs for the environment, network, PPO and training loop.

use serde::{Deserialize, Serialize};

use crate::error::{RebalanceError, Result};

/// One simulated trading year
pub const EPISODE_HORIZON: usize = 252;

/// Default per-asset drift (daily), cycled when there are more assets
pub const DEFAULT_DRIFTS: [f64; 4] = [0.0001, 0.0002, 0.00015, 0.00025];

/// Default per-asset volatility (daily), cycled when there are more assets
pub const DEFAULT_VOLATILITIES: [f64; 4] = [0.02, 0.03, 0.025, 0.015];

/// Main RL configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RLConfig {
    /// Portfolio environment configuration
    pub environment: EnvConfig,
    /// Actor-critic network configuration
    pub network: NetworkConfig,
    /// PPO algorithm configuration
    pub ppo: PPOConfig,
    /// Training loop configuration
    pub training: TrainingConfig,
    /// Allocation advisor configuration
    pub advisor: AdvisorConfig,
}

impl RLConfig {
    /// Configuration for a given number of assets, defaults elsewhere
    pub fn with_assets(n_assets: usize) -> Self {
        Self {
            environment: EnvConfig {
                n_assets,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        self.environment.validate()?;
        self.network.validate()?;
        self.ppo.validate()?;
        self.training.validate()?;
        Ok(())
    }
}

/// Portfolio environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Number of assets in the portfolio
    pub n_assets: usize,
    /// Starting portfolio value
    pub initial_capital: f64,
    /// Proportional cost charged on traded notional
    pub transaction_cost: f64,
    /// Trades allowed before the trade-budget flag drops to zero
    pub max_daily_trades: u32,
    /// Episode horizon in trading days
    pub horizon: usize,
    /// Episode ends when value falls below this fraction of initial capital
    pub ruin_fraction: f64,
    /// Per-asset drift; empty means the built-in defaults
    pub drifts: Vec<f64>,
    /// Per-asset volatility; empty means the built-in defaults
    pub volatilities: Vec<f64>,
    /// Seed for the simulated return source
    pub seed: Option<u64>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            n_assets: 4,
            initial_capital: 10_000.0,
            transaction_cost: 0.001,
            max_daily_trades: 5,
            horizon: EPISODE_HORIZON,
            ruin_fraction: 0.5,
            drifts: Vec::new(),
            volatilities: Vec::new(),
            seed: None,
        }
    }
}

impl EnvConfig {
    /// Length of the state vector: weights, returns, volatility + 3 scalars
    pub fn state_dim(&self) -> usize {
        3 * self.n_assets + 3
    }

    /// Length of the action vector
    pub fn action_dim(&self) -> usize {
        self.n_assets
    }

    /// Drift/volatility pair for each asset
    pub fn return_params(&self) -> Vec<(f64, f64)> {
        (0..self.n_assets)
            .map(|i| {
                let drift = self
                    .drifts
                    .get(i)
                    .copied()
                    .unwrap_or(DEFAULT_DRIFTS[i % DEFAULT_DRIFTS.len()]);
                let vol = self
                    .volatilities
                    .get(i)
                    .copied()
                    .unwrap_or(DEFAULT_VOLATILITIES[i % DEFAULT_VOLATILITIES.len()]);
                (drift, vol)
            })
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.n_assets == 0 {
            return Err(RebalanceError::InvalidConfig(
                "environment.n_assets must be at least 1".to_string(),
            ));
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(RebalanceError::InvalidConfig(format!(
                "environment.initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if !(0.0..1.0).contains(&self.transaction_cost) {
            return Err(RebalanceError::InvalidConfig(format!(
                "environment.transaction_cost must be within [0, 1), got {}",
                self.transaction_cost
            )));
        }
        if self.horizon == 0 {
            return Err(RebalanceError::InvalidConfig(
                "environment.horizon must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.ruin_fraction) {
            return Err(RebalanceError::InvalidConfig(format!(
                "environment.ruin_fraction must be within [0, 1), got {}",
                self.ruin_fraction
            )));
        }
        if self.volatilities.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(RebalanceError::InvalidConfig(
                "environment.volatilities must be finite and non-negative".to_string(),
            ));
        }
        if self.drifts.iter().any(|d| !d.is_finite()) {
            return Err(RebalanceError::InvalidConfig(
                "environment.drifts must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Actor-critic network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Width of the shared hidden layers
    pub hidden_dim: usize,
    /// Initial value of the learnable action spread
    pub initial_std: f32,
    /// Lower clamp on the action spread
    pub min_std: f32,
    /// Upper clamp on the action spread
    pub max_std: f32,
    /// Use the parametric policy when the tensor backend is compiled in
    pub use_learned_policy: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 128,
            initial_std: 0.5,
            min_std: 0.01,
            max_std: 1.0,
            use_learned_policy: true,
        }
    }
}

impl NetworkConfig {
    fn validate(&self) -> Result<()> {
        if self.hidden_dim == 0 {
            return Err(RebalanceError::InvalidConfig(
                "network.hidden_dim must be at least 1".to_string(),
            ));
        }
        if !(self.min_std > 0.0 && self.min_std <= self.max_std) {
            return Err(RebalanceError::InvalidConfig(format!(
                "network std bounds must satisfy 0 < min_std <= max_std, got [{}, {}]",
                self.min_std, self.max_std
            )));
        }
        Ok(())
    }
}

/// PPO algorithm hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PPOConfig {
    /// Learning rate
    pub lr: f64,
    /// Discount factor (gamma)
    pub gamma: f32,
    /// GAE lambda
    pub gae_lambda: f32,
    /// PPO clip range
    pub clip_ratio: f32,
    /// Value function coefficient
    pub value_coef: f32,
    /// Entropy bonus coefficient
    pub entropy_coef: f32,
    /// Number of optimization passes per update
    pub n_epochs: usize,
    /// Maximum gradient norm, applied to each parameter tensor on its own
    /// rather than to the global norm across all parameters
    pub max_grad_norm: f32,
}

impl Default for PPOConfig {
    fn default() -> Self {
        Self {
            lr: 3e-4,
            gamma: 0.99,
            gae_lambda: 0.95,
            clip_ratio: 0.2,
            value_coef: 0.5,
            entropy_coef: 0.01,
            n_epochs: 4,
            max_grad_norm: 0.5,
        }
    }
}

impl PPOConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(RebalanceError::InvalidConfig(format!(
                "ppo.gamma must be within [0, 1], got {}",
                self.gamma
            )));
        }
        if !(0.0..=1.0).contains(&self.gae_lambda) {
            return Err(RebalanceError::InvalidConfig(format!(
                "ppo.gae_lambda must be within [0, 1], got {}",
                self.gae_lambda
            )));
        }
        if !(self.clip_ratio > 0.0 && self.clip_ratio.is_finite()) {
            return Err(RebalanceError::InvalidConfig(format!(
                "ppo.clip_ratio must be positive, got {}",
                self.clip_ratio
            )));
        }
        if !(self.value_coef.is_finite() && self.value_coef >= 0.0) {
            return Err(RebalanceError::InvalidConfig(format!(
                "ppo.value_coef must be finite and non-negative, got {}",
                self.value_coef
            )));
        }
        if !self.entropy_coef.is_finite() {
            return Err(RebalanceError::InvalidConfig(format!(
                "ppo.entropy_coef must be finite, got {}",
                self.entropy_coef
            )));
        }
        if self.n_epochs == 0 {
            return Err(RebalanceError::InvalidConfig(
                "ppo.n_epochs must be at least 1".to_string(),
            ));
        }
        if !(self.lr > 0.0 && self.lr.is_finite() && self.max_grad_norm > 0.0) {
            return Err(RebalanceError::InvalidConfig(
                "ppo.lr and ppo.max_grad_norm must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Training loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Episodes run by `train` when no count is given
    pub episodes: usize,
    /// Maximum steps collected per rollout
    pub max_steps: usize,
    /// Rollouts merged into one PPO update
    pub rollouts_per_update: usize,
    /// Episodes between progress reports
    pub report_interval: usize,
    /// Checkpoint save frequency (episodes), 0 disables
    pub checkpoint_frequency: usize,
    /// Seed for action sampling
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 1000,
            max_steps: EPISODE_HORIZON,
            rollouts_per_update: 1,
            report_interval: 100,
            checkpoint_frequency: 0,
            seed: None,
        }
    }
}

impl TrainingConfig {
    fn validate(&self) -> Result<()> {
        if self.max_steps == 0 || self.rollouts_per_update == 0 || self.report_interval == 0 {
            return Err(RebalanceError::InvalidConfig(
                "training.max_steps, rollouts_per_update and report_interval must be at least 1"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Allocation advisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Weight change (absolute) that is worth mentioning in the rationale
    pub rationale_threshold: f64,
    /// Step size of the momentum tilt used by the fallback heuristic
    pub momentum_step: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            rationale_threshold: 0.05,
            momentum_step: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RLConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.environment.state_dim(), 15);
        assert_eq!(config.ppo.n_epochs, 4);
    }

    #[test]
    fn test_zero_assets_rejected() {
        let config = RLConfig::with_assets(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("n_assets"));
    }

    #[test]
    fn test_return_params_cycle_defaults() {
        let env = EnvConfig {
            n_assets: 6,
            ..Default::default()
        };
        let params = env.return_params();
        assert_eq!(params.len(), 6);
        assert_eq!(params[4], (DEFAULT_DRIFTS[0], DEFAULT_VOLATILITIES[0]));
    }

    #[test]
    fn test_return_params_overrides() {
        let env = EnvConfig {
            n_assets: 2,
            drifts: vec![0.001],
            volatilities: vec![0.0, 0.0],
            ..Default::default()
        };
        let params = env.return_params();
        assert_eq!(params[0], (0.001, 0.0));
        assert_eq!(params[1], (DEFAULT_DRIFTS[1], 0.0));
    }

    #[test]
    fn test_non_finite_ppo_coefficients_rejected() {
        let mut config = RLConfig::default();
        config.ppo.clip_ratio = f32::NAN;
        assert!(config.validate().unwrap_err().to_string().contains("clip_ratio"));

        let mut config = RLConfig::default();
        config.ppo.value_coef = f32::INFINITY;
        assert!(config.validate().unwrap_err().to_string().contains("value_coef"));

        let mut config = RLConfig::default();
        config.ppo.entropy_coef = f32::NAN;
        assert!(config.validate().unwrap_err().to_string().contains("entropy_coef"));
    }

    #[test]
    fn test_bad_std_bounds_rejected() {
        let mut config = RLConfig::default();
        config.network.min_std = 0.0;
        assert!(config.validate().is_err());
    }
}
