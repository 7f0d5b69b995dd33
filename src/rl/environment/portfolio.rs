//! Portfolio Rebalancing Environment
//!
//! Gym-like `reset`/`step` interface over one portfolio-management episode.
//! All mutable episode counters live in [`EpisodeState`] and are only
//! touched by `reset` and `step`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::market::{GaussianReturns, ReturnSource};
use crate::error::{RebalanceError, Result};
use crate::rl::config::EnvConfig;
use crate::rl::core::action::{normalize_action, turnover, uniform_weights};
use crate::rl::core::reward::RewardBreakdown;
use crate::rl::core::state::PortfolioState;

/// Weight change above which a rebalance counts as a trade
pub const TRADE_THRESHOLD: f64 = 0.01;

/// Volatility proxy in the observation is `|return| · VOL_PROXY_SCALE`
pub const VOL_PROXY_SCALE: f64 = 2.0;

/// Why an episode ended (or that it has not)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    #[default]
    Running,
    /// Day counter reached the horizon
    Horizon,
    /// Portfolio value fell below the ruin fraction of initial capital
    Ruin,
}

impl Termination {
    pub fn is_done(&self) -> bool {
        !matches!(self, Termination::Running)
    }
}

/// Mutable counters of the running episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeState {
    pub portfolio_value: f64,
    pub weights: Vec<f64>,
    pub day: usize,
    /// Never reset within an episode, so the budget flag drops for good
    /// once `max_daily_trades` steps have been taken
    pub trades_today: u32,
    pub days_since_trade: u32,
    /// Returns drawn most recently, shown in the observation
    pub last_returns: Vec<f64>,
    pub total_costs: f64,
}

impl EpisodeState {
    fn initial(config: &EnvConfig) -> Self {
        Self {
            portfolio_value: config.initial_capital,
            weights: uniform_weights(config.n_assets),
            day: 0,
            trades_today: 0,
            days_since_trade: 0,
            last_returns: vec![0.0; config.n_assets],
            total_costs: 0.0,
        }
    }
}

/// Additional step information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Portfolio value after the step
    pub portfolio_value: f64,
    /// Return of the held portfolio over this step, before costs
    pub realized_return: f64,
    /// Weights held after the rebalance
    pub weights: Vec<f64>,
    /// Transaction cost charged this step
    pub costs: f64,
    /// Reward components
    pub reward: RewardBreakdown,
    pub termination: Termination,
}

/// Result of taking a step in the environment
#[derive(Debug, Clone)]
pub struct StepResult {
    /// New observation after action
    pub observation: Vec<f32>,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

/// Portfolio environment for RL training
pub struct PortfolioEnvironment {
    config: EnvConfig,
    source: Box<dyn ReturnSource>,
    episode: EpisodeState,
}

impl PortfolioEnvironment {
    /// Create an environment backed by the simulated Gaussian return source
    pub fn new(config: EnvConfig) -> Result<Self> {
        let source = GaussianReturns::new(config.return_params(), config.seed);
        Self::with_source(config, Box::new(source))
    }

    /// Create an environment backed by a caller-supplied return source
    pub fn with_source(config: EnvConfig, source: Box<dyn ReturnSource>) -> Result<Self> {
        if config.n_assets == 0 {
            return Err(RebalanceError::InvalidConfig(
                "environment.n_assets must be at least 1".to_string(),
            ));
        }
        if source.n_assets() != config.n_assets {
            return Err(RebalanceError::dimension(
                "return source assets",
                config.n_assets,
                source.n_assets(),
            ));
        }
        let episode = EpisodeState::initial(&config);
        Ok(Self {
            config,
            source,
            episode,
        })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn episode(&self) -> &EpisodeState {
        &self.episode
    }

    pub fn state_dim(&self) -> usize {
        self.config.state_dim()
    }

    pub fn action_dim(&self) -> usize {
        self.config.action_dim()
    }

    /// Reset the environment for a new episode
    ///
    /// One return sample is drawn so the first observation carries market
    /// information; it does not move the portfolio.
    pub fn reset(&mut self) -> Vec<f32> {
        self.episode = EpisodeState::initial(&self.config);
        self.episode.last_returns = self.draw_returns();
        self.observation()
    }

    /// Take a step in the environment
    pub fn step(&mut self, action: &[f32]) -> Result<StepResult> {
        if action.len() != self.config.n_assets {
            return Err(RebalanceError::dimension(
                "action",
                self.config.n_assets,
                action.len(),
            ));
        }

        let target = normalize_action(action);
        let old_value = self.episode.portfolio_value;
        let moved = turnover(&self.episode.weights, &target);
        let costs = moved * self.config.transaction_cost * old_value;

        let returns = self.draw_returns();
        let realized_return: f64 = self
            .episode
            .weights
            .iter()
            .zip(returns.iter())
            .map(|(w, r)| w * r)
            .sum();
        let new_value = old_value * (1.0 + realized_return) - costs;

        let traded = self
            .episode
            .weights
            .iter()
            .zip(target.iter())
            .any(|(c, t)| (t - c).abs() > TRADE_THRESHOLD);

        let episode = &mut self.episode;
        episode.portfolio_value = new_value;
        episode.weights = target;
        episode.trades_today = episode.trades_today.saturating_add(1);
        episode.day += 1;
        episode.days_since_trade = if traded {
            0
        } else {
            episode.days_since_trade.saturating_add(1)
        };
        episode.total_costs += costs;
        episode.last_returns = returns;

        let reward = RewardBreakdown::compute(
            old_value,
            new_value,
            &self.episode.last_returns,
            &self.episode.weights,
        );
        let termination = self.check_done();

        debug!(
            day = self.episode.day,
            value = new_value,
            reward = reward.total,
            costs,
            "environment step"
        );

        Ok(StepResult {
            observation: self.observation(),
            reward: reward.total,
            done: termination.is_done(),
            info: StepInfo {
                portfolio_value: new_value,
                realized_return,
                weights: self.episode.weights.clone(),
                costs,
                reward,
                termination,
            },
        })
    }

    /// Structured view of the current observation
    pub fn portfolio_state(&self) -> PortfolioState {
        PortfolioState {
            weights: self.episode.weights.clone(),
            returns: self.episode.last_returns.clone(),
            volatilities: self
                .episode
                .last_returns
                .iter()
                .map(|r| r.abs() * VOL_PROXY_SCALE)
                .collect(),
            value_ratio: self.episode.portfolio_value / self.config.initial_capital,
            days_since_trade: self.episode.days_since_trade,
            trade_available: self.episode.trades_today < self.config.max_daily_trades,
        }
    }

    fn observation(&self) -> Vec<f32> {
        self.portfolio_state().to_vector()
    }

    fn draw_returns(&mut self) -> Vec<f64> {
        let mut returns = self.source.next_returns();
        // A misbehaving feed must not break the weight/return pairing
        returns.resize(self.config.n_assets, 0.0);
        returns
    }

    /// Check if episode is done
    fn check_done(&self) -> Termination {
        if self.episode.portfolio_value < self.config.ruin_fraction * self.config.initial_capital {
            return Termination::Ruin;
        }
        if self.episode.day >= self.config.horizon {
            return Termination::Horizon;
        }
        Termination::Running
    }
}
