//! Rollout Storage
//!
//! On-policy trajectory storage for PPO. A rollout is one episode's ordered
//! transitions plus the bootstrap value of the final state.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rl::algorithms::gae::compute_gae;
use crate::rl::algorithms::ppo::PPOBatch;
use crate::rl::core::reward::RewardBreakdown;

/// A single transition in the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    /// State features before action
    pub state: Vec<f32>,
    /// Raw action as sampled (before normalization)
    pub action: Vec<f32>,
    /// Reward received
    pub reward: f32,
    /// Detailed reward components
    pub reward_breakdown: RewardBreakdown,
    /// Whether episode terminated
    pub done: bool,
    /// Log probability of action at collection time
    pub log_prob: f32,
    /// Value estimate at state
    pub value: f32,
}

impl Transition {
    /// Create a new transition
    pub fn new(state: Vec<f32>, action: Vec<f32>, reward: f32, done: bool) -> Self {
        Self {
            state,
            action,
            reward,
            reward_breakdown: RewardBreakdown {
                total: reward as f64,
                return_reward: reward as f64,
                ..Default::default()
            },
            done,
            log_prob: 0.0,
            value: 0.0,
        }
    }

    /// Set the reward breakdown
    pub fn with_reward_breakdown(mut self, breakdown: RewardBreakdown) -> Self {
        self.reward_breakdown = breakdown;
        self
    }

    /// Set PPO-specific fields
    pub fn with_ppo_data(mut self, log_prob: f32, value: f32) -> Self {
        self.log_prob = log_prob;
        self.value = value;
        self
    }
}

/// One episode of transitions plus the trailing bootstrap value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rollout {
    pub transitions: Vec<Transition>,
    /// Value estimate of the state after the last transition
    pub bootstrap_value: f32,
    /// Portfolio value when the rollout stopped
    pub final_portfolio_value: f64,
}

impl Rollout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transition
    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    /// Get rollout length
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Sum of rewards over the episode
    pub fn total_reward(&self) -> f32 {
        self.transitions.iter().map(|t| t.reward).sum()
    }

    /// Value estimates followed by the bootstrap value (length `len() + 1`)
    pub fn values_with_bootstrap(&self) -> Vec<f32> {
        let mut values: Vec<f32> = self.transitions.iter().map(|t| t.value).collect();
        values.push(self.bootstrap_value);
        values
    }

    /// Run GAE and flatten into a PPO batch (advantages not yet normalized)
    pub fn into_batch(self, gamma: f32, gae_lambda: f32) -> Result<PPOBatch> {
        let rewards: Vec<f32> = self.transitions.iter().map(|t| t.reward).collect();
        let dones: Vec<bool> = self.transitions.iter().map(|t| t.done).collect();
        let values = self.values_with_bootstrap();
        let gae = compute_gae(&rewards, &values, &dones, gamma, gae_lambda)?;

        let mut batch = PPOBatch::new();
        for transition in self.transitions {
            batch.states.push(transition.state);
            batch.actions.push(transition.action);
            batch.old_log_probs.push(transition.log_prob);
            batch.old_values.push(transition.value);
        }
        batch.advantages = gae.advantages;
        batch.returns = gae.returns;
        Ok(batch)
    }
}

/// Merge independent rollouts into one batch, each with its own GAE pass
pub fn merge_rollouts(rollouts: Vec<Rollout>, gamma: f32, gae_lambda: f32) -> Result<PPOBatch> {
    let mut batch = PPOBatch::new();
    for rollout in rollouts {
        batch.extend(rollout.into_batch(gamma, gae_lambda)?);
    }
    Ok(batch)
}
