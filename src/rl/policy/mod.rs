//! Policy-Value Models
//!
//! One interface, two variants chosen once at construction: the parametric
//! actor-critic network (behind the `rl` feature) and a deterministic
//! momentum heuristic used when no learned policy is available.

mod heuristic;

use std::fmt;
use std::path::Path;

use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use heuristic::{momentum_target, MomentumPolicy, MOMENTUM_EPS};

use crate::error::Result;
use crate::rl::algorithms::ppo::{PPOBatch, PPOOutput};
use crate::rl::config::PPOConfig;

/// Which variant produced an allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySource {
    /// Trained actor-critic network
    Learned,
    /// Rule-based momentum fallback
    Heuristic,
}

impl fmt::Display for PolicySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicySource::Learned => f.pad("learned"),
            PolicySource::Heuristic => f.pad("heuristic"),
        }
    }
}

/// Action drawn from the policy distribution
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSample {
    pub action: Vec<f32>,
    pub log_prob: f32,
    pub value: f32,
}

/// Re-evaluation of a stored action under the current parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionEvaluation {
    pub log_prob: f32,
    pub value: f32,
    pub entropy: f32,
}

/// Maps a state vector to an action distribution and a value estimate
pub trait PolicyValueModel {
    /// Which variant this is
    fn source(&self) -> PolicySource;

    fn state_dim(&self) -> usize;

    fn action_dim(&self) -> usize;

    /// Draw an action, its log-probability and the state value
    fn sample_action(&self, state: &[f32], rng: &mut dyn RngCore) -> Result<ActionSample>;

    /// Log-probability, value and entropy of `action` in `state`
    fn evaluate(&self, state: &[f32], action: &[f32]) -> Result<ActionEvaluation>;

    /// Deterministic action (distribution mean)
    fn mean_action(&self, state: &[f32]) -> Result<Vec<f32>>;

    /// State value estimate
    fn value(&self, state: &[f32]) -> Result<f32>;

    /// Whether `update` can change parameters
    fn is_trainable(&self) -> bool {
        false
    }

    /// One PPO update over a merged batch; `None` when nothing was trained
    fn update(&mut self, _batch: &PPOBatch, _config: &PPOConfig) -> Result<Option<PPOOutput>> {
        Ok(None)
    }

    /// Persist parameters
    fn save(&self, path: &Path) -> Result<()>;

    /// Replace parameters from a file, leaving them untouched on error
    fn load(&mut self, path: &Path) -> Result<()>;
}
