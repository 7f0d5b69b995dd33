//! RL Algorithms
//!
//! Advantage estimation and the PPO objective.

pub mod gae;
pub mod ppo;

pub use gae::{compute_gae, GaeOutput};
#[cfg(feature = "rl")]
pub use ppo::{ppo_loss, PPOLoss};
pub use ppo::{normalize_advantages, ratio_diagnostics, PPOBatch, PPOOutput};
