//! Experience Memory
//!
//! Rollout storage for on-policy training.

pub mod rollout;

pub use rollout::{merge_rollouts, Rollout, Transition};
