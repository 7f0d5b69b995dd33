//! Core RL abstractions
//!
//! Fundamental types for state representation, actions, and rewards.

pub mod action;
pub mod gaussian;
pub mod reward;
pub mod state;

pub use action::{normalize_action, normalize_weights, turnover, uniform_weights, weight_changes};
pub use reward::{weight_entropy, RewardBreakdown};
pub use state::{state_dim, PortfolioState, StateView};
