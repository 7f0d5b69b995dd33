//! Reinforcement Learning Module
//!
//! PPO-trained portfolio allocation policy with a deterministic fallback.
//!
//! # Features
//!
//! - **Environment**: simulated portfolio episodes over a pluggable return source
//! - **Policy**: Gaussian actor-critic (Burn) or momentum heuristic
//! - **Algorithms**: GAE and PPO with clipped surrogate objective
//! - **Advisor**: single-shot allocation suggestions with a rationale
//!
//! # Usage
//!
//! The learned policy needs the `rl` feature (on by default):
//! ```toml
//! rebalancer = { features = ["rl"] }
//! ```

pub mod agent;
pub mod algorithms;
pub mod config;
pub mod core;
pub mod environment;
pub mod integration;
pub mod memory;
#[cfg(feature = "rl")]
pub mod networks;
pub mod policy;
pub mod training;

// Agent exports
pub use agent::{TradingAgent, LEARNED_POLICY_AVAILABLE};

// Config exports
pub use config::{AdvisorConfig, EnvConfig, NetworkConfig, PPOConfig, RLConfig, TrainingConfig};

// Core exports
pub use core::{normalize_weights, PortfolioState, RewardBreakdown, StateView};

// Environment exports
pub use environment::{GaussianReturns, PortfolioEnvironment, ReturnSource, StepResult, Termination};

// Policy exports
pub use policy::{PolicySource, PolicyValueModel};

// Integration exports
pub use integration::{AllocationAdvice, AllocationRequest};

// Training exports
pub use training::{EpisodeReport, EvaluationSummary, TrainingHistory};
