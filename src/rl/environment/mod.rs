//! Simulated Portfolio Environment for RL Training
//!
//! This module provides a gym-like environment over a synthetic
//! return-generating process. Real return feeds plug in through
//! [`ReturnSource`].

mod market;
mod portfolio;

#[cfg(test)]
pub use market::MockReturnSource;
pub use market::{GaussianReturns, ReturnSource};
pub use portfolio::{
    EpisodeState, PortfolioEnvironment, StepInfo, StepResult, Termination, TRADE_THRESHOLD,
    VOL_PROXY_SCALE,
};
