//! Rebalancer CLI
//!
//! Commands:
//! - `rebalancer advise` - Suggest an allocation for a portfolio
//! - `rebalancer train` - Train the allocation policy
//! - `rebalancer evaluate` - Run greedy evaluation episodes
//! - `rebalancer info` - Show a model file's architecture header
//! - `rebalancer config` - Print the effective configuration

pub mod runtime;

pub use runtime::{Cli, Commands};
