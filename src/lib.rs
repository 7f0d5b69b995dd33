pub mod cli;
pub mod config;
pub mod error;
pub mod rl;

pub use config::{AppConfig, LoggingConfig};
pub use error::{RebalanceError, Result};
pub use rl::{
    AllocationAdvice, AllocationRequest, PolicySource, RLConfig, TradingAgent, TrainingHistory,
};
