use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Portfolio rebalancing advisor CLI
#[derive(Parser, Debug)]
#[command(name = "rebalancer")]
#[command(version)]
#[command(
    about = "Portfolio rebalancing advisor driven by a PPO-trained allocation policy",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml and environment overrides
    #[arg(long, global = true, default_value = "config", env = "REBALANCER_CONFIG_DIR")]
    pub config_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Suggest target weights for the given portfolio
    Advise {
        /// Current weights, comma separated
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        weights: Vec<f64>,
        /// Expected returns per asset, comma separated
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        returns: Vec<f64>,
        /// Volatility per asset, comma separated
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        volatilities: Vec<f64>,
        /// Risk tolerance in [0, 1]
        #[arg(long, allow_hyphen_values = true)]
        risk_tolerance: f64,
        /// Asset labels used in the rationale, comma separated
        #[arg(long, value_delimiter = ',')]
        labels: Option<Vec<String>>,
        /// Trained model file
        #[arg(long)]
        model: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Train the allocation policy with PPO
    Train {
        /// Number of episodes (default: training.episodes)
        #[arg(short, long)]
        episodes: Option<usize>,
        /// Where to save the trained model
        #[arg(short, long)]
        save: Option<PathBuf>,
        /// Continue from an existing model file
        #[arg(long)]
        resume: Option<PathBuf>,
        /// Seed for the simulator and action sampling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Evaluate the greedy policy on simulated episodes
    Evaluate {
        /// Number of episodes
        #[arg(short, long, default_value = "10")]
        episodes: usize,
        /// Trained model file (heuristic or untrained policy if omitted)
        #[arg(long)]
        model: Option<PathBuf>,
        /// Seed for the simulator
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the architecture header of a model file
    Info {
        /// Model file
        #[arg(long)]
        model: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_advise_with_negative_returns() {
        let cli = Cli::try_parse_from([
            "rebalancer",
            "advise",
            "--weights",
            "0.5,0.5",
            "--returns",
            "-0.01,0.02",
            "--volatilities",
            "0.1,0.2",
            "--risk-tolerance",
            "0.7",
        ])
        .unwrap();
        match cli.command {
            Commands::Advise {
                returns,
                risk_tolerance,
                json,
                ..
            } => {
                assert_eq!(returns, vec![-0.01, 0.02]);
                assert_eq!(risk_tolerance, 0.7);
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.config_dir, PathBuf::from("config"));
    }

    #[test]
    fn test_parse_train() {
        let cli = Cli::try_parse_from([
            "rebalancer",
            "--config-dir",
            "conf",
            "train",
            "--episodes",
            "50",
            "--save",
            "models/ppo.bin",
        ])
        .unwrap();
        assert_eq!(cli.config_dir, PathBuf::from("conf"));
        assert!(matches!(
            cli.command,
            Commands::Train {
                episodes: Some(50),
                ..
            }
        ));
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
