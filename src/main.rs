use anyhow::Context;
use clap::Parser;
use rebalancer::cli::Cli;
use rebalancer::config::AppConfig;

mod main_commands;
mod main_runtime;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir).with_context(|| {
        format!("failed to load configuration from {}", cli.config_dir.display())
    })?;
    config.validate().context("invalid configuration")?;

    let _log_guard = main_runtime::init_logging(&config.logging);

    main_commands::run(&cli.command, config)
}
