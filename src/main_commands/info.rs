use std::path::Path;

use rebalancer::config::AppConfig;
use rebalancer::rl::training::read_model_header;

pub(super) fn run_info(model: &Path) -> anyhow::Result<()> {
    let header = read_model_header(model)?;
    println!("Model:          {}", model.display());
    println!("Format version: {}", header.format_version);
    println!("Architecture:   {}", header.architecture());
    println!("Saved at:       {}", header.saved_at.to_rfc3339());
    Ok(())
}

pub(super) fn print_config(config: &AppConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
