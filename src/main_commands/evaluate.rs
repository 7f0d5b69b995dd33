use std::path::Path;

use anyhow::Context;
use rebalancer::config::AppConfig;
use rebalancer::rl::TradingAgent;

pub(super) fn run_evaluate(
    mut config: AppConfig,
    episodes: usize,
    model: Option<&Path>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    if seed.is_some() {
        config.environment.seed = seed;
    }

    let mut agent = TradingAgent::new(config.rl())?;
    if let Some(path) = model {
        agent
            .load_model(path)
            .with_context(|| format!("failed to load model {}", path.display()))?;
    }

    let (_, summary) = agent.evaluate(episodes)?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Evaluation Results                             ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!(
        "║  Policy:         {:>10}                                  ║",
        agent.policy_source()
    );
    println!(
        "║  Episodes:       {:>6}                                      ║",
        summary.episodes
    );
    println!(
        "║  Avg Reward:     {:>10.4}                                  ║",
        summary.avg_reward
    );
    println!(
        "║  Avg Return:     {:>9.2}%                                  ║",
        summary.avg_total_return * 100.0
    );
    println!(
        "║  Avg Final:      {:>10.2}                                  ║",
        summary.avg_final_value
    );
    println!(
        "║  Avg Costs:      {:>10.4}                                  ║",
        summary.avg_costs
    );
    println!(
        "║  Avg Length:     {:>10.1}                                  ║",
        summary.avg_length
    );
    println!(
        "║  Ruined:         {:>6}                                      ║",
        summary.ruin_count
    );
    println!("╚══════════════════════════════════════════════════════════════╝");
    Ok(())
}
