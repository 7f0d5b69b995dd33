use std::path::Path;

use anyhow::Context;
use rebalancer::config::AppConfig;
use rebalancer::rl::{EpisodeReport, TradingAgent};
use tracing::info;

pub(super) fn run_train(
    mut config: AppConfig,
    episodes: Option<usize>,
    save: Option<&Path>,
    resume: Option<&Path>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    if let Some(seed) = seed {
        config.training.seed = Some(seed);
        config.environment.seed = Some(seed);
    }
    let episodes = episodes.unwrap_or(config.training.episodes);

    info!("Starting PPO training");
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Rebalancer Training                            ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!(
        "║  Episodes:       {:>6}                                      ║",
        episodes
    );
    println!(
        "║  Assets:         {:>6}                                      ║",
        config.environment.n_assets
    );
    println!(
        "║  Learning Rate:  {:>10.6}                                  ║",
        config.ppo.lr
    );
    println!(
        "║  Rollouts/Upd:   {:>6}                                      ║",
        config.training.rollouts_per_update
    );
    if let Some(path) = save {
        println!("║  Save To:        {}", path.display());
    }
    println!("╚══════════════════════════════════════════════════════════════╝");

    let mut agent = TradingAgent::new(config.rl())?;
    if let Some(path) = resume {
        agent
            .load_model(path)
            .with_context(|| format!("failed to resume from {}", path.display()))?;
        println!("Resumed from: {}", path.display());
    }

    let mut best: Option<(usize, f64)> = None;
    let mut observer = |report: &EpisodeReport| {
        let reward = report.outcome.total_reward;
        if best.map_or(true, |(_, b)| reward > b) {
            best = Some((report.episode, reward));
        }
    };
    let history = agent.train_with_observer(episodes, save, &mut observer)?;

    if history.is_empty() {
        println!(
            "\nPolicy source is {}; nothing was trained.",
            agent.policy_source()
        );
        return Ok(());
    }

    let final_value = history.final_values.last().copied().unwrap_or_default();
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║               Training Complete                              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!(
        "║  Episodes:       {:>6}                                      ║",
        history.len()
    );
    println!(
        "║  Updates:        {:>6}                                      ║",
        history.updates.len()
    );
    println!(
        "║  Avg Reward(100):{:>10.4}                                  ║",
        history.moving_average(100)
    );
    if let Some((episode, reward)) = best {
        println!(
            "║  Best Reward:    {:>10.4} (episode {:>6})                 ║",
            reward, episode
        );
    }
    println!(
        "║  Final Value:    {:>10.2}                                  ║",
        final_value
    );
    println!("╚══════════════════════════════════════════════════════════════╝");
    if let Some(path) = save {
        println!("Model saved: {}", path.display());
    }
    Ok(())
}
