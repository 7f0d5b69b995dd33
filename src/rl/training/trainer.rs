//! Training Loop
//!
//! Collect rollouts on independent environments, merge them, run GAE and one
//! PPO update per merge. Progress is reported through `tracing` and an
//! optional caller-supplied observer.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::checkpointing::Checkpointer;
use super::collector::{collect_rollout, run_greedy_episode, EpisodeOutcome};
use crate::error::Result;
use crate::rl::algorithms::ppo::PPOOutput;
use crate::rl::config::RLConfig;
use crate::rl::environment::{PortfolioEnvironment, Termination};
use crate::rl::memory::merge_rollouts;
use crate::rl::policy::PolicyValueModel;

/// Per-episode training record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Total reward per episode
    pub rewards: Vec<f64>,
    /// Bootstrap value of the final state per episode
    pub values: Vec<f32>,
    /// Steps per episode
    pub lengths: Vec<usize>,
    /// Portfolio value at episode end
    pub final_values: Vec<f64>,
    /// Diagnostics of each PPO update
    pub updates: Vec<PPOOutput>,
}

impl TrainingHistory {
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Mean reward over the last `window` episodes
    pub fn moving_average(&self, window: usize) -> f64 {
        let window = window.max(1).min(self.rewards.len());
        if window == 0 {
            return 0.0;
        }
        let recent = &self.rewards[self.rewards.len() - window..];
        recent.iter().sum::<f64>() / window as f64
    }

    fn record(&mut self, outcome: &EpisodeOutcome, bootstrap_value: f32) {
        self.rewards.push(outcome.total_reward);
        self.values.push(bootstrap_value);
        self.lengths.push(outcome.length);
        self.final_values.push(outcome.final_value);
    }
}

/// What the observer sees after every episode
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeReport {
    /// Zero-based episode index
    pub episode: usize,
    pub outcome: EpisodeOutcome,
    pub bootstrap_value: f32,
    /// Mean reward over the last `report_interval` episodes
    pub moving_average: f64,
}

/// Train `model` for `n_episodes`
///
/// A model that cannot be trained is left untouched and an empty history is
/// returned. When `save_path` is given the model is written there at the end
/// and, if `checkpoint_frequency > 0`, checkpoints are written alongside it.
pub fn train_policy(
    model: &mut dyn PolicyValueModel,
    config: &RLConfig,
    n_episodes: usize,
    save_path: Option<&Path>,
    mut observer: Option<&mut dyn FnMut(&EpisodeReport)>,
) -> Result<TrainingHistory> {
    let mut history = TrainingHistory::default();
    if !model.is_trainable() {
        warn!(
            source = %model.source(),
            "No trainable policy available; training skipped"
        );
        return Ok(history);
    }

    let training = &config.training;
    let per_update = training.rollouts_per_update.max(1);
    let report_interval = training.report_interval.max(1);

    let mut envs = (0..per_update)
        .map(|i| {
            let mut env_config = config.environment.clone();
            env_config.seed = env_config.seed.map(|s| s.wrapping_add(i as u64));
            PortfolioEnvironment::new(env_config)
        })
        .collect::<Result<Vec<_>>>()?;
    let mut rng = match training.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let checkpointer = save_path
        .filter(|_| training.checkpoint_frequency > 0)
        .map(Checkpointer::for_save_path);

    info!(
        episodes = n_episodes,
        rollouts_per_update = per_update,
        n_assets = config.environment.n_assets,
        "Starting PPO training"
    );

    let mut episode = 0;
    while episode < n_episodes {
        let count = per_update.min(n_episodes - episode);
        let mut rollouts = Vec::with_capacity(count);

        for env in envs.iter_mut().take(count) {
            let (rollout, outcome) =
                collect_rollout(env, &*model, &mut rng, training.max_steps)?;
            history.record(&outcome, rollout.bootstrap_value);

            let report = EpisodeReport {
                episode,
                outcome,
                bootstrap_value: rollout.bootstrap_value,
                moving_average: history.moving_average(report_interval),
            };
            debug!(
                episode,
                reward = report.outcome.total_reward,
                length = report.outcome.length,
                final_value = report.outcome.final_value,
                "Episode finished"
            );
            if episode % report_interval == 0 {
                info!(
                    "Episode {}/{}: avg reward (last {})={:.4}, final value={:.2}",
                    episode,
                    n_episodes,
                    report_interval,
                    report.moving_average,
                    report.outcome.final_value
                );
            }
            if let Some(observer) = observer.as_deref_mut() {
                observer(&report);
            }

            rollouts.push(rollout);
            episode += 1;
        }

        let batch = merge_rollouts(rollouts, config.ppo.gamma, config.ppo.gae_lambda)?;
        if let Some(output) = model.update(&batch, &config.ppo)? {
            if output.epochs_applied == 0 {
                warn!(episode, "PPO update skipped: every epoch had a non-finite loss");
            }
            history.updates.push(output);
        }

        if let Some(checkpointer) = &checkpointer {
            let freq = training.checkpoint_frequency;
            if episode / freq > (episode - count) / freq {
                model.save(&checkpointer.episode_path(episode))?;
            }
        }
    }

    if let Some(path) = save_path {
        model.save(path)?;
    }

    info!(
        episodes = history.len(),
        updates = history.updates.len(),
        avg_reward = history.moving_average(report_interval),
        "Training complete"
    );
    Ok(history)
}

/// Aggregate statistics over evaluation episodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub episodes: usize,
    pub avg_reward: f64,
    pub avg_final_value: f64,
    /// Mean of final_value / initial_capital − 1
    pub avg_total_return: f64,
    pub avg_costs: f64,
    pub avg_length: f64,
    /// Episodes that ended in ruin
    pub ruin_count: usize,
}

/// Summarize episode outcomes
pub fn summarize_episodes(outcomes: &[EpisodeOutcome], initial_capital: f64) -> EvaluationSummary {
    if outcomes.is_empty() {
        return EvaluationSummary::default();
    }
    let mean = |f: fn(&EpisodeOutcome) -> f64| mean_of(outcomes, f);

    EvaluationSummary {
        episodes: outcomes.len(),
        avg_reward: mean(|o| o.total_reward),
        avg_final_value: mean(|o| o.final_value),
        avg_total_return: if initial_capital > 0.0 {
            mean_of(outcomes, |o| o.final_value / initial_capital - 1.0)
        } else {
            0.0
        },
        avg_costs: mean(|o| o.total_costs),
        avg_length: mean(|o| o.length as f64),
        ruin_count: outcomes
            .iter()
            .filter(|o| o.termination == Termination::Ruin)
            .count(),
    }
}

fn mean_of(outcomes: &[EpisodeOutcome], f: impl Fn(&EpisodeOutcome) -> f64) -> f64 {
    outcomes.iter().map(f).sum::<f64>() / outcomes.len() as f64
}

/// Run greedy episodes and summarize them
pub fn evaluate_policy(
    model: &dyn PolicyValueModel,
    config: &RLConfig,
    n_episodes: usize,
) -> Result<(Vec<EpisodeOutcome>, EvaluationSummary)> {
    let mut env = PortfolioEnvironment::new(config.environment.clone())?;
    let outcomes = (0..n_episodes)
        .map(|_| run_greedy_episode(&mut env, model, config.training.max_steps))
        .collect::<Result<Vec<_>>>()?;
    let summary = summarize_episodes(&outcomes, config.environment.initial_capital);
    info!(
        episodes = summary.episodes,
        avg_reward = summary.avg_reward,
        avg_total_return = summary.avg_total_return,
        ruin_count = summary.ruin_count,
        source = %model.source(),
        "Evaluation complete"
    );
    Ok((outcomes, summary))
}
