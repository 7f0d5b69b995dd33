//! Trajectory Collection
//!
//! Drives an environment with a policy for one episode. The model is only
//! read here; parameters change in the PPO update after collection.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rl::environment::{PortfolioEnvironment, Termination};
use crate::rl::memory::{Rollout, Transition};
use crate::rl::policy::PolicyValueModel;

/// Outcome of one episode, stochastic or greedy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    /// Sum of per-step rewards
    pub total_reward: f64,
    /// Steps taken
    pub length: usize,
    /// Portfolio value at the end
    pub final_value: f64,
    /// Transaction costs paid over the episode
    pub total_costs: f64,
    pub termination: Termination,
}

/// Collect one rollout with sampled actions
///
/// Stops at `done` or after `max_steps`. The final state is evaluated once
/// more for the bootstrap value.
pub fn collect_rollout(
    env: &mut PortfolioEnvironment,
    model: &dyn PolicyValueModel,
    rng: &mut dyn RngCore,
    max_steps: usize,
) -> Result<(Rollout, EpisodeOutcome)> {
    let mut rollout = Rollout::new();
    let mut state = env.reset();
    let mut total_reward = 0.0f64;
    let mut termination = Termination::Running;

    for _ in 0..max_steps {
        let sample = model.sample_action(&state, &mut *rng)?;
        let result = env.step(&sample.action)?;

        total_reward += result.reward;
        termination = result.info.termination;
        rollout.push(
            Transition::new(state, sample.action, result.reward as f32, result.done)
                .with_reward_breakdown(result.info.reward)
                .with_ppo_data(sample.log_prob, sample.value),
        );
        state = result.observation;

        if result.done {
            break;
        }
    }

    rollout.bootstrap_value = model.value(&state)?;
    rollout.final_portfolio_value = env.episode().portfolio_value;

    let outcome = EpisodeOutcome {
        total_reward,
        length: rollout.len(),
        final_value: env.episode().portfolio_value,
        total_costs: env.episode().total_costs,
        termination,
    };
    Ok((rollout, outcome))
}

/// Run one episode with the deterministic (mean) action
pub fn run_greedy_episode(
    env: &mut PortfolioEnvironment,
    model: &dyn PolicyValueModel,
    max_steps: usize,
) -> Result<EpisodeOutcome> {
    let mut state = env.reset();
    let mut total_reward = 0.0f64;
    let mut length = 0;
    let mut termination = Termination::Running;

    for _ in 0..max_steps {
        let action = model.mean_action(&state)?;
        let result = env.step(&action)?;
        total_reward += result.reward;
        length += 1;
        termination = result.info.termination;
        state = result.observation;
        if result.done {
            break;
        }
    }

    Ok(EpisodeOutcome {
        total_reward,
        length,
        final_value: env.episode().portfolio_value,
        total_costs: env.episode().total_costs,
        termination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::config::EnvConfig;
    use crate::rl::environment::MockReturnSource;
    use crate::rl::policy::MomentumPolicy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn env(n: usize, returns: Vec<f64>) -> PortfolioEnvironment {
        let mut source = MockReturnSource::new();
        source.expect_n_assets().return_const(n);
        source.expect_next_returns().returning(move || returns.clone());
        let config = EnvConfig {
            n_assets: n,
            ..Default::default()
        };
        PortfolioEnvironment::with_source(config, Box::new(source)).unwrap()
    }

    #[test]
    fn test_rollout_respects_step_cap() {
        let mut env = env(2, vec![0.001, 0.002]);
        let model = MomentumPolicy::new(2, 0.1);
        let mut rng = StdRng::seed_from_u64(0);
        let (rollout, outcome) = collect_rollout(&mut env, &model, &mut rng, 10).unwrap();
        assert_eq!(rollout.len(), 10);
        assert_eq!(outcome.length, 10);
        assert_eq!(outcome.termination, Termination::Running);
        assert!(!rollout.transitions.iter().any(|t| t.done));
    }

    #[test]
    fn test_rollout_stops_at_done() {
        let mut env = env(1, vec![-0.7]);
        let model = MomentumPolicy::new(1, 0.1);
        let mut rng = StdRng::seed_from_u64(0);
        let (rollout, outcome) = collect_rollout(&mut env, &model, &mut rng, 252).unwrap();
        assert_eq!(rollout.len(), 1);
        assert!(rollout.transitions[0].done);
        assert_eq!(outcome.termination, Termination::Ruin);
        assert!((outcome.final_value - 3_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_greedy_episode_runs_to_horizon() {
        let mut env = env(2, vec![0.0, 0.0]);
        let model = MomentumPolicy::new(2, 0.1);
        let outcome = run_greedy_episode(&mut env, &model, 1_000).unwrap();
        assert_eq!(outcome.length, 252);
        assert_eq!(outcome.termination, Termination::Horizon);
        assert!((outcome.final_value - 10_000.0).abs() < 1e-6);
    }
}
