//! Trading Agent
//!
//! Owns the policy-value model (the only persistent mutable state) and
//! exposes training, evaluation, persistence and allocation advice. The
//! model variant is chosen once, here. A learned model serves inference only
//! after it has been trained or loaded; until then the momentum heuristic
//! answers.

use std::path::Path;

use tracing::info;

use crate::error::{RebalanceError, Result};
use crate::rl::config::RLConfig;
use crate::rl::integration::advisor::{self, AllocationAdvice, AllocationRequest};
use crate::rl::policy::{MomentumPolicy, PolicySource, PolicyValueModel};
use crate::rl::training::collector::EpisodeOutcome;
use crate::rl::training::trainer::{
    evaluate_policy, train_policy, EpisodeReport, EvaluationSummary, TrainingHistory,
};

/// Whether this build carries the tensor backend
pub const LEARNED_POLICY_AVAILABLE: bool = cfg!(feature = "rl");

pub struct TradingAgent {
    config: RLConfig,
    model: Box<dyn PolicyValueModel>,
    fallback: MomentumPolicy,
    trained: bool,
}

impl TradingAgent {
    /// Validate `config` and construct the model variant
    pub fn new(config: RLConfig) -> Result<Self> {
        config.validate()?;
        let model = build_model(&config);
        info!(
            source = %model.source(),
            n_assets = config.environment.n_assets,
            "Trading agent initialized"
        );
        Ok(Self {
            fallback: heuristic(&config),
            config,
            model,
            trained: false,
        })
    }

    /// Wrap an externally constructed model, treated as ready for inference
    pub fn with_model(config: RLConfig, model: Box<dyn PolicyValueModel>) -> Result<Self> {
        config.validate()?;
        let n_assets = config.environment.n_assets;
        if model.action_dim() != n_assets {
            return Err(RebalanceError::dimension("model action_dim", n_assets, model.action_dim()));
        }
        if model.state_dim() != config.environment.state_dim() {
            return Err(RebalanceError::dimension(
                "model state_dim",
                config.environment.state_dim(),
                model.state_dim(),
            ));
        }
        Ok(Self {
            fallback: heuristic(&config),
            config,
            model,
            trained: true,
        })
    }

    pub fn config(&self) -> &RLConfig {
        &self.config
    }

    pub fn n_assets(&self) -> usize {
        self.config.environment.n_assets
    }

    /// Source of the policy that currently answers inference requests
    pub fn policy_source(&self) -> PolicySource {
        self.active_model().source()
    }

    /// Whether the owned model has been trained or loaded
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// The owned model, trained or not
    pub fn model(&self) -> &dyn PolicyValueModel {
        self.model.as_ref()
    }

    fn active_model(&self) -> &dyn PolicyValueModel {
        if self.trained || !self.model.is_trainable() {
            self.model.as_ref()
        } else {
            &self.fallback
        }
    }

    /// Train for `n_episodes`, saving to `save_path` at the end if given
    pub fn train(&mut self, n_episodes: usize, save_path: Option<&Path>) -> Result<TrainingHistory> {
        let history = train_policy(self.model.as_mut(), &self.config, n_episodes, save_path, None)?;
        self.trained |= !history.is_empty();
        Ok(history)
    }

    /// Like [`train`](Self::train), reporting every episode to `observer`
    pub fn train_with_observer(
        &mut self,
        n_episodes: usize,
        save_path: Option<&Path>,
        observer: &mut dyn FnMut(&EpisodeReport),
    ) -> Result<TrainingHistory> {
        let history = train_policy(
            self.model.as_mut(),
            &self.config,
            n_episodes,
            save_path,
            Some(observer),
        )?;
        self.trained |= !history.is_empty();
        Ok(history)
    }

    /// Greedy evaluation episodes
    pub fn evaluate(&self, n_episodes: usize) -> Result<(Vec<EpisodeOutcome>, EvaluationSummary)> {
        evaluate_policy(self.active_model(), &self.config, n_episodes)
    }

    pub fn save_model(&self, path: &Path) -> Result<()> {
        self.model.save(path)
    }

    pub fn load_model(&mut self, path: &Path) -> Result<()> {
        self.model.load(path)?;
        self.trained = true;
        info!(path = %path.display(), "Model loaded");
        Ok(())
    }

    /// Allocation suggestion for the caller's current portfolio
    pub fn optimize_allocation(&self, request: &AllocationRequest) -> Result<AllocationAdvice> {
        advisor::optimize_allocation(self.active_model(), &self.config.advisor, request)
    }
}

fn heuristic(config: &RLConfig) -> MomentumPolicy {
    MomentumPolicy::new(config.environment.n_assets, config.advisor.momentum_step)
}

#[cfg(feature = "rl")]
fn build_model(config: &RLConfig) -> Box<dyn PolicyValueModel> {
    if !config.network.use_learned_policy {
        return Box::new(heuristic(config));
    }
    crate::rl::networks::learned_policy(
        config.environment.n_assets,
        &config.network,
        &config.ppo,
        config.training.seed,
    )
}

#[cfg(not(feature = "rl"))]
fn build_model(config: &RLConfig) -> Box<dyn PolicyValueModel> {
    if config.network.use_learned_policy {
        tracing::warn!("Built without the `rl` feature; falling back to the momentum heuristic");
    }
    Box::new(heuristic(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected() {
        assert!(TradingAgent::new(RLConfig::with_assets(0)).is_err());
    }

    #[test]
    fn test_heuristic_when_disabled() {
        let mut config = RLConfig::with_assets(3);
        config.network.use_learned_policy = false;
        let mut agent = TradingAgent::new(config).unwrap();
        assert_eq!(agent.policy_source(), PolicySource::Heuristic);

        let history = agent.train(3, None).unwrap();
        assert!(history.is_empty());
        assert!(agent.save_model(Path::new("never-written.bin")).is_err());
    }

    #[test]
    fn test_with_model_checks_dimensions() {
        let config = RLConfig::with_assets(3);
        let model = Box::new(MomentumPolicy::new(2, 0.1));
        assert!(TradingAgent::with_model(config, model).is_err());
    }

    #[test]
    fn test_untrained_agent_advises_with_heuristic() {
        let agent = TradingAgent::new(RLConfig::with_assets(2)).unwrap();
        assert!(!agent.is_trained());
        assert_eq!(agent.policy_source(), PolicySource::Heuristic);

        let request = AllocationRequest::new(vec![0.5, 0.5], vec![0.0, 0.2], vec![0.01, 0.05], 1.0);
        let advice = agent.optimize_allocation(&request).unwrap();
        assert_eq!(advice.policy_source, PolicySource::Heuristic);
        assert!(advice.suggested_weights[1] > 0.5);
        assert!(advice.weight_changes[1] > 0.0);
    }

    #[test]
    fn test_training_switches_to_learned_policy() {
        let mut config = RLConfig::with_assets(2);
        config.environment.horizon = 4;
        config.network.hidden_dim = 8;
        config.training.max_steps = 4;
        config.training.seed = Some(1);
        let mut agent = TradingAgent::new(config).unwrap();
        agent.train(1, None).unwrap();

        let expected = if LEARNED_POLICY_AVAILABLE {
            PolicySource::Learned
        } else {
            PolicySource::Heuristic
        };
        assert_eq!(agent.is_trained(), LEARNED_POLICY_AVAILABLE);
        assert_eq!(agent.policy_source(), expected);
    }
}
