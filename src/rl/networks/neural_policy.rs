//! Trainable policy backed by the actor-critic network
//!
//! Inference runs on the plain ndarray backend (`valid()` model); updates
//! run on the autodiff backend with Adam and gradient-norm clipping.

use std::path::Path;

use burn::backend::Autodiff;
use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::{ElementConversion, TensorData};
use burn_ndarray::NdArray;
use rand::RngCore;
use tracing::{debug, warn};

use super::actor_critic::{ActorCritic, ActorCriticConfig};
use crate::error::{RebalanceError, Result};
use crate::rl::algorithms::ppo::{
    normalize_advantages, ppo_loss, ratio_diagnostics, PPOBatch, PPOOutput,
};
use crate::rl::config::{NetworkConfig, PPOConfig};
use crate::rl::core::gaussian::{diag_entropy, diag_log_prob, standard_normal};
use crate::rl::core::state::state_dim;
use crate::rl::policy::{ActionEvaluation, ActionSample, PolicySource, PolicyValueModel};
use crate::rl::training::checkpointing::{read_model_file, write_model_file, ModelHeader};

/// CPU backend used for inference
pub type InferenceBackend = NdArray<f32>;
/// Autodiff backend used for PPO updates
pub type TrainBackend = Autodiff<InferenceBackend>;

type Device = <TrainBackend as Backend>::Device;
type ParamRecorder = BinBytesRecorder<FullPrecisionSettings>;

/// Build the learned policy variant with a freshly initialized network
pub fn learned_policy(
    n_assets: usize,
    network: &NetworkConfig,
    ppo: &PPOConfig,
    seed: Option<u64>,
) -> Box<dyn PolicyValueModel> {
    if let Some(seed) = seed {
        <TrainBackend as Backend>::seed(seed);
    }
    let device: Device = Default::default();
    let config = ActorCriticConfig::new(state_dim(n_assets), n_assets)
        .with_hidden_dim(network.hidden_dim)
        .with_initial_std(network.initial_std)
        .with_min_std(network.min_std)
        .with_max_std(network.max_std);
    let model = config.init::<TrainBackend>(&device);
    let optimizer = AdamConfig::new()
        .with_grad_clipping(Some(GradientClippingConfig::Norm(ppo.max_grad_norm)))
        .init::<TrainBackend, ActorCritic<TrainBackend>>();

    Box::new(NeuralPolicy {
        model,
        optimizer,
        config,
        device,
        n_assets,
    })
}

/// Actor-critic network plus its optimizer state
pub struct NeuralPolicy<O> {
    model: ActorCritic<TrainBackend>,
    optimizer: O,
    config: ActorCriticConfig,
    device: Device,
    n_assets: usize,
}

struct Inference {
    mean: Vec<f32>,
    std: Vec<f32>,
    value: f32,
}

impl<O> NeuralPolicy<O> {
    fn header(&self) -> ModelHeader {
        ModelHeader::new(
            self.n_assets,
            self.config.state_dim,
            self.config.action_dim,
            self.config.hidden_dim,
        )
    }

    fn check_state(&self, state: &[f32]) -> Result<()> {
        if state.len() != self.config.state_dim {
            return Err(RebalanceError::dimension(
                "state",
                self.config.state_dim,
                state.len(),
            ));
        }
        if state.iter().any(|x| !x.is_finite()) {
            return Err(RebalanceError::InvalidInput(
                "state contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }

    fn infer(&self, state: &[f32]) -> Result<Inference> {
        self.check_state(state)?;
        let model = self.model.valid();
        let input = Tensor::<InferenceBackend, 2>::from_data(
            TensorData::new(state.to_vec(), [1, state.len()]),
            &self.device,
        );
        let out = model.forward(input);
        let value = tensor_to_vec(out.value)?
            .first()
            .copied()
            .ok_or_else(|| RebalanceError::Training("empty value output".to_string()))?;
        Ok(Inference {
            mean: tensor_to_vec(out.mean)?,
            std: tensor_to_vec(out.std)?,
            value,
        })
    }
}

impl<O> PolicyValueModel for NeuralPolicy<O>
where
    O: Optimizer<ActorCritic<TrainBackend>, TrainBackend>,
{
    fn source(&self) -> PolicySource {
        PolicySource::Learned
    }

    fn state_dim(&self) -> usize {
        self.config.state_dim
    }

    fn action_dim(&self) -> usize {
        self.config.action_dim
    }

    fn sample_action(&self, state: &[f32], rng: &mut dyn RngCore) -> Result<ActionSample> {
        let inference = self.infer(state)?;
        let action: Vec<f32> = inference
            .mean
            .iter()
            .zip(inference.std.iter())
            .map(|(&mu, &sigma)| mu + sigma * standard_normal(&mut *rng) as f32)
            .collect();
        let log_prob = diag_log_prob(&action, &inference.mean, &inference.std);
        Ok(ActionSample {
            action,
            log_prob,
            value: inference.value,
        })
    }

    fn evaluate(&self, state: &[f32], action: &[f32]) -> Result<ActionEvaluation> {
        if action.len() != self.config.action_dim {
            return Err(RebalanceError::dimension(
                "action",
                self.config.action_dim,
                action.len(),
            ));
        }
        let inference = self.infer(state)?;
        Ok(ActionEvaluation {
            log_prob: diag_log_prob(action, &inference.mean, &inference.std),
            value: inference.value,
            entropy: diag_entropy(&inference.std),
        })
    }

    fn mean_action(&self, state: &[f32]) -> Result<Vec<f32>> {
        Ok(self.infer(state)?.mean)
    }

    fn value(&self, state: &[f32]) -> Result<f32> {
        Ok(self.infer(state)?.value)
    }

    fn is_trainable(&self) -> bool {
        true
    }

    fn update(&mut self, batch: &PPOBatch, config: &PPOConfig) -> Result<Option<PPOOutput>> {
        if batch.is_empty() {
            return Ok(None);
        }
        if !batch.is_consistent() {
            return Err(RebalanceError::Training(
                "PPO batch columns have different lengths".to_string(),
            ));
        }

        let mut advantages = batch.advantages.clone();
        normalize_advantages(&mut advantages);

        let states = rows_tensor(&batch.states, self.config.state_dim, &self.device)?;
        let actions = rows_tensor(&batch.actions, self.config.action_dim, &self.device)?;
        let old_log_probs = vector_tensor(&batch.old_log_probs, &self.device);
        let advantages = vector_tensor(&advantages, &self.device);
        let returns = vector_tensor(&batch.returns, &self.device);

        let mut output = PPOOutput::default();
        for epoch in 0..config.n_epochs {
            let out = self.model.forward(states.clone());
            let new_log_probs = out.log_prob(actions.clone());
            let entropy = out.entropy();
            let loss = ppo_loss(
                new_log_probs.clone(),
                out.value,
                entropy,
                old_log_probs.clone(),
                advantages.clone(),
                returns.clone(),
                config,
            );

            let total = scalar(loss.total.clone());
            if !total.is_finite() {
                warn!(epoch, loss = total, "Skipping PPO epoch with non-finite loss");
                continue;
            }

            let new_log_probs = tensor_to_vec(new_log_probs)?;
            let (approx_kl, clip_fraction) =
                ratio_diagnostics(&batch.old_log_probs, &new_log_probs, config.clip_ratio);
            output = PPOOutput {
                policy_loss: scalar(loss.policy_loss),
                value_loss: scalar(loss.value_loss),
                entropy: scalar(loss.entropy),
                approx_kl,
                clip_fraction,
                epochs_applied: output.epochs_applied + 1,
            };

            let grads = loss.total.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);
            self.model = self.optimizer.step(config.lr, self.model.clone(), grads);
        }

        debug!(
            samples = batch.len(),
            policy_loss = output.policy_loss,
            value_loss = output.value_loss,
            approx_kl = output.approx_kl,
            "PPO update"
        );
        Ok(Some(output))
    }

    fn save(&self, path: &Path) -> Result<()> {
        let recorder = ParamRecorder::default();
        let record = <ParamRecorder as Recorder<TrainBackend>>::record(
            &recorder,
            self.model.clone().into_record(),
            (),
        )
        .map_err(|e| RebalanceError::ModelFormat(format!("failed to encode parameters: {:?}", e)))?;
        write_model_file(path, &self.header(), &record)
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let (stored, bytes) = read_model_file(path)?;
        stored.ensure_compatible(&self.header())?;

        let recorder = ParamRecorder::default();
        let record = <ParamRecorder as Recorder<TrainBackend>>::load(&recorder, bytes, &self.device)
            .map_err(|e| {
                RebalanceError::ModelFormat(format!("failed to decode parameters: {:?}", e))
            })?;
        self.model = self.model.clone().load_record(record);
        debug!(path = %path.display(), saved_at = %stored.saved_at, "Loaded model parameters");
        Ok(())
    }
}

fn rows_tensor<B: Backend>(rows: &[Vec<f32>], width: usize, device: &B::Device) -> Result<Tensor<B, 2>> {
    let mut flat = Vec::with_capacity(rows.len() * width);
    for row in rows {
        if row.len() != width {
            return Err(RebalanceError::dimension("batch row", width, row.len()));
        }
        flat.extend_from_slice(row);
    }
    Ok(Tensor::from_data(
        TensorData::new(flat, [rows.len(), width]).convert::<B::FloatElem>(),
        device,
    ))
}

fn vector_tensor<B: Backend>(values: &[f32], device: &B::Device) -> Tensor<B, 1> {
    Tensor::from_data(
        TensorData::new(values.to_vec(), [values.len()]).convert::<B::FloatElem>(),
        device,
    )
}

fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| RebalanceError::Training(format!("tensor readback failed: {:?}", e)))
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().elem::<f32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::core::state::PortfolioState;
    use crate::rl::training::checkpointing::timestamped_name;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::env::temp_dir;

    fn policy(n_assets: usize) -> Box<dyn PolicyValueModel> {
        let network = NetworkConfig {
            hidden_dim: 16,
            ..Default::default()
        };
        learned_policy(n_assets, &network, &PPOConfig::default(), Some(5))
    }

    fn state(n: usize) -> Vec<f32> {
        PortfolioState {
            weights: vec![1.0; n],
            returns: (0..n).map(|i| 0.01 * i as f64).collect(),
            volatilities: vec![0.02; n],
            value_ratio: 1.0,
            days_since_trade: 0,
            trade_available: true,
        }
        .to_vector()
    }

    fn batch(model: &dyn PolicyValueModel, n: usize, steps: usize) -> PPOBatch {
        let mut rng = StdRng::seed_from_u64(9);
        let mut batch = PPOBatch::new();
        for t in 0..steps {
            let s = state(n);
            let sample = model.sample_action(&s, &mut rng).unwrap();
            batch.states.push(s);
            batch.actions.push(sample.action);
            batch.old_log_probs.push(sample.log_prob);
            batch.old_values.push(sample.value);
            batch.advantages.push(if t % 2 == 0 { 1.0 } else { -1.0 });
            batch.returns.push(0.5);
        }
        batch
    }

    #[test]
    fn test_sample_log_prob_matches_evaluate() {
        let model = policy(3);
        let s = state(3);
        let mut rng = StdRng::seed_from_u64(1);
        let sample = model.sample_action(&s, &mut rng).unwrap();
        assert_eq!(sample.action.len(), 3);

        let eval = model.evaluate(&s, &sample.action).unwrap();
        assert!((eval.log_prob - sample.log_prob).abs() < 1e-5);
        assert!((eval.value - sample.value).abs() < 1e-6);
        assert!(eval.entropy.is_finite());
        assert_eq!(model.source(), PolicySource::Learned);
    }

    #[test]
    fn test_mean_action_in_unit_interval_and_deterministic() {
        let model = policy(2);
        let s = state(2);
        let first = model.mean_action(&s).unwrap();
        assert!(first.iter().all(|m| (0.0..=1.0).contains(m)));
        assert_eq!(first, model.mean_action(&s).unwrap());
    }

    #[test]
    fn test_update_reports_finite_diagnostics() {
        let mut model = policy(2);
        let batch = batch(model.as_ref(), 2, 8);
        let output = model.update(&batch, &PPOConfig::default()).unwrap().unwrap();
        assert_eq!(output.epochs_applied, 4);
        assert!(output.policy_loss.is_finite());
        assert!(output.value_loss.is_finite());
        assert!((0.0..=1.0).contains(&output.clip_fraction));
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut model = policy(2);
        assert!(model.update(&PPOBatch::new(), &PPOConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = temp_dir().join(format!("{}.bin", timestamped_name("rebalancer_policy_rt")));
        let saved = policy(2);
        saved.save(&path).unwrap();

        let mut loaded = policy(2);
        let batch = batch(loaded.as_ref(), 2, 4);
        loaded.update(&batch, &PPOConfig::default()).unwrap();
        loaded.load(&path).unwrap();

        let s = state(2);
        let a = saved.mean_action(&s).unwrap();
        let b = loaded.mean_action(&s).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-6);
        }
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_incompatible_load_leaves_parameters() {
        let path = temp_dir().join(format!("{}.bin", timestamped_name("rebalancer_policy_bad")));
        policy(3).save(&path).unwrap();

        let mut model = policy(2);
        let s = state(2);
        let before = model.mean_action(&s).unwrap();
        let err = model.load(&path).unwrap_err();
        assert!(matches!(err, RebalanceError::IncompatibleModel { .. }));
        assert_eq!(before, model.mean_action(&s).unwrap());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_wrong_state_length() {
        let model = policy(2);
        assert!(matches!(
            model.value(&[0.0; 4]).unwrap_err(),
            RebalanceError::DimensionMismatch { .. }
        ));
    }
}
