//! Actor-Critic Network
//!
//! Shared two-layer ReLU trunk with a sigmoid mean head, a learnable
//! state-independent action spread and a linear value head.

use burn::module::Param;
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

use crate::rl::core::gaussian::LN_2PI;

/// Actor-critic network configuration
#[derive(Config, Debug)]
pub struct ActorCriticConfig {
    /// State vector length
    pub state_dim: usize,
    /// Action vector length
    pub action_dim: usize,
    /// Hidden dimension of the shared trunk
    #[config(default = "128")]
    pub hidden_dim: usize,
    /// Initial action spread
    #[config(default = "0.5")]
    pub initial_std: f32,
    #[config(default = "0.01")]
    pub min_std: f32,
    #[config(default = "1.0")]
    pub max_std: f32,
}

/// Gaussian actor with a value head on a shared trunk
#[derive(Module, Debug)]
pub struct ActorCritic<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    mean_head: Linear<B>,
    value_head: Linear<B>,
    std: Param<Tensor<B, 1>>,
    activation: Relu,
    min_std: f32,
    max_std: f32,
}

impl ActorCriticConfig {
    /// Initialize the network
    pub fn init<B: Backend>(&self, device: &B::Device) -> ActorCritic<B> {
        ActorCritic {
            fc1: LinearConfig::new(self.state_dim, self.hidden_dim).init(device),
            fc2: LinearConfig::new(self.hidden_dim, self.hidden_dim).init(device),
            mean_head: LinearConfig::new(self.hidden_dim, self.action_dim).init(device),
            value_head: LinearConfig::new(self.hidden_dim, 1).init(device),
            std: Param::from_tensor(Tensor::full([self.action_dim], self.initial_std, device)),
            activation: Relu::new(),
            min_std: self.min_std,
            max_std: self.max_std,
        }
    }
}

/// Distribution parameters and value for a batch of states
#[derive(Debug, Clone)]
pub struct PolicyOutput<B: Backend> {
    /// Action means in [0, 1], [batch, action_dim]
    pub mean: Tensor<B, 2>,
    /// Clamped spread, [1, action_dim]
    pub std: Tensor<B, 2>,
    /// State values, [batch]
    pub value: Tensor<B, 1>,
}

impl<B: Backend> ActorCritic<B> {
    /// Forward pass for a batch of states [batch, state_dim]
    pub fn forward(&self, state: Tensor<B, 2>) -> PolicyOutput<B> {
        let hidden = self.activation.forward(self.fc1.forward(state));
        let hidden = self.activation.forward(self.fc2.forward(hidden));

        let mean = sigmoid(self.mean_head.forward(hidden.clone()));
        let std = self
            .std
            .val()
            .clamp(self.min_std, self.max_std)
            .unsqueeze::<2>();
        let value = self.value_head.forward(hidden).squeeze::<1>(1);

        PolicyOutput { mean, std, value }
    }
}

impl<B: Backend> PolicyOutput<B> {
    /// Diagonal Gaussian log-density of `actions`, summed over assets: [batch]
    pub fn log_prob(&self, actions: Tensor<B, 2>) -> Tensor<B, 1> {
        let z = (actions - self.mean.clone()) / self.std.clone();
        let log_density = (z.powf_scalar(2.0).mul_scalar(-0.5) - self.std.clone().log())
            .sub_scalar(0.5 * LN_2PI as f32);
        log_density.sum_dim(1).squeeze::<1>(1)
    }

    /// Entropy of the (state-independent) distribution: [1]
    pub fn entropy(&self) -> Tensor<B, 1> {
        let per_dim = self.std.clone().log().add_scalar(0.5 + 0.5 * LN_2PI as f32);
        per_dim.sum_dim(1).reshape([1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{ElementConversion, TensorData};
    use burn_ndarray::NdArray;

    use crate::rl::core::gaussian::{diag_entropy, diag_log_prob};

    type TestBackend = NdArray<f32>;

    fn network() -> ActorCritic<TestBackend> {
        ActorCriticConfig::new(9, 2).with_hidden_dim(16).init(&Default::default())
    }

    fn states(batch: usize) -> Tensor<TestBackend, 2> {
        let data: Vec<f32> = (0..batch * 9).map(|i| (i % 5) as f32 * 0.1).collect();
        Tensor::from_data(TensorData::new(data, [batch, 9]), &Default::default())
    }

    fn to_vec<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_forward_shapes_and_ranges() {
        let out = network().forward(states(3));
        assert_eq!(out.mean.dims(), [3, 2]);
        assert_eq!(out.std.dims(), [1, 2]);
        assert_eq!(out.value.dims(), [3]);

        assert!(to_vec(out.mean).iter().all(|m| (0.0..=1.0).contains(m)));
        assert!(to_vec(out.std).iter().all(|s| (*s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_std_is_clamped() {
        let model = ActorCriticConfig::new(9, 2)
            .with_hidden_dim(8)
            .with_initial_std(5.0)
            .init::<TestBackend>(&Default::default());
        let out = model.forward(states(1));
        assert!(to_vec(out.std).iter().all(|s| (*s - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_log_prob_matches_closed_form() {
        let out = network().forward(states(1));
        let mean = to_vec(out.mean.clone());
        let std = to_vec(out.std.clone());
        let action = vec![0.3f32, 0.9];
        let actions = Tensor::from_data(TensorData::new(action.clone(), [1, 2]), &Default::default());

        let lp = out.log_prob(actions).into_scalar().elem::<f32>();
        assert!((lp - diag_log_prob(&action, &mean, &std)).abs() < 1e-4);

        let entropy = out.entropy().into_scalar().elem::<f32>();
        assert!((entropy - diag_entropy(&std)).abs() < 1e-4);
    }
}
