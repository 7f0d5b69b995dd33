//! Neural Network Architectures
//!
//! Actor-critic network and the trainable policy built on it.

pub mod actor_critic;
pub mod neural_policy;

pub use actor_critic::{ActorCritic, ActorCriticConfig, PolicyOutput};
pub use neural_policy::{learned_policy, InferenceBackend, NeuralPolicy, TrainBackend};
