//! Training Infrastructure
//!
//! Trajectory collection, the PPO training loop, evaluation and model files.

pub mod checkpointing;
pub mod collector;
pub mod trainer;

pub use checkpointing::{read_model_header, Checkpointer, ModelHeader};
pub use collector::{collect_rollout, run_greedy_episode, EpisodeOutcome};
pub use trainer::{
    evaluate_policy, summarize_episodes, train_policy, EpisodeReport, EvaluationSummary,
    TrainingHistory,
};
