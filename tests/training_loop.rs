#![cfg(feature = "rl")]

use std::fs;
use std::path::PathBuf;

use rebalancer::rl::training::read_model_header;
use rebalancer::rl::{AllocationRequest, EpisodeReport, RLConfig, TradingAgent};
use rebalancer::RebalanceError;

fn small_config(n_assets: usize) -> RLConfig {
    let mut config = RLConfig::with_assets(n_assets);
    config.environment.horizon = 12;
    config.environment.seed = Some(3);
    config.network.hidden_dim = 8;
    config.ppo.n_epochs = 2;
    config.training.max_steps = 12;
    config.training.report_interval = 2;
    config.training.seed = Some(5);
    config
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rebalancer_{}_{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn history_tracks_every_episode() {
    let mut agent = TradingAgent::new(small_config(3)).unwrap();
    let mut seen = Vec::new();
    let mut observer = |report: &EpisodeReport| seen.push(report.episode);
    let history = agent.train_with_observer(4, None, &mut observer).unwrap();

    assert_eq!(history.len(), 4);
    assert_eq!(history.rewards.len(), 4);
    assert_eq!(history.values.len(), 4);
    assert_eq!(history.lengths, vec![12; 4]);
    assert_eq!(history.updates.len(), 4);
    assert_eq!(seen, vec![0, 1, 2, 3]);
}

#[test]
fn batched_rollouts_share_one_update() {
    let mut config = small_config(2);
    config.training.rollouts_per_update = 2;
    let mut agent = TradingAgent::new(config).unwrap();
    let history = agent.train(5, None).unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history.updates.len(), 3);
}

#[test]
fn saved_model_reproduces_advice() {
    let dir = scratch("roundtrip");
    let path = dir.join("policy.bin");

    let mut trained = TradingAgent::new(small_config(3)).unwrap();
    trained.train(2, Some(&path)).unwrap();

    let header = read_model_header(&path).unwrap();
    assert_eq!(header.n_assets, 3);
    assert_eq!(header.hidden_dim, 8);

    let mut restored = TradingAgent::new(small_config(3)).unwrap();
    restored.load_model(&path).unwrap();

    let request = AllocationRequest::new(
        vec![0.5, 0.3, 0.2],
        vec![0.01, -0.01, 0.02],
        vec![0.1, 0.2, 0.3],
        0.8,
    );
    let expected = trained.optimize_allocation(&request).unwrap();
    let actual = restored.optimize_allocation(&request).unwrap();
    for (a, b) in expected.suggested_weights.iter().zip(&actual.suggested_weights) {
        assert!((a - b).abs() < 1e-6);
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn incompatible_model_is_refused() {
    let dir = scratch("incompatible");
    let path = dir.join("three_assets.bin");

    let agent = TradingAgent::new(small_config(3)).unwrap();
    agent.save_model(&path).unwrap();

    let mut other = TradingAgent::new(small_config(4)).unwrap();
    let err = other.load_model(&path).unwrap_err();
    assert!(matches!(err, RebalanceError::IncompatibleModel { .. }));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn checkpoints_written_at_frequency() {
    let dir = scratch("checkpoints");
    let path = dir.join("policy.bin");

    let mut config = small_config(2);
    config.training.checkpoint_frequency = 2;
    let mut agent = TradingAgent::new(config).unwrap();
    agent.train(4, Some(&path)).unwrap();

    assert!(path.exists());
    assert!(dir.join("policy_ep000002.bin").exists());
    assert!(dir.join("policy_ep000004.bin").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn evaluation_summary_covers_requested_episodes() {
    let agent = TradingAgent::new(small_config(2)).unwrap();
    let (outcomes, summary) = agent.evaluate(3).unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(summary.episodes, 3);
    assert!((summary.avg_length - 12.0).abs() < 1e-12);
}
