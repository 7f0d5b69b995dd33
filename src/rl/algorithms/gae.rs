//! Generalized Advantage Estimation
//!
//! Backward recursion over one rollout with values of length `T + 1`
//! (the trailing entry is the bootstrap value):
//!
//! ```text
//! delta_t = r_t + γ·v_{t+1}·(1 − done_t) − v_t
//! gae_t   = delta_t + γ·λ·(1 − done_t)·gae_{t+1}      (gae_T = 0)
//! return_t = gae_t + v_t
//! ```

use crate::error::{RebalanceError, Result};

/// Advantages and value targets for one rollout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GaeOutput {
    pub advantages: Vec<f32>,
    pub returns: Vec<f32>,
}

/// Compute advantages and returns
///
/// `values` must hold one more entry than `rewards`; `dones` must match
/// `rewards`. Advantages are returned unnormalized.
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    gamma: f32,
    lambda: f32,
) -> Result<GaeOutput> {
    let n = rewards.len();
    if values.len() != n + 1 {
        return Err(RebalanceError::dimension("gae values", n + 1, values.len()));
    }
    if dones.len() != n {
        return Err(RebalanceError::dimension("gae dones", n, dones.len()));
    }

    let mut advantages = vec![0.0f32; n];
    let mut returns = vec![0.0f32; n];
    let mut gae = 0.0f32;

    for t in (0..n).rev() {
        let mask = if dones[t] { 0.0 } else { 1.0 };
        let delta = rewards[t] + gamma * values[t + 1] * mask - values[t];
        gae = delta + gamma * lambda * mask * gae;

        advantages[t] = gae;
        returns[t] = gae + values[t];
    }

    Ok(GaeOutput {
        advantages,
        returns,
    })
}
