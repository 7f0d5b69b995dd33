//! State Representation
//!
//! The observation handed to the policy is a flat vector of length
//! `3·n_assets + 3`:
//!
//! | segment            | length   |
//! |--------------------|----------|
//! | weights            | n_assets |
//! | returns            | n_assets |
//! | volatility proxies | n_assets |
//! | value / capital    | 1        |
//! | days since trade   | 1        |
//! | trade budget flag  | 1        |

use serde::{Deserialize, Serialize};

use super::action::normalize_weights;

/// Days-since-trade is divided by this before entering the state
pub const DAYS_SINCE_TRADE_SCALE: f64 = 30.0;

/// Number of scalar features after the per-asset blocks
pub const SCALAR_FEATURES: usize = 3;

/// State vector length for a portfolio of `n_assets`
pub fn state_dim(n_assets: usize) -> usize {
    3 * n_assets + SCALAR_FEATURES
}

/// Structured observation before flattening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    /// Current weights (normalized when flattened)
    pub weights: Vec<f64>,
    /// Per-asset returns
    pub returns: Vec<f64>,
    /// Per-asset volatility proxies
    pub volatilities: Vec<f64>,
    /// Portfolio value divided by initial capital
    pub value_ratio: f64,
    /// Days since the last material reallocation
    pub days_since_trade: u32,
    /// Whether the trade budget still allows trading
    pub trade_available: bool,
}

impl PortfolioState {
    /// Number of assets described by this state
    pub fn n_assets(&self) -> usize {
        self.weights.len()
    }

    /// Flatten into the policy input vector
    ///
    /// The weights block is always normalized here so that it is
    /// non-negative and sums to one regardless of what the caller supplied.
    pub fn to_vector(&self) -> Vec<f32> {
        let n = self.n_assets();
        let mut state = Vec::with_capacity(state_dim(n));

        state.extend(normalize_weights(&self.weights).into_iter().map(|w| w as f32));
        state.extend(self.returns.iter().map(|&r| finite_or_zero(r) as f32));
        state.extend(self.volatilities.iter().map(|&v| finite_or_zero(v) as f32));
        state.push(finite_or_zero(self.value_ratio) as f32);
        state.push((self.days_since_trade as f64 / DAYS_SINCE_TRADE_SCALE) as f32);
        state.push(if self.trade_available { 1.0 } else { 0.0 });

        state
    }
}

/// Read-only accessors over a flat state vector
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    state: &'a [f32],
    n_assets: usize,
}

impl<'a> StateView<'a> {
    /// Wrap a state vector; `None` if its length does not fit the layout
    pub fn new(state: &'a [f32]) -> Option<Self> {
        if state.len() < SCALAR_FEATURES || (state.len() - SCALAR_FEATURES) % 3 != 0 {
            return None;
        }
        let n_assets = (state.len() - SCALAR_FEATURES) / 3;
        if n_assets == 0 {
            return None;
        }
        Some(Self { state, n_assets })
    }

    pub fn n_assets(&self) -> usize {
        self.n_assets
    }

    pub fn weights(&self) -> &'a [f32] {
        &self.state[..self.n_assets]
    }

    pub fn returns(&self) -> &'a [f32] {
        &self.state[self.n_assets..2 * self.n_assets]
    }

    pub fn volatilities(&self) -> &'a [f32] {
        &self.state[2 * self.n_assets..3 * self.n_assets]
    }

    pub fn value_ratio(&self) -> f32 {
        self.state[3 * self.n_assets]
    }

    pub fn days_since_trade(&self) -> f32 {
        self.state[3 * self.n_assets + 1]
    }

    pub fn trade_available(&self) -> bool {
        self.state[3 * self.n_assets + 2] > 0.5
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}
