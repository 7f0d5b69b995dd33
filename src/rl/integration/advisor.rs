//! Allocation Advisor
//!
//! Single-shot inference: build a state from the caller's portfolio view,
//! take the policy's deterministic action, blend it toward equal weights by
//! risk tolerance and explain the largest moves.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RebalanceError, Result};
use crate::rl::config::AdvisorConfig;
use crate::rl::core::action::{normalize_action, normalize_weights, uniform_weights, weight_changes};
use crate::rl::core::state::PortfolioState;
use crate::rl::policy::{PolicySource, PolicyValueModel};

/// Confidence at zero risk tolerance
pub const BASE_CONFIDENCE: f64 = 0.3;
/// Confidence added per unit of risk tolerance
pub const CONFIDENCE_SLOPE: f64 = 0.7;

/// Caller's portfolio view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub current_weights: Vec<f64>,
    pub expected_returns: Vec<f64>,
    pub volatilities: Vec<f64>,
    /// In [0, 1]; 0 keeps equal weights, 1 follows the policy fully
    pub risk_tolerance: f64,
    /// Optional asset names used in the rationale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl AllocationRequest {
    pub fn new(
        current_weights: Vec<f64>,
        expected_returns: Vec<f64>,
        volatilities: Vec<f64>,
        risk_tolerance: f64,
    ) -> Self {
        Self {
            current_weights,
            expected_returns,
            volatilities,
            risk_tolerance,
            labels: None,
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Reject malformed requests; nothing is clamped
    pub fn validate(&self, n_assets: usize) -> Result<()> {
        if self.current_weights.is_empty() {
            return Err(RebalanceError::InvalidInput(
                "current_weights must name at least one asset".to_string(),
            ));
        }
        let columns = [
            ("current_weights", &self.current_weights),
            ("expected_returns", &self.expected_returns),
            ("volatilities", &self.volatilities),
        ];
        for (name, column) in columns {
            if column.len() != n_assets {
                return Err(RebalanceError::dimension(name, n_assets, column.len()));
            }
            if column.iter().any(|x| !x.is_finite()) {
                return Err(RebalanceError::InvalidInput(format!(
                    "{} contains non-finite values",
                    name
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.risk_tolerance) {
            return Err(RebalanceError::RiskToleranceOutOfRange(self.risk_tolerance));
        }
        if let Some(labels) = &self.labels {
            if labels.len() != n_assets {
                return Err(RebalanceError::dimension("labels", n_assets, labels.len()));
            }
        }
        Ok(())
    }

    fn state(&self) -> PortfolioState {
        PortfolioState {
            weights: self.current_weights.clone(),
            returns: self.expected_returns.clone(),
            volatilities: self.volatilities.clone(),
            value_ratio: 1.0,
            days_since_trade: 0,
            trade_available: true,
        }
    }

    fn label(&self, idx: usize) -> String {
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(idx))
            .cloned()
            .unwrap_or_else(|| format!("asset {}", idx))
    }
}

/// Suggested allocation with its explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationAdvice {
    pub suggested_weights: Vec<f64>,
    /// suggested − current, per asset
    pub weight_changes: Vec<f64>,
    pub confidence: f64,
    pub reasoning: String,
    pub policy_source: PolicySource,
}

/// Compute an allocation suggestion
pub fn optimize_allocation(
    model: &dyn PolicyValueModel,
    config: &AdvisorConfig,
    request: &AllocationRequest,
) -> Result<AllocationAdvice> {
    let n_assets = model.action_dim();
    request.validate(n_assets)?;

    let state = request.state().to_vector();
    let policy_weights = normalize_action(&model.mean_action(&state)?);
    if model.source() == PolicySource::Heuristic {
        warn!("No learned policy available; using momentum heuristic");
    }

    let rt = request.risk_tolerance;
    let blended: Vec<f64> = policy_weights
        .iter()
        .zip(uniform_weights(n_assets))
        .map(|(p, u)| rt * p + (1.0 - rt) * u)
        .collect();
    let suggested_weights = normalize_weights(&blended);
    let changes = weight_changes(&request.current_weights, &suggested_weights);
    let reasoning = explain_changes(&changes, config.rationale_threshold, |i| request.label(i));

    debug!(
        risk_tolerance = rt,
        source = %model.source(),
        ?suggested_weights,
        "Allocation computed"
    );

    Ok(AllocationAdvice {
        suggested_weights,
        weight_changes: changes,
        confidence: BASE_CONFIDENCE + CONFIDENCE_SLOPE * rt,
        reasoning,
        policy_source: model.source(),
    })
}

/// Describe the largest increase and the largest decrease beyond `threshold`
pub fn explain_changes(
    changes: &[f64],
    threshold: f64,
    label: impl Fn(usize) -> String,
) -> String {
    let mut parts = Vec::new();

    let largest_increase = changes
        .iter()
        .enumerate()
        .filter(|(_, c)| **c > threshold)
        .max_by(|a, b| a.1.total_cmp(b.1));
    if let Some((idx, change)) = largest_increase {
        parts.push(format!(
            "Increasing allocation to {} by {:.1}% based on positive momentum",
            label(idx),
            change * 100.0
        ));
    }

    let largest_decrease = changes
        .iter()
        .enumerate()
        .filter(|(_, c)| **c < -threshold)
        .min_by(|a, b| a.1.total_cmp(b.1));
    if let Some((idx, change)) = largest_decrease {
        parts.push(format!(
            "Reducing allocation to {} by {:.1}% to manage risk",
            label(idx),
            change.abs() * 100.0
        ));
    }

    if parts.is_empty() {
        parts.push("Maintaining current allocation - no significant rebalancing needed".to_string());
    }
    format!("{}.", parts.join(". "))
}
