use std::path::Path;

use anyhow::Context;
use rebalancer::config::AppConfig;
use rebalancer::rl::{AllocationAdvice, AllocationRequest, TradingAgent};
use tracing::info;

pub(super) struct AdviseArgs<'a> {
    pub weights: &'a [f64],
    pub returns: &'a [f64],
    pub volatilities: &'a [f64],
    pub risk_tolerance: f64,
    pub labels: Option<&'a [String]>,
    pub model: Option<&'a Path>,
    pub json: bool,
}

pub(super) fn run_advise(mut config: AppConfig, args: AdviseArgs<'_>) -> anyhow::Result<()> {
    // The portfolio on the command line decides the asset count
    config.environment.n_assets = args.weights.len();

    let mut agent = TradingAgent::new(config.rl())?;
    if let Some(path) = args.model {
        agent
            .load_model(path)
            .with_context(|| format!("failed to load model {}", path.display()))?;
    }

    let mut request = AllocationRequest::new(
        args.weights.to_vec(),
        args.returns.to_vec(),
        args.volatilities.to_vec(),
        args.risk_tolerance,
    );
    if let Some(labels) = args.labels {
        request = request.with_labels(labels.to_vec());
    }

    info!(n_assets = args.weights.len(), risk_tolerance = args.risk_tolerance, "Advising allocation");
    let advice = agent.optimize_allocation(&request)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&advice)?);
    } else {
        print_advice(&request, &advice);
    }
    Ok(())
}

fn print_advice(request: &AllocationRequest, advice: &AllocationAdvice) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Allocation Advice                              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!(
        "║  Policy:         {:>10}                                  ║",
        advice.policy_source
    );
    println!(
        "║  Confidence:     {:>10.3}                                  ║",
        advice.confidence
    );
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Asset           Current    Suggested     Change             ║");
    for (i, suggested) in advice.suggested_weights.iter().enumerate() {
        let label = request
            .labels
            .as_ref()
            .and_then(|labels| labels.get(i).cloned())
            .unwrap_or_else(|| format!("Asset {}", i));
        println!(
            "║  {:<14} {:>8.4}   {:>9.4}   {:>+8.4}             ║",
            label, request.current_weights[i], suggested, advice.weight_changes[i]
        );
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!("{}", advice.reasoning);
}
