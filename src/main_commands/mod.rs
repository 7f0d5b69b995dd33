use rebalancer::cli::Commands;
use rebalancer::config::AppConfig;

mod advise;
mod evaluate;
mod info;
mod train;

/// Dispatch a parsed subcommand
pub(crate) fn run(command: &Commands, config: AppConfig) -> anyhow::Result<()> {
    match command {
        Commands::Advise {
            weights,
            returns,
            volatilities,
            risk_tolerance,
            labels,
            model,
            json,
        } => advise::run_advise(
            config,
            advise::AdviseArgs {
                weights,
                returns,
                volatilities,
                risk_tolerance: *risk_tolerance,
                labels: labels.as_deref(),
                model: model.as_deref(),
                json: *json,
            },
        ),
        Commands::Train {
            episodes,
            save,
            resume,
            seed,
        } => train::run_train(config, *episodes, save.as_deref(), resume.as_deref(), *seed),
        Commands::Evaluate {
            episodes,
            model,
            seed,
        } => evaluate::run_evaluate(config, *episodes, model.as_deref(), *seed),
        Commands::Info { model } => info::run_info(model),
        Commands::Config => info::print_config(&config),
    }
}
