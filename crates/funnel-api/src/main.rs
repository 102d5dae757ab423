//! Funnel engine CLI entry point.
//!
//! Binary name: `funnel`
//!
//! Parses CLI arguments, sets up tracing, loads configuration and the
//! executor registry, then dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use funnel_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut tracing_options = TracingOptions::from_verbosity(cli.verbose);
    if cli.quiet && cli.verbose == 0 {
        tracing_options.default_filter = "error".to_string();
    }
    tracing_options.json = cli.log_json;
    tracing_options.enable_otel = cli.otel;
    init_tracing(&tracing_options).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = dispatch(cli).await;
    shutdown_tracing();
    result
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Run(args) => cli::run::run(&state, args, cli.json, cli.quiet).await,
        Commands::Validate { file } => cli::validate::validate(&state, &file, cli.json, cli.quiet),
        Commands::NodeTypes => cli::node_types::list(&state, cli.json),
        Commands::Inspect { id, cache_db } => cli::inspect::inspect(&state, id, cache_db, cli.json).await,
    }
}
