use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Parse CLI arguments first to get verbosity level
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let runtime = tokio::runtime::Runtime::new()?;
    let config = cli.config;

    match cli.command {
        Commands::Watch(args) => {
            debug!("Watch command: {:?}", args);
            runtime.block_on(cli::commands::watch::execute(args, config))?;
        }
        Commands::Scan(args) => {
            debug!("Scan command: {:?}", args);
            runtime.block_on(cli::commands::scan::execute(args, config))?;
        }
        Commands::Deploy(args) => {
            debug!("Deploy command: {:?}", args);
            runtime.block_on(cli::commands::deploy::deploy(args, config))?;
        }
        Commands::Undeploy(args) => {
            debug!("Undeploy command: {:?}", args);
            runtime.block_on(cli::commands::deploy::undeploy(args, config))?;
        }
    }

    Ok(())
}
