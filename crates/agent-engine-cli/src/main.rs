//! `agent-engine` command-line entry point.

use std::{process::ExitCode, sync::Arc};

use agent_engine_core::RetryPolicy;
use agent_engine_transport::{HttpClientConfig, RestEngine};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Outcome;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .init();

    let config = cli.engine_config();
    debug!("Using engine at {}", config.parent());

    let mut engine = RestEngine::new(config.clone(), &HttpClientConfig::default())
        .context("Failed to create HTTP client")?;
    if let Some(token) = &cli.access_token {
        engine = engine.with_access_token(token);
    }
    let engine = Arc::new(engine);

    let outcome = match &cli.command {
        Commands::Deploy(args) => commands::deploy::execute(engine, &config, args).await?,
        Commands::List => commands::list::execute(engine).await,
        Commands::RunFlow(args) => commands::run_flow::execute(engine, args).await,
        Commands::Cleanup { user } => commands::cleanup::execute(engine, user).await,
        Commands::Sessions { command } => {
            commands::sessions::execute(engine, command, RetryPolicy::default()).await?;
            Outcome::Completed
        }
        Commands::Send {
            deployment,
            session,
            user,
            message,
        } => {
            commands::send::execute(engine, deployment, user, session, message).await?;
            Outcome::Completed
        }
    };

    Ok(outcome.into())
}
