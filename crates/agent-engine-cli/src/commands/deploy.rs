//! `deploy`: create a deployment from a staged agent package.

use std::sync::Arc;

use agent_engine_core::{AgentEngine, DeploymentSpec, EngineConfig};
use agent_engine_session::DeploymentDirectory;
use anyhow::{Context, Result};
use tracing::warn;

use super::Outcome;
use crate::cli::{DEFAULT_FORWARDED_ENV, DeployArgs};

/// Build the deployment spec, resolving forwarded variables with `lookup`.
pub fn build_spec<F>(config: &EngineConfig, args: &DeployArgs, lookup: F) -> DeploymentSpec
where
    F: Fn(&str) -> Option<String>,
{
    let package_uri = args
        .package_uri
        .clone()
        .unwrap_or_else(|| config.staged_uri("agent_engine/agent_engine.pkl"));

    let mut spec = DeploymentSpec::new(&args.display_name, package_uri);
    spec.description.clone_from(&args.description);
    spec.requirements_uri = Some(
        args.requirements_uri
            .clone()
            .unwrap_or_else(|| config.staged_uri("agent_engine/requirements.txt")),
    );
    spec.dependency_files_uri = Some(
        args.dependencies_uri
            .clone()
            .unwrap_or_else(|| config.staged_uri("agent_engine/dependencies.tar.gz")),
    );
    spec.python_version.clone_from(&args.python_version);
    spec.enable_tracing = !args.no_tracing;

    let missing = if args.env.is_empty() {
        spec.forward_env_from(DEFAULT_FORWARDED_ENV.iter(), &lookup)
    } else {
        spec.forward_env_from(args.env.iter(), &lookup)
    };
    for name in missing {
        warn!("Environment variable {name} is not set; not forwarding it");
    }
    spec
}

pub async fn execute<E>(engine: Arc<E>, config: &EngineConfig, args: &DeployArgs) -> Result<Outcome>
where
    E: AgentEngine + ?Sized,
{
    let spec = build_spec(config, args, |name| std::env::var(name).ok());
    DeploymentDirectory::new(engine)
        .try_create_deployment(&spec)
        .await
        .with_context(|| format!("Failed to deploy {}", spec.display_name))?;
    Ok(Outcome::Completed)
}
