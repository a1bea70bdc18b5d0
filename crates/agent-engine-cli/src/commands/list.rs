//! `list`: print the deployments of the configured project.

use std::sync::Arc;

use agent_engine_core::AgentEngine;
use agent_engine_session::DeploymentDirectory;
use tracing::info;

use super::Outcome;

pub async fn execute<E>(engine: Arc<E>) -> Outcome
where
    E: AgentEngine + ?Sized,
{
    info!("Listing deployments...");
    let deployments = DeploymentDirectory::new(engine).list_deployments().await;
    if deployments.is_empty() {
        return Outcome::NoDeployments;
    }
    Outcome::Completed
}
