//! `cleanup`: delete a user's sessions on every deployment, then the deployments.

use std::sync::Arc;

use agent_engine_core::AgentEngine;
use agent_engine_session::{DeploymentDirectory, SessionManager};
use tracing::{info, warn};

use super::Outcome;

/// What a teardown removed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TeardownSummary {
    pub deployments: usize,
    pub sessions_deleted: usize,
    pub deployments_deleted: usize,
}

/// Delete every session of `user_id` on every deployment, then force-delete
/// each deployment whether or not its sessions all went away.
pub async fn run<E>(engine: Arc<E>, user_id: &str) -> Result<TeardownSummary, Outcome>
where
    E: AgentEngine + ?Sized,
{
    let directory = DeploymentDirectory::new(Arc::clone(&engine));
    let manager = SessionManager::new(engine);

    info!("Listing deployments...");
    let deployments = directory.list_deployments().await;
    if deployments.is_empty() {
        warn!("No deployments found. Exiting.");
        return Err(Outcome::NoDeployments);
    }

    let mut summary = TeardownSummary {
        deployments: deployments.len(),
        ..TeardownSummary::default()
    };
    for deployment in deployments {
        let resource_id = deployment.resource_name;

        info!("Cleaning up: Deleting all sessions...");
        summary.sessions_deleted += manager.delete_all_sessions(&resource_id, user_id).await;
        info!("{}", "-".repeat(50));
        info!("All sessions deleted.");

        if directory.delete_deployment(&resource_id, true).await {
            summary.deployments_deleted += 1;
        }
    }
    Ok(summary)
}

pub async fn execute<E>(engine: Arc<E>, user_id: &str) -> Outcome
where
    E: AgentEngine + ?Sized,
{
    match run(engine, user_id).await {
        Ok(summary) => {
            info!(
                "Teardown complete: {} sessions and {}/{} deployments deleted",
                summary.sessions_deleted, summary.deployments_deleted, summary.deployments
            );
            Outcome::Completed
        }
        Err(outcome) => outcome,
    }
}
