//! Deployment directory.

use std::sync::Arc;

use agent_engine_core::{AgentEngine, Deployment, DeploymentSpec, EngineError};
use tracing::{error, info};

/// Enumerates and manages remote deployments.
pub struct DeploymentDirectory<E>
where
    E: AgentEngine + ?Sized,
{
    engine: Arc<E>,
}

impl<E> DeploymentDirectory<E>
where
    E: AgentEngine + ?Sized,
{
    #[must_use]
    pub const fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    /// List all deployments, logging each resource name.
    ///
    /// # Errors
    /// Returns error if the remote call fails.
    pub async fn try_list_deployments(&self) -> Result<Vec<Deployment>, EngineError> {
        let deployments = self.engine.list_deployments().await?;
        if deployments.is_empty() {
            info!("No deployments found.");
            return Ok(deployments);
        }

        info!("Deployments:");
        for deployment in &deployments {
            match &deployment.display_name {
                Some(display_name) => info!("- {} ({display_name})", deployment.resource_name),
                None => info!("- {}", deployment.resource_name),
            }
        }
        Ok(deployments)
    }

    /// List all deployments, or an empty list on failure.
    pub async fn list_deployments(&self) -> Vec<Deployment> {
        self.try_list_deployments().await.unwrap_or_else(|e| {
            error!("Error listing deployments: {e}");
            Vec::new()
        })
    }

    /// Fetch one deployment.
    ///
    /// # Errors
    /// Returns error if the remote call fails.
    pub async fn try_get_deployment(&self, deployment_id: &str) -> Result<Deployment, EngineError> {
        self.engine.get_deployment(deployment_id).await
    }

    /// Fetch one deployment, or `None` on failure.
    pub async fn get_deployment(&self, deployment_id: &str) -> Option<Deployment> {
        self.try_get_deployment(deployment_id)
            .await
            .map_err(|e| error!(deployment_id, "Error getting deployment: {e}"))
            .ok()
    }

    /// Create a deployment from a staged package.
    ///
    /// # Errors
    /// Returns error if creation fails or never completes.
    pub async fn try_create_deployment(
        &self,
        spec: &DeploymentSpec,
    ) -> Result<Deployment, EngineError> {
        info!(display_name = %spec.display_name, "Creating deployment...");
        let deployment = self.engine.create_deployment(spec).await?;
        info!("Remote app created: {}", deployment.resource_name);
        Ok(deployment)
    }

    /// Create a deployment, or `None` on failure.
    pub async fn create_deployment(&self, spec: &DeploymentSpec) -> Option<Deployment> {
        self.try_create_deployment(spec)
            .await
            .map_err(|e| error!(display_name = %spec.display_name, "Error creating deployment: {e}"))
            .ok()
    }

    /// Delete a deployment; `force` removes its sessions too.
    ///
    /// # Errors
    /// Returns error if the remote call fails.
    pub async fn try_delete_deployment(
        &self,
        deployment_id: &str,
        force: bool,
    ) -> Result<(), EngineError> {
        self.engine.delete_deployment(deployment_id, force).await?;
        info!("Deployment {deployment_id} deleted.");
        Ok(())
    }

    /// Delete a deployment, returning whether it succeeded.
    pub async fn delete_deployment(&self, deployment_id: &str, force: bool) -> bool {
        match self.try_delete_deployment(deployment_id, force).await {
            Ok(()) => true,
            Err(e) => {
                error!("Error deleting deployment {deployment_id}: {e}");
                false
            }
        }
    }
}
