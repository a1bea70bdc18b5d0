//! The remote service boundary.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;

use crate::{AgentEvent, Deployment, DeploymentSpec, Session, SessionRef};

/// Server-streamed response events, in arrival order.
pub type EventStream = BoxStream<'static, Result<AgentEvent, EngineError>>;

/// Error raised by a remote service call.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error {code} ({status}): {message}")]
    Api {
        code: u16,
        status: String,
        message: String,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    /// The deployment itself is missing, so none of its sessions will appear.
    #[error("Deployment not found: {0}")]
    DeploymentNotFound(String),
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Stream error: {0}")]
    Stream(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Operation {name} failed: {message}")]
    OperationFailed { name: String, message: String },
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether the call may succeed if repeated later.
    ///
    /// Not-found counts: freshly created sessions are not readable right away.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::NotFound(_) | Self::Timeout(_) => true,
            Self::Api { code, .. } => matches!(*code, 404 | 429 | 500 | 502 | 503 | 504),
            Self::DeploymentNotFound(_)
            | Self::Decode(_)
            | Self::Stream(_)
            | Self::Config(_)
            | Self::OperationFailed { .. }
            | Self::Internal(_) => false,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Trait for managed agent-execution services.
///
/// Every method is a single remote call; implementations do not retry.
#[async_trait]
pub trait AgentEngine: Send + Sync {
    /// Enumerate all deployments in the configured project and region.
    async fn list_deployments(&self) -> Result<Vec<Deployment>, EngineError>;

    /// Fetch a deployment by resource name or bare id.
    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, EngineError>;

    /// Create a deployment and wait for it to become available.
    async fn create_deployment(&self, spec: &DeploymentSpec) -> Result<Deployment, EngineError>;

    /// Delete a deployment. `force` also removes its sessions.
    async fn delete_deployment(&self, deployment_id: &str, force: bool)
    -> Result<(), EngineError>;

    /// Create a session for a user.
    async fn create_session(
        &self,
        deployment_id: &str,
        user_id: &str,
    ) -> Result<Session, EngineError>;

    /// List a user's sessions, decoded but not yet normalized.
    async fn list_sessions(
        &self,
        deployment_id: &str,
        user_id: &str,
    ) -> Result<Vec<SessionRef>, EngineError>;

    /// Read one session.
    async fn get_session(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Session, EngineError>;

    /// Delete one session, returning the raw service response.
    async fn delete_session(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Value, EngineError>;

    /// Open a streamed query for a message within a session.
    async fn stream_query(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<EventStream, EngineError>;
}
