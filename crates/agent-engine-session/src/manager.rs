//! Session manager for per-user agent sessions.

use std::sync::Arc;

use agent_engine_core::{AgentEngine, DeleteAck, EngineError, RetryPolicy, Session, SessionRef};
use tracing::{debug, error, info};

/// Session manager for a remote agent engine.
pub struct SessionManager<E>
where
    E: AgentEngine + ?Sized,
{
    pub(crate) engine: Arc<E>,
    read_policy: RetryPolicy,
}

impl<E> Clone for SessionManager<E>
where
    E: AgentEngine + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            read_policy: self.read_policy,
        }
    }
}

impl<E> SessionManager<E>
where
    E: AgentEngine + ?Sized,
{
    /// Create a new session manager with the default read policy.
    #[must_use]
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            read_policy: RetryPolicy::default(),
        }
    }

    /// Override the policy used when reading a session back.
    #[must_use]
    pub const fn with_read_policy(mut self, policy: RetryPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    /// Create a session for `user_id`.
    ///
    /// # Errors
    /// Returns error if the remote call fails.
    pub async fn try_create_session(
        &self,
        deployment_id: &str,
        user_id: &str,
    ) -> Result<Session, EngineError> {
        let session = self.engine.create_session(deployment_id, user_id).await?;
        info!(deployment_id, user_id, session_id = %session.id, "Session created");
        Ok(session)
    }

    /// Create a session, or `None` on failure.
    pub async fn create_session(&self, deployment_id: &str, user_id: &str) -> Option<Session> {
        self.try_create_session(deployment_id, user_id)
            .await
            .map_err(|e| error!(deployment_id, user_id, "Error creating session: {e}"))
            .ok()
    }

    /// List the sessions of `user_id`.
    ///
    /// # Errors
    /// Returns error if the remote call fails.
    pub async fn try_list_sessions(
        &self,
        deployment_id: &str,
        user_id: &str,
    ) -> Result<Vec<SessionRef>, EngineError> {
        let sessions = self.engine.list_sessions(deployment_id, user_id).await?;
        info!("Sessions for user {user_id}: {}", sessions.len());
        for session in &sessions {
            info!("- {session}");
        }
        Ok(sessions)
    }

    /// List sessions, or an empty list on failure.
    pub async fn list_sessions(&self, deployment_id: &str, user_id: &str) -> Vec<SessionRef> {
        self.try_list_sessions(deployment_id, user_id)
            .await
            .unwrap_or_else(|e| {
                error!(deployment_id, user_id, "Error listing sessions: {e}");
                Vec::new()
            })
    }

    /// Read a session, polling through initialization lag.
    ///
    /// A session is not readable immediately after creation; the read is
    /// retried per the manager's read policy.
    ///
    /// # Errors
    /// Returns `DeploymentNotFound` without polling if the deployment does not
    /// exist, otherwise the last error once the policy is exhausted.
    pub async fn try_get_session(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Session, EngineError> {
        // A missing deployment would otherwise be polled like a lagging session.
        match self.engine.get_deployment(deployment_id).await {
            Err(EngineError::NotFound(_)) => {
                return Err(EngineError::DeploymentNotFound(deployment_id.to_string()));
            }
            Err(e) => debug!(deployment_id, "Could not verify deployment: {e}"),
            Ok(_) => {}
        }

        let session = self
            .read_policy
            .retry(|| self.engine.get_session(deployment_id, user_id, session_id))
            .await?;
        info!(
            "Session {session_id} details: {}",
            serde_json::to_string(&session).unwrap_or_else(|_| session.id.clone())
        );
        Ok(session)
    }

    /// Read a session, or `None` on failure.
    pub async fn get_session(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Option<Session> {
        self.try_get_session(deployment_id, user_id, session_id)
            .await
            .map_err(|e| error!(deployment_id, user_id, "Error getting session {session_id}: {e}"))
            .ok()
    }

    /// Delete a session.
    ///
    /// # Errors
    /// Returns error if the remote call fails.
    pub async fn try_delete_session(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<DeleteAck, EngineError> {
        let response = self
            .engine
            .delete_session(deployment_id, user_id, session_id)
            .await?;
        info!("Session {session_id} deleted: {response}");
        Ok(DeleteAck {
            session_id: session_id.to_string(),
            response,
        })
    }

    /// Delete a session, or `None` on failure.
    pub async fn delete_session(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Option<DeleteAck> {
        self.try_delete_session(deployment_id, user_id, session_id)
            .await
            .map_err(|e| error!(deployment_id, user_id, "Error deleting session {session_id}: {e}"))
            .ok()
    }
}
