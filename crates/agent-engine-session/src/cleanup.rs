//! Best-effort batch deletion of a user's sessions.

use agent_engine_core::{AgentEngine, EngineError, SessionRef};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::SessionManager;

/// Cleanup error.
#[derive(Debug, Error)]
pub enum CleanupError {
    /// Sessions could not be listed; nothing was deleted.
    #[error("Error listing sessions for deletion: {0}")]
    ListFailed(#[source] EngineError),
    /// Some sessions were left behind.
    #[error("Deleted {deleted} sessions; {failed} failed, {skipped} without an identifier")]
    Partial {
        deleted: usize,
        failed: usize,
        skipped: usize,
    },
}

/// Outcome of deleting all of a user's sessions.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Sessions whose deletion succeeded.
    pub deleted: usize,
    /// Sessions whose identifier could not be resolved.
    pub skipped: Vec<SessionRef>,
    /// Resolved sessions whose deletion failed.
    pub failed: Vec<(String, EngineError)>,
}

impl CleanupReport {
    /// Whether every listed session was deleted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }

    /// Turn leftovers into an error.
    ///
    /// # Errors
    /// Returns `CleanupError::Partial` if any session was skipped or failed.
    pub fn into_result(self) -> Result<usize, CleanupError> {
        if self.is_complete() {
            Ok(self.deleted)
        } else {
            Err(CleanupError::Partial {
                deleted: self.deleted,
                failed: self.failed.len(),
                skipped: self.skipped.len(),
            })
        }
    }
}

impl<E> SessionManager<E>
where
    E: AgentEngine + ?Sized,
{
    /// Delete every session of `user_id`, continuing past per-session errors.
    ///
    /// # Errors
    /// Returns `CleanupError::ListFailed` if the sessions cannot be listed.
    pub async fn try_delete_all_sessions(
        &self,
        deployment_id: &str,
        user_id: &str,
    ) -> Result<CleanupReport, CleanupError> {
        let sessions = self
            .engine
            .list_sessions(deployment_id, user_id)
            .await
            .map_err(CleanupError::ListFailed)?;

        let mut report = CleanupReport::default();
        if sessions.is_empty() {
            info!("No sessions found for user {user_id}");
            return Ok(report);
        }

        info!("Deleting all {} sessions for user {user_id}...", sessions.len());
        for session in sessions {
            let Some(session_id) = session.id() else {
                warn!("Could not determine session ID for: {session}");
                report.skipped.push(session);
                continue;
            };
            debug!("Session ID is a {}: {session_id}", session.kind());

            match self
                .try_delete_session(deployment_id, user_id, &session_id)
                .await
            {
                Ok(_) => report.deleted += 1,
                Err(e) => {
                    error!("Error deleting session {session_id}: {e}");
                    report.failed.push((session_id, e));
                }
            }
        }

        info!("Deleted {} sessions for user {user_id}", report.deleted);
        Ok(report)
    }

    /// Delete every session of `user_id`, returning how many were deleted.
    ///
    /// Returns zero without deleting anything if listing fails.
    pub async fn delete_all_sessions(&self, deployment_id: &str, user_id: &str) -> usize {
        match self.try_delete_all_sessions(deployment_id, user_id).await {
            Ok(report) => report.deleted,
            Err(e) => {
                error!(deployment_id, user_id, "{e}");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use agent_engine_core::RetryPolicy;
    use serde_json::json;

    use super::*;
    use crate::engine::{MemoryEngine, Operation};

    fn setup() -> (Arc<MemoryEngine>, String, SessionManager<MemoryEngine>) {
        let engine = Arc::new(MemoryEngine::new());
        let deployment = engine.add_deployment("agent");
        let manager = SessionManager::new(Arc::clone(&engine)).with_read_policy(RetryPolicy::none());
        (engine, deployment, manager)
    }

    #[tokio::test]
    async fn test_heterogeneous_shapes() {
        let (engine, deployment, manager) = setup();
        engine.insert_raw_session(&deployment, "123", json!({"id": "s1"}));
        engine.insert_raw_session(&deployment, "123", json!("s2"));
        engine.insert_raw_session(&deployment, "123", json!({"sessionId": "s3"}));
        engine.insert_raw_session(&deployment, "123", json!(42));

        let report = manager
            .try_delete_all_sessions(&deployment, "123")
            .await
            .unwrap();
        assert_eq!(report.deleted, 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].to_value(), json!(42));
        assert!(report.failed.is_empty());
        assert_eq!(engine.deleted_sessions(), vec!["s1", "s2", "s3"]);
        assert!(matches!(
            report.into_result(),
            Err(CleanupError::Partial { deleted: 3, failed: 0, skipped: 1 })
        ));
    }

    #[tokio::test]
    async fn test_counts_only_successful_deletions() {
        let (engine, deployment, manager) = setup();
        for id in ["a", "b", "c"] {
            engine.insert_raw_session(&deployment, "123", json!({ "id": id }));
        }
        engine.fail_session_delete("b");

        assert_eq!(manager.delete_all_sessions(&deployment, "123").await, 2);
        assert_eq!(engine.deleted_sessions(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_list_failure_deletes_nothing() {
        let (engine, deployment, manager) = setup();
        engine.insert_raw_session(&deployment, "123", json!({"id": "s1"}));
        engine.fail(Operation::ListSessions);

        assert_eq!(manager.delete_all_sessions(&deployment, "123").await, 0);
        assert_eq!(engine.calls(Operation::DeleteSession), 0);
        assert!(matches!(
            manager.try_delete_all_sessions(&deployment, "123").await,
            Err(CleanupError::ListFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_no_sessions() {
        let (_engine, deployment, manager) = setup();
        let report = manager
            .try_delete_all_sessions(&deployment, "123")
            .await
            .unwrap();
        assert_eq!(report.deleted, 0);
        assert!(report.is_complete());
        assert_eq!(report.into_result().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_other_users_untouched() {
        let (engine, deployment, manager) = setup();
        manager.create_session(&deployment, "123").await.unwrap();
        manager.create_session(&deployment, "456").await.unwrap();

        assert_eq!(manager.delete_all_sessions(&deployment, "123").await, 1);
        assert_eq!(manager.list_sessions(&deployment, "456").await.len(), 1);
        assert_eq!(engine.calls(Operation::DeleteSession), 1);
    }
}
