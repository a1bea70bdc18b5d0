//! `sessions`: manage the sessions of one deployment.

use std::sync::Arc;

use agent_engine_core::{AgentEngine, RetryPolicy};
use agent_engine_session::SessionManager;
use anyhow::{Context, Result};

use crate::cli::{SessionCommands, SessionTarget};

pub async fn execute<E>(
    engine: Arc<E>,
    command: &SessionCommands,
    read_policy: RetryPolicy,
) -> Result<()>
where
    E: AgentEngine + ?Sized,
{
    let manager = SessionManager::new(engine).with_read_policy(read_policy);

    match command {
        SessionCommands::List(SessionTarget { deployment, user }) => {
            let sessions = manager
                .try_list_sessions(deployment, user)
                .await
                .context("Failed to list sessions")?;
            if sessions.is_empty() {
                println!("No sessions for user {user}");
            }
            for session in &sessions {
                match session.id() {
                    Some(id) => println!("{id}"),
                    None => println!("<unidentified> {session}"),
                }
            }
        }
        SessionCommands::Create(SessionTarget { deployment, user }) => {
            let session = manager
                .try_create_session(deployment, user)
                .await
                .context("Failed to create session")?;
            println!("{}", session.id);
        }
        SessionCommands::Get { target, session } => {
            let session = manager
                .try_get_session(&target.deployment, &target.user, session)
                .await
                .with_context(|| format!("Failed to get session {session}"))?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionCommands::Delete { target, session } => {
            let ack = manager
                .try_delete_session(&target.deployment, &target.user, session)
                .await
                .with_context(|| format!("Failed to delete session {session}"))?;
            println!("Deleted {}", ack.session_id);
        }
        SessionCommands::DeleteAll(SessionTarget { deployment, user }) => {
            let deleted = manager
                .try_delete_all_sessions(deployment, user)
                .await?
                .into_result()?;
            println!("Deleted {deleted} sessions");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_engine_session::engine::{MemoryEngine, Operation};
    use serde_json::json;

    fn target(deployment: &str) -> SessionTarget {
        SessionTarget {
            deployment: deployment.to_string(),
            user: "123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_delete_all() {
        let engine = Arc::new(MemoryEngine::new());
        let deployment = engine.add_deployment("agent");

        for command in [
            SessionCommands::Create(target(&deployment)),
            SessionCommands::List(target(&deployment)),
            SessionCommands::DeleteAll(target(&deployment)),
        ] {
            execute(Arc::clone(&engine), &command, RetryPolicy::none())
                .await
                .unwrap();
        }

        assert_eq!(engine.deleted_sessions().len(), 1);
        assert!(engine.list_sessions(&deployment, "123").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_with_unidentified_session_fails() {
        let engine = Arc::new(MemoryEngine::new());
        let deployment = engine.add_deployment("agent");
        engine.insert_raw_session(&deployment, "123", json!({"id": "a"}));
        engine.insert_raw_session(&deployment, "123", json!([1, 2]));

        let command = SessionCommands::DeleteAll(target(&deployment));
        let result = execute(Arc::clone(&engine), &command, RetryPolicy::none()).await;
        assert!(result.is_err());
        assert_eq!(engine.deleted_sessions(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_get_missing_session_fails() {
        let engine = Arc::new(MemoryEngine::new());
        let deployment = engine.add_deployment("agent");
        let command = SessionCommands::Get {
            target: target(&deployment),
            session: "missing".to_string(),
        };
        assert!(execute(Arc::clone(&engine), &command, RetryPolicy::immediate(2)).await.is_err());
        assert_eq!(engine.calls(Operation::GetSession), 2);
    }
}
