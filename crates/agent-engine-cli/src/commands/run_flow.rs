//! `run-flow`: one conversation turn against the first deployment.

use std::sync::Arc;

use agent_engine_core::{AgentEngine, AgentEvent, RetryPolicy, SessionRef};
use agent_engine_session::{DeploymentDirectory, MessageDispatcher, SessionManager};
use tracing::{error, info, warn};

use super::Outcome;
use crate::cli::RunFlowArgs;

/// What a completed flow did.
#[derive(Debug)]
pub struct FlowSummary {
    pub deployment: String,
    pub session_id: String,
    pub created_session: bool,
    pub events: Vec<AgentEvent>,
    pub deleted_session: bool,
}

/// Walk the first deployment through one conversation turn.
///
/// Returns the early-exit outcome when there is no deployment or no usable
/// session.
pub async fn run<E>(
    engine: Arc<E>,
    args: &RunFlowArgs,
    read_policy: RetryPolicy,
) -> Result<FlowSummary, Outcome>
where
    E: AgentEngine + ?Sized,
{
    let directory = DeploymentDirectory::new(Arc::clone(&engine));
    let manager = SessionManager::new(Arc::clone(&engine)).with_read_policy(read_policy);
    let dispatcher = MessageDispatcher::new(engine);
    let user_id = args.user.as_str();

    info!("Listing deployments...");
    let deployments = directory.list_deployments().await;
    let Some(deployment) = deployments.into_iter().next() else {
        warn!("No deployments found. Exiting.");
        return Err(Outcome::NoDeployments);
    };
    let resource_id = deployment.resource_name;
    info!("Using deployment: {resource_id}");

    info!("Listing sessions...");
    let sessions = manager.list_sessions(&resource_id, user_id).await;
    let existing = sessions.iter().find_map(SessionRef::id);

    let (session_id, created_session) = if let Some(session_id) = existing {
        info!("Found {} sessions.", sessions.len());
        info!("Using existing session ID: {session_id}");
        (session_id, false)
    } else {
        info!("No sessions found. Creating session for user {user_id}...");
        let Some(session) = manager.create_session(&resource_id, user_id).await else {
            error!("Failed to create session. Exiting.");
            return Err(Outcome::NoSession);
        };
        info!("Session created: {}", session.id);
        (session.id, true)
    };

    info!("Getting session details...");
    if manager
        .get_session(&resource_id, user_id, &session_id)
        .await
        .is_none()
    {
        error!("Failed to get session details. Exiting.");
        return Err(Outcome::NoSession);
    }

    info!("Sending message...");
    let events = dispatcher
        .send_message(&resource_id, user_id, &session_id, &args.message)
        .await;
    for text in events.iter().filter_map(AgentEvent::text) {
        info!("Agent: {text}");
    }

    let deleted_session = if args.delete_session {
        info!("Deleting session...");
        manager
            .delete_session(&resource_id, user_id, &session_id)
            .await
            .is_some()
    } else {
        false
    };

    Ok(FlowSummary {
        deployment: resource_id,
        session_id,
        created_session,
        events,
        deleted_session,
    })
}

pub async fn execute<E>(engine: Arc<E>, args: &RunFlowArgs) -> Outcome
where
    E: AgentEngine + ?Sized,
{
    match run(engine, args, RetryPolicy::default()).await {
        Ok(summary) => {
            info!(
                deployment = %summary.deployment,
                session_id = %summary.session_id,
                created_session = summary.created_session,
                deleted_session = summary.deleted_session,
                "Flow complete with {} response events",
                summary.events.len()
            );
            Outcome::Completed
        }
        Err(outcome) => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::DEFAULT_MESSAGE;
    use agent_engine_session::engine::{MemoryEngine, Operation};
    use serde_json::json;

    fn args(delete_session: bool) -> RunFlowArgs {
        RunFlowArgs {
            user: "123".to_string(),
            message: DEFAULT_MESSAGE.to_string(),
            delete_session,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_with_new_session() {
        let engine = Arc::new(MemoryEngine::new());
        let deployment = engine.add_deployment("agent");
        engine.set_read_lag(2);

        let summary = run(Arc::clone(&engine), &args(true), RetryPolicy::immediate(5))
            .await
            .unwrap();

        assert_eq!(summary.deployment, deployment);
        assert!(summary.created_session);
        assert!(!summary.events.is_empty());
        assert_eq!(
            summary.events[0].text().as_deref(),
            Some(format!("echo: {DEFAULT_MESSAGE}").as_str())
        );
        assert!(summary.deleted_session);
        assert_eq!(engine.deleted_sessions(), vec![summary.session_id]);
        assert!(engine.list_sessions(&deployment, "123").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reuses_existing_session() {
        let engine = Arc::new(MemoryEngine::new());
        let deployment = engine.add_deployment("agent");
        engine.insert_raw_session(&deployment, "123", json!({"id": "existing"}));

        let summary = run(Arc::clone(&engine), &args(false), RetryPolicy::none())
            .await
            .unwrap();
        assert_eq!(summary.session_id, "existing");
        assert!(!summary.created_session);
        assert!(!summary.deleted_session);
        assert_eq!(engine.calls(Operation::CreateSession), 0);
    }

    #[tokio::test]
    async fn test_no_deployments() {
        let engine = Arc::new(MemoryEngine::new());
        let outcome = run(engine, &args(false), RetryPolicy::none()).await.unwrap_err();
        assert_eq!(outcome, Outcome::NoDeployments);
    }

    #[tokio::test]
    async fn test_session_creation_failure() {
        let engine = Arc::new(MemoryEngine::new());
        engine.add_deployment("agent");
        engine.fail(Operation::CreateSession);

        let outcome = run(engine, &args(false), RetryPolicy::none()).await.unwrap_err();
        assert_eq!(outcome, Outcome::NoSession);
    }

    #[tokio::test]
    async fn test_unreadable_session() {
        let engine = Arc::new(MemoryEngine::new());
        engine.add_deployment("agent");
        engine.set_read_lag(5);

        let outcome = run(Arc::clone(&engine), &args(false), RetryPolicy::immediate(2))
            .await
            .unwrap_err();
        assert_eq!(outcome, Outcome::NoSession);
        assert_eq!(engine.calls(Operation::StreamQuery), 0);
    }
}
