//! `send`: send one message into an existing session.

use std::sync::Arc;

use agent_engine_core::{AgentEngine, AgentEvent};
use agent_engine_session::MessageDispatcher;
use anyhow::{Context, Result};

/// Send one message into an existing session and print the agent's replies.
pub async fn execute<E>(
    engine: Arc<E>,
    deployment_id: &str,
    user_id: &str,
    session_id: &str,
    message: &str,
) -> Result<Vec<AgentEvent>>
where
    E: AgentEngine + ?Sized,
{
    let events = MessageDispatcher::new(engine)
        .try_send_message(deployment_id, user_id, session_id, message)
        .await
        .with_context(|| format!("Failed to send message to session {session_id}"))?;

    for event in &events {
        match event.text() {
            Some(text) => println!("{}: {text}", event.author().unwrap_or("agent")),
            None => println!("{event}"),
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_engine_session::engine::MemoryEngine;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_collects_replies() {
        let engine = Arc::new(MemoryEngine::new());
        let deployment = engine.add_deployment("agent");
        let session = engine.create_session(&deployment, "123").await.unwrap();
        engine.set_replies(vec![
            json!({"author": "agent", "content": {"parts": [{"text": "first"}]}}),
            json!({"author": "agent", "actions": {}}),
        ]);

        let events =
            tokio_test::assert_ok!(execute(engine, &deployment, "123", &session.id, "hi").await);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].text().as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_send_midstream_failure_is_error() {
        let engine = Arc::new(MemoryEngine::new());
        let deployment = engine.add_deployment("agent");
        let session = engine.create_session(&deployment, "123").await.unwrap();
        engine.set_replies(vec![json!({"text": "a"}), json!({"text": "b"})]);
        engine.fail_stream_after(1);

        tokio_test::assert_err!(execute(engine, &deployment, "123", &session.id, "hi").await);
    }
}
