//! Message dispatch into a running agent.

use std::sync::Arc;

use agent_engine_core::{AgentEngine, AgentEvent, EngineError};
use futures::StreamExt;
use tracing::{error, info};

/// Sends messages to a deployment and collects the streamed events.
pub struct MessageDispatcher<E>
where
    E: AgentEngine + ?Sized,
{
    engine: Arc<E>,
}

impl<E> MessageDispatcher<E>
where
    E: AgentEngine + ?Sized,
{
    #[must_use]
    pub const fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    /// Send `message` and drain the response stream, in arrival order.
    ///
    /// # Errors
    /// Returns error if the stream cannot be opened or fails midway; events
    /// received before a midway failure are discarded.
    pub async fn try_send_message(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<Vec<AgentEvent>, EngineError> {
        info!("Sending message: '{message}'");
        let mut stream = self
            .engine
            .stream_query(deployment_id, user_id, session_id, message)
            .await?;

        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            let event = event?;
            info!("Response event: {event}");
            events.push(event);
        }

        if events.is_empty() {
            info!("No response events received from the agent.");
        }
        Ok(events)
    }

    /// Send `message`, returning an empty list on failure.
    ///
    /// An empty result is either a failed call or an agent that did not
    /// respond; use [`Self::try_send_message`] to tell them apart.
    pub async fn send_message(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Vec<AgentEvent> {
        self.try_send_message(deployment_id, user_id, session_id, message)
            .await
            .unwrap_or_else(|e| {
                error!(deployment_id, user_id, "Error sending message to session {session_id}: {e}");
                Vec::new()
            })
    }
}
