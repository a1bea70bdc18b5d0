//! `AgentEngine` over the reasoning engine REST API.

use std::time::Duration;

use agent_engine_core::{
    AgentEngine, Deployment, DeploymentSpec, EngineConfig, EngineError, EventStream, RetryPolicy,
    Session, SessionRef,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    client::{HttpClientConfig, create_client},
    protocol::{
        CreateReasoningEngineRequest, ErrorEnvelope, ListReasoningEnginesResponse, Operation,
        QueryRequest, QueryResponse,
    },
    stream::decode_events,
};

/// REST client for a managed agent engine.
#[derive(Clone)]
pub struct RestEngine {
    client: Client,
    config: EngineConfig,
    access_token: Option<String>,
    operation_policy: RetryPolicy,
}

impl RestEngine {
    /// Create an engine client for `config`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: EngineConfig, client_config: &HttpClientConfig) -> Result<Self, EngineError> {
        Ok(Self {
            client: create_client(client_config)?,
            config,
            access_token: None,
            operation_policy: RetryPolicy {
                initial_delay: Duration::from_secs(5),
                base_delay: Duration::from_secs(5),
                max_delay: Duration::from_secs(30),
                max_elapsed: Duration::from_secs(20 * 60),
                max_attempts: u32::MAX,
            },
        })
    }

    /// Send `token` as a bearer credential on every request.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Override how long-running create operations are polled.
    #[must_use]
    pub const fn with_operation_policy(mut self, policy: RetryPolicy) -> Self {
        self.operation_policy = policy;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.config.base_url())
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        debug!("Engine request: {method} {url}");
        let builder = self.client.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, EngineError> {
        let response = builder
            .send()
            .await
            .map_err(|e| EngineError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ErrorEnvelope::to_engine_error(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, EngineError> {
        Self::send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| EngineError::Decode(e.to_string()))
    }

    /// Invoke a class method on the deployed app and return its output.
    async fn query(
        &self,
        deployment_id: &str,
        class_method: &str,
        input: Value,
    ) -> Result<Value, EngineError> {
        let name = self.config.resource_name(deployment_id);
        let url = self.url(&format!("{name}:query"));
        let body = QueryRequest::new(class_method, input);
        let response: QueryResponse =
            Self::send_json(self.request(Method::POST, url).json(&body)).await?;
        Ok(response.output)
    }

    async fn get_operation(&self, name: &str) -> Result<Operation, EngineError> {
        Self::send_json(self.request(Method::GET, self.url(name))).await
    }
}

fn session_from_output(output: Value, session_id: &str) -> Result<Session, EngineError> {
    if output.is_null() {
        return Err(EngineError::NotFound(format!("session {session_id}")));
    }
    Ok(serde_json::from_value(output)?)
}

#[async_trait]
impl AgentEngine for RestEngine {
    async fn list_deployments(&self) -> Result<Vec<Deployment>, EngineError> {
        let url = self.url(&format!("{}/reasoningEngines", self.config.parent()));
        let mut deployments = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut builder = self.request(Method::GET, url.clone());
            if let Some(token) = &page_token {
                builder = builder.query(&[("pageToken", token)]);
            }
            let page: ListReasoningEnginesResponse = Self::send_json(builder).await?;
            deployments.extend(page.reasoning_engines);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(deployments)
    }

    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, EngineError> {
        let name = self.config.resource_name(deployment_id);
        Self::send_json(self.request(Method::GET, self.url(&name))).await
    }

    async fn create_deployment(&self, spec: &DeploymentSpec) -> Result<Deployment, EngineError> {
        let url = self.url(&format!("{}/reasoningEngines", self.config.parent()));
        let body = CreateReasoningEngineRequest::from(spec);
        let operation: Operation =
            Self::send_json(self.request(Method::POST, url).json(&body)).await?;
        debug!(operation = %operation.name, "Create operation started");

        let operation_name = operation.name.clone();
        if let Some(deployment) = operation.into_deployment()? {
            return Ok(deployment);
        }
        let (this, operation_name) = (self, operation_name.as_str());
        self.operation_policy
            .poll(|| async move { this.get_operation(operation_name).await?.into_deployment() })
            .await
    }

    async fn delete_deployment(
        &self,
        deployment_id: &str,
        force: bool,
    ) -> Result<(), EngineError> {
        let name = self.config.resource_name(deployment_id);
        let mut builder = self.request(Method::DELETE, self.url(&name));
        if force {
            builder = builder.query(&[("force", "true")]);
        }
        let operation: Operation = Self::send_json(builder).await?;
        debug!(operation = %operation.name, "Delete operation started");
        if operation.completed()? {
            return Ok(());
        }

        let (this, operation_name) = (self, operation.name.as_str());
        self.operation_policy
            .poll(|| async move {
                let done = this.get_operation(operation_name).await?.completed()?;
                Ok::<_, EngineError>(done.then_some(()))
            })
            .await
    }

    async fn create_session(
        &self,
        deployment_id: &str,
        user_id: &str,
    ) -> Result<Session, EngineError> {
        let output = self
            .query(deployment_id, "create_session", json!({ "user_id": user_id }))
            .await?;
        Ok(serde_json::from_value(output)?)
    }

    async fn list_sessions(
        &self,
        deployment_id: &str,
        user_id: &str,
    ) -> Result<Vec<SessionRef>, EngineError> {
        let output = self
            .query(deployment_id, "list_sessions", json!({ "user_id": user_id }))
            .await?;
        match output.get("sessions") {
            Some(Value::Array(sessions)) => {
                Ok(sessions.iter().cloned().map(SessionRef::from_value).collect())
            }
            Some(Value::Null) => Ok(Vec::new()),
            _ => Err(EngineError::Decode(format!(
                "list_sessions output has no sessions list: {output}"
            ))),
        }
    }

    async fn get_session(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Session, EngineError> {
        let output = self
            .query(
                deployment_id,
                "get_session",
                json!({ "user_id": user_id, "session_id": session_id }),
            )
            .await?;
        session_from_output(output, session_id)
    }

    async fn delete_session(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Value, EngineError> {
        self.query(
            deployment_id,
            "delete_session",
            json!({ "user_id": user_id, "session_id": session_id }),
        )
        .await
    }

    async fn stream_query(
        &self,
        deployment_id: &str,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<EventStream, EngineError> {
        let name = self.config.resource_name(deployment_id);
        let url = self.url(&format!("{name}:streamQuery"));
        let body = QueryRequest::new(
            "stream_query",
            json!({ "user_id": user_id, "session_id": session_id, "message": message }),
        );
        let builder = self
            .request(Method::POST, url)
            .query(&[("alt", "sse")])
            .json(&body);
        let response = Self::send(builder).await?;
        Ok(decode_events(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let config = EngineConfig::new("p", "us-central1", "gs://b");
        let engine = RestEngine::new(config, &HttpClientConfig::default()).unwrap();
        assert_eq!(
            engine.url("projects/p/locations/us-central1/reasoningEngines"),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/p/locations/us-central1/reasoningEngines"
        );
    }

    #[test]
    fn test_null_session_output_is_not_found() {
        let err = session_from_output(Value::Null, "s1").unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        let session = session_from_output(json!({"id": "s1", "user_id": "123"}), "s1").unwrap();
        assert_eq!(session.user_id.as_deref(), Some("123"));
    }

    #[test]
    fn test_session_with_null_events() {
        let output = json!({"id": "s1", "userId": "123", "state": {}, "events": null});
        let session = session_from_output(output, "s1").unwrap();
        assert!(session.events.is_empty());
    }
}
