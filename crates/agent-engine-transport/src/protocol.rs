//! Wire protocol for the reasoning engine REST API.

use agent_engine_core::{Deployment, DeploymentSpec, EngineError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Class-method invocation sent to `:query` and `:streamQuery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub class_method: String,
    pub input: Value,
}

impl QueryRequest {
    #[must_use]
    pub fn new(class_method: impl Into<String>, input: Value) -> Self {
        Self {
            class_method: class_method.into(),
            input,
        }
    }
}

/// Response of a `:query` call.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub output: Value,
}

/// One page of deployments.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReasoningEnginesResponse {
    #[serde(default)]
    pub reasoning_engines: Vec<Deployment>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Body of a create request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReasoningEngineRequest {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub spec: ReasoningEngineSpec,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningEngineSpec {
    pub package_spec: PackageSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_spec: Option<RuntimeSpec>,
    pub agent_framework: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    pub pickle_object_gcs_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_files_gcs_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements_gcs_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeSpec {
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl From<&DeploymentSpec> for CreateReasoningEngineRequest {
    fn from(spec: &DeploymentSpec) -> Self {
        let mut env: Vec<EnvVar> = spec
            .env
            .iter()
            .map(|(name, value)| EnvVar {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        if spec.enable_tracing {
            env.push(EnvVar {
                name: "GOOGLE_CLOUD_AGENT_ENGINE_ENABLE_TELEMETRY".to_string(),
                value: "true".to_string(),
            });
        }

        Self {
            display_name: spec.display_name.clone(),
            description: spec.description.clone(),
            spec: ReasoningEngineSpec {
                package_spec: PackageSpec {
                    pickle_object_gcs_uri: spec.package_uri.clone(),
                    dependency_files_gcs_uri: spec.dependency_files_uri.clone(),
                    requirements_gcs_uri: spec.requirements_uri.clone(),
                    python_version: spec.python_version.clone(),
                },
                deployment_spec: (!env.is_empty()).then_some(RuntimeSpec { env }),
                agent_framework: "google-adk".to_string(),
            },
        }
    }
}

/// Long-running operation.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<Status>,
    #[serde(default)]
    pub response: Option<Value>,
}

impl Operation {
    /// Resource the operation acts on: the name without `/operations/{id}`.
    #[must_use]
    pub fn target(&self) -> &str {
        self.name
            .split_once("/operations/")
            .map_or(self.name.as_str(), |(target, _)| target)
    }

    /// Whether the operation has finished successfully.
    ///
    /// # Errors
    /// Returns `OperationFailed` if the operation finished with an error.
    pub fn completed(&self) -> Result<bool, EngineError> {
        if !self.done {
            return Ok(false);
        }
        match &self.error {
            Some(status) => Err(EngineError::OperationFailed {
                name: self.name.clone(),
                message: status.message.clone(),
            }),
            None => Ok(true),
        }
    }

    /// Deployment produced by a finished operation.
    ///
    /// # Errors
    /// Returns `OperationFailed` if the operation finished with an error.
    pub fn into_deployment(self) -> Result<Option<Deployment>, EngineError> {
        if !self.completed()? {
            return Ok(None);
        }
        let target = self.target().to_string();
        let deployment = self
            .response
            .and_then(|r| serde_json::from_value::<Deployment>(r).ok())
            .unwrap_or_else(|| Deployment::new(target));
        Ok(Some(deployment))
    }
}

/// Google RPC status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: Status,
}

impl ErrorEnvelope {
    /// Build an `EngineError` from an HTTP status and raw body.
    #[must_use]
    pub fn to_engine_error(code: u16, body: &str) -> EngineError {
        let status = serde_json::from_str::<Self>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| Status {
                message: body.trim().to_string(),
                ..Status::default()
            });

        if code == 404 {
            return EngineError::NotFound(status.message);
        }
        EngineError::Api {
            code,
            status: status.status,
            message: status.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_request_serialization() {
        let req = QueryRequest::new("list_sessions", json!({"user_id": "123"}));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            json!({"classMethod": "list_sessions", "input": {"user_id": "123"}})
        );
    }

    #[test]
    fn test_create_request_from_spec() {
        let mut spec = DeploymentSpec::new("social-posts", "gs://b/agent.pkl");
        spec.requirements_uri = Some("gs://b/requirements.txt".to_string());
        spec.env.push(("OPENAI_MODEL".to_string(), "gpt-4o".to_string()));

        let req = CreateReasoningEngineRequest::from(&spec);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["displayName"], "social-posts");
        assert_eq!(json["spec"]["packageSpec"]["pickleObjectGcsUri"], "gs://b/agent.pkl");
        assert_eq!(
            json["spec"]["packageSpec"]["requirementsGcsUri"],
            "gs://b/requirements.txt"
        );
        assert!(json["spec"]["packageSpec"].get("pythonVersion").is_none());
        let env = json["spec"]["deploymentSpec"]["env"].as_array().unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(env[0], json!({"name": "OPENAI_MODEL", "value": "gpt-4o"}));
    }

    #[test]
    fn test_operation_lifecycle() {
        let pending: Operation = serde_json::from_value(json!({
            "name": "projects/p/locations/l/reasoningEngines/7/operations/99"
        }))
        .unwrap();
        assert_eq!(pending.target(), "projects/p/locations/l/reasoningEngines/7");
        assert!(pending.into_deployment().unwrap().is_none());

        let done: Operation = serde_json::from_value(json!({
            "name": "projects/p/locations/l/reasoningEngines/7/operations/99",
            "done": true,
            "response": {"@type": "type.googleapis.com/ReasoningEngine", "name": "projects/p/locations/l/reasoningEngines/7", "displayName": "a"}
        }))
        .unwrap();
        let deployment = done.into_deployment().unwrap().unwrap();
        assert_eq!(deployment.display_name.as_deref(), Some("a"));

        let failed: Operation = serde_json::from_value(json!({
            "name": "projects/p/locations/l/reasoningEngines/7/operations/99",
            "done": true,
            "error": {"code": 3, "message": "bad package"}
        }))
        .unwrap();
        assert!(matches!(
            failed.completed(),
            Err(EngineError::OperationFailed { ref message, .. }) if message == "bad package"
        ));
        assert!(matches!(
            failed.into_deployment(),
            Err(EngineError::OperationFailed { .. })
        ));
    }

    #[test]
    fn test_empty_delete_response_is_complete() {
        let done: Operation = serde_json::from_value(json!({
            "name": "projects/p/locations/l/reasoningEngines/7/operations/100",
            "done": true,
            "response": {"@type": "type.googleapis.com/google.protobuf.Empty"}
        }))
        .unwrap();
        assert!(done.completed().unwrap());
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"error": {"code": 403, "message": "denied", "status": "PERMISSION_DENIED"}}"#;
        match ErrorEnvelope::to_engine_error(403, body) {
            EngineError::Api { code, status, message } => {
                assert_eq!(code, 403);
                assert_eq!(status, "PERMISSION_DENIED");
                assert_eq!(message, "denied");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            ErrorEnvelope::to_engine_error(404, "gone"),
            EngineError::NotFound(m) if m == "gone"
        ));
    }
}
