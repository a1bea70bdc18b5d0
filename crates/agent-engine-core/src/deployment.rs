//! Deployment resources.

use serde::{Deserialize, Serialize};

/// A deployed instance of the agent runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Full resource name (`projects/{p}/locations/{l}/reasoningEngines/{id}`).
    #[serde(rename = "name")]
    pub resource_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Deployment {
    /// Create a handle with only a resource name.
    #[must_use]
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            display_name: None,
            description: None,
            create_time: None,
            update_time: None,
        }
    }

    /// Trailing id segment of the resource name.
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.resource_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.resource_name)
    }
}

/// Everything needed to create a deployment from a staged agent package.
///
/// The agent itself is opaque: it has already been packaged and uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub display_name: String,
    pub description: Option<String>,
    /// URI of the serialized agent application.
    pub package_uri: String,
    /// URI of the requirements file installed into the runtime.
    pub requirements_uri: Option<String>,
    /// URI of an archive with extra local packages.
    pub dependency_files_uri: Option<String>,
    pub python_version: Option<String>,
    /// Environment variables forwarded to the runtime, as `(name, value)`.
    pub env: Vec<(String, String)>,
    /// Enable tracing inside the deployed app.
    pub enable_tracing: bool,
}

impl DeploymentSpec {
    /// Create a spec for a staged package.
    #[must_use]
    pub fn new(display_name: impl Into<String>, package_uri: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            package_uri: package_uri.into(),
            enable_tracing: true,
            ..Self::default()
        }
    }

    /// Forward the named variables from the current process environment.
    ///
    /// Names that are unset are skipped and returned.
    pub fn forward_env<I, S>(&mut self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.forward_env_from(names, |name| std::env::var(name).ok())
    }

    /// Forward the named variables using `lookup` to resolve values.
    pub fn forward_env_from<I, S, F>(&mut self, names: I, lookup: F) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        for name in names {
            let name = name.as_ref();
            match lookup(name) {
                Some(value) => self.env.push((name.to_string(), value)),
                None => missing.push(name.to_string()),
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_from_wire() {
        let json = serde_json::json!({
            "name": "projects/p/locations/l/reasoningEngines/123",
            "displayName": "social-posts",
            "createTime": "2025-01-01T00:00:00Z"
        });
        let deployment: Deployment = serde_json::from_value(json).unwrap();
        assert_eq!(deployment.short_id(), "123");
        assert_eq!(deployment.display_name.as_deref(), Some("social-posts"));
        assert!(deployment.update_time.is_none());
    }

    #[test]
    fn test_forward_env_reports_missing() {
        let mut spec = DeploymentSpec::new("agent", "gs://b/agent.pkl");
        let missing = spec.forward_env_from(["OPENAI_MODEL", "CLAUDE_MODEL"], |name| {
            (name == "OPENAI_MODEL").then(|| "gpt-4o".to_string())
        });
        assert_eq!(spec.env, vec![("OPENAI_MODEL".to_string(), "gpt-4o".to_string())]);
        assert_eq!(missing, vec!["CLAUDE_MODEL".to_string()]);
    }
}
