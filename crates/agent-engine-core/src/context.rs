//! Target configuration for deployments.

use serde::{Deserialize, Serialize};

/// Default project identifier.
pub const DEFAULT_PROJECT_ID: &str = "adk-bot-deploy";
/// Default region.
pub const DEFAULT_LOCATION: &str = "us-central1";
/// Default staging bucket for packaged agents.
pub const DEFAULT_STAGING_BUCKET: &str = "gs://social-posts-agent-test-1";

/// Which project, region and staging location deployments target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cloud project identifier.
    pub project_id: String,

    /// Region hosting the agent engine.
    pub location: String,

    /// Object storage location agent packages are staged in.
    pub staging_bucket: String,

    /// Base URL override for the service API.
    ///
    /// When unset the regional endpoint derived from `location` is used.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PROJECT_ID, DEFAULT_LOCATION, DEFAULT_STAGING_BUCKET)
    }
}

impl EngineConfig {
    /// Create a config for the given project, region and bucket.
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        staging_bucket: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            staging_bucket: staging_bucket.into(),
            endpoint: None,
        }
    }

    /// Override the service base URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Base URL of the service API, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.endpoint.as_deref().map_or_else(
            || format!("https://{}-aiplatform.googleapis.com", self.location),
            |e| e.trim_end_matches('/').to_string(),
        )
    }

    /// Parent collection that deployments are created in.
    #[must_use]
    pub fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.location)
    }

    /// Full resource name for a bare deployment id.
    ///
    /// Values that already look like resource names are returned as-is.
    #[must_use]
    pub fn resource_name(&self, deployment_id: &str) -> String {
        if deployment_id.starts_with("projects/") {
            deployment_id.to_string()
        } else {
            format!("{}/reasoningEngines/{deployment_id}", self.parent())
        }
    }

    /// Object URI under the staging bucket.
    #[must_use]
    pub fn staged_uri(&self, object: &str) -> String {
        format!(
            "{}/{}",
            self.staging_bucket.trim_end_matches('/'),
            object.trim_start_matches('/')
        )
    }
}
