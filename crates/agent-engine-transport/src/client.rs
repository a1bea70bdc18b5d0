//! Shared HTTP client utilities

use std::time::Duration;

use agent_engine_core::EngineError;
use reqwest::{Client, ClientBuilder};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds.
    /// Applies to the entire request, streamed query responses included.
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Maximum number of idle connections per host
    pub pool_max_idle_per_host: usize,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            // Agent turns with tool calls can stream for minutes.
            timeout_secs: 600,
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 8,
            user_agent: format!("agent-engine/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a configured HTTP client
///
/// # Errors
/// Returns `EngineError::Config` if the client cannot be built.
pub fn create_client(config: &HttpClientConfig) -> Result<Client, EngineError> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        // Expire idle connections before the server closes them
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {e}")))
}
