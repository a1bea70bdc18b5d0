//! Deployment, session and cleanup orchestration for managed agents.
//!
//! Provides:
//! - `DeploymentDirectory` - Enumerate, create and delete deployments
//! - `SessionManager` - Per-user session lifecycle and batch cleanup
//! - `MessageDispatcher` - Send a message and collect the streamed events
//! - Engine implementations (memory)
//!
//! Every operation comes in two forms: a `try_*` method returning the error,
//! and a total method that logs the error and returns an empty value.

pub mod cleanup;
pub mod directory;
pub mod dispatcher;
pub mod engine;
pub mod manager;

pub use cleanup::{CleanupError, CleanupReport};
pub use directory::DeploymentDirectory;
pub use dispatcher::MessageDispatcher;
pub use manager::SessionManager;
