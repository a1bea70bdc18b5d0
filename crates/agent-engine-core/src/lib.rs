//! Core abstractions for managed agent deployments and sessions.
//!
//! This crate provides the fundamental building blocks:
//! - `AgentEngine` - The remote service boundary (deployments, sessions, streamed queries)
//! - `SessionRef` - Session values normalized to an identifier
//! - `EngineConfig` - Project/region/staging configuration
//! - `RetryPolicy` - Bounded backoff for eventually-consistent reads

pub mod context;
pub mod deployment;
pub mod event;
pub mod retry;
pub mod session;
pub mod traits;

pub use context::EngineConfig;
pub use deployment::{Deployment, DeploymentSpec};
pub use event::AgentEvent;
pub use retry::RetryPolicy;
pub use session::{DeleteAck, Session, SessionRef};
pub use traits::{AgentEngine, EngineError, EventStream};
