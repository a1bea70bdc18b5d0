//! REST transport for managed agent engines.
//!
//! Provides:
//! - Wire protocol (reasoning engine resources, class-method queries)
//! - `RestEngine` - `AgentEngine` over HTTP
//! - Line-delimited event stream decoding

pub mod client;
pub mod protocol;
pub mod rest;
pub mod stream;

pub use client::{HttpClientConfig, create_client};
pub use rest::RestEngine;
pub use stream::{LineDecoder, decode_events};
