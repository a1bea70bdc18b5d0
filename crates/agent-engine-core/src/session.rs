//! Sessions and session-identifier normalization.
//!
//! The service hands sessions back in several shapes depending on the call and
//! the agent app version: a JSON object with an `id`, a bare id string, or an
//! object that only carries its identity under another field. [`SessionRef`]
//! decodes all of these once, at the service boundary, so callers resolve an
//! identifier through a single precedence rule:
//!
//! 1. an object containing an `id` key uses that value;
//! 2. a plain string is the identifier;
//! 3. an object exposing an identifier accessor (`sessionId`, `session_id`,
//!    or a resource `name` ending in `/sessions/{id}`) uses that;
//! 4. anything else is indeterminate.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A remote conversation context scoped to one user and one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default, alias = "appName")]
    pub app_name: Option<String>,
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub state: Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub events: Vec<Value>,
    #[serde(default, alias = "lastUpdateTime")]
    pub last_update_time: Option<f64>,
}

impl Session {
    /// Create a session with only an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            app_name: None,
            user_id: None,
            state: Value::Null,
            events: Vec::new(),
            last_update_time: None,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Typed session handle exposing an identifier accessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource_name: Option<String>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_name: None,
        }
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Full resource name, when the handle was decoded from one.
    #[must_use]
    pub fn resource_name(&self) -> Option<&str> {
        self.resource_name.as_deref()
    }

    fn from_object(map: &Map<String, Value>) -> Option<Self> {
        for key in ["sessionId", "session_id"] {
            if let Some(id) = map.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()) {
                return Some(Self::new(id));
            }
        }

        let name = map.get("name").and_then(Value::as_str)?;
        let (_, id) = name.rsplit_once("/sessions/")?;
        if id.is_empty() || id.contains('/') {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            resource_name: Some(name.to_string()),
        })
    }
}

impl From<&Session> for SessionHandle {
    fn from(session: &Session) -> Self {
        Self::new(session.id.clone())
    }
}

/// A session value of not-yet-known shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum SessionRef {
    /// Object containing an `id` key.
    Mapping(Map<String, Value>),
    /// Plain string that is itself the identifier.
    Bare(String),
    /// Object exposing an identifier accessor.
    Handle(SessionHandle),
    /// No recognizable identifier.
    Unknown(Value),
}

impl SessionRef {
    /// Decode a raw value using the identifier precedence.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key("id") => Self::Mapping(map),
            Value::String(s) => Self::Bare(s),
            Value::Object(map) => match SessionHandle::from_object(&map) {
                Some(handle) => Self::Handle(handle),
                None => Self::Unknown(Value::Object(map)),
            },
            other => Self::Unknown(other),
        }
    }

    /// Resolved session identifier, or `None` when indeterminate.
    ///
    /// Null, empty and non-scalar `id` values do not resolve. Numeric ids are
    /// rendered in decimal.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self {
            Self::Mapping(map) => match map.get("id") {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            },
            Self::Bare(s) if !s.is_empty() => Some(s.clone()),
            Self::Handle(handle) => Some(handle.id().to_string()),
            Self::Bare(_) | Self::Unknown(_) => None,
        }
    }

    /// Short name of the decoded shape, for log lines.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Mapping(_) => "mapping",
            Self::Bare(_) => "string",
            Self::Handle(_) => "object",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Raw JSON form of the value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

impl From<Value> for SessionRef {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl From<SessionRef> for Value {
    fn from(session: SessionRef) -> Self {
        match session {
            SessionRef::Mapping(map) => Self::Object(map),
            SessionRef::Bare(s) => Self::String(s),
            SessionRef::Handle(handle) => match handle.resource_name {
                Some(name) => serde_json::json!({ "name": name }),
                None => serde_json::json!({ "sessionId": handle.id }),
            },
            SessionRef::Unknown(v) => v,
        }
    }
}

impl From<Session> for SessionRef {
    fn from(session: Session) -> Self {
        Self::Handle(SessionHandle::from(&session))
    }
}

impl fmt::Display for SessionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Acknowledgment of a session deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteAck {
    pub session_id: String,
    /// Raw service response; often `null`.
    pub response: Value,
}
