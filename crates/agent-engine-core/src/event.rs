//! Streamed response events.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of streamed output produced while processing a message.
///
/// The payload is opaque; accessors only peek at the common fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentEvent(pub Value);

impl AgentEvent {
    /// Wrap a raw event payload.
    #[must_use]
    pub const fn new(raw: Value) -> Self {
        Self(raw)
    }

    /// Raw event payload.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.0
    }

    /// Name of the agent that produced the event, if present.
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.0.get("author").and_then(Value::as_str)
    }

    /// Concatenated text parts of the event content, if any.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let parts = self.0.get("content")?.get("parts")?.as_array()?;
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

impl From<Value> for AgentEvent {
    fn from(raw: Value) -> Self {
        Self(raw)
    }
}

impl fmt::Display for AgentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_joins_parts() {
        let event = AgentEvent::new(json!({
            "author": "social_posts_agent",
            "content": {"role": "model", "parts": [{"text": "Oat"}, {"function_call": {}}, {"text": "milk"}]}
        }));
        assert_eq!(event.author(), Some("social_posts_agent"));
        assert_eq!(event.text().as_deref(), Some("Oatmilk"));
    }

    #[test]
    fn test_text_absent() {
        let event = AgentEvent::new(json!({"actions": {}}));
        assert!(event.text().is_none());
        assert!(event.author().is_none());
    }
}
