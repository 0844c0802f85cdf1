//! The notification event pushed from server to admin clients.
//!
//! One [`Event`] is serialized as one JSON document per WebSocket text frame:
//!
//! ```json
//! { "type": "lead.created", "data": { "id": "L1" }, "message": "New lead" }
//! ```
//!
//! `data` and `message` are omitted from the wire when absent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A lead was submitted through the public site.
pub const LEAD_CREATED: &str = "lead.created";
/// A contact form message arrived.
pub const CONTACT_CREATED: &str = "contact.created";
/// A verification lookup was recorded.
pub const VERIFICATION_RECORDED: &str = "verification.recorded";
/// Application-level keepalive.
pub const PING: &str = "ping";
/// First frame sent by the server after a connection is attached.
pub const CONNECTION_ESTABLISHED: &str = "connection.established";

/// Typed, immutable notification payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type tag (e.g. `lead.created`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Type-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Optional human-readable summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Event {
    /// Build an event with only a type tag.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: None,
            message: None,
        }
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a human-readable summary.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Parse one wire frame.
    pub fn from_frame(frame: &str) -> serde_json::Result<Self> {
        serde_json::from_str(frame)
    }

    /// Serialize to one wire frame.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
