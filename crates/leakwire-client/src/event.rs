use serde_json::Value;

use crate::error::ProtocolError;

/// Payload key marking a frame as an interception request.
///
/// Extracted and stripped during classification; never visible to
/// interceptors or handlers.
pub const IS_PREFIX_KEY: &str = "__is_prefix";

/// Dynamically-typed event payload: JSON object keys to JSON values.
pub type EventPayload = serde_json::Map<String, Value>;

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name, the first line of the frame.
    pub name: String,
    /// Parsed payload with the reserved prefix key removed.
    pub payload: EventPayload,
    /// True when the engine is blocked awaiting an interception reply.
    pub is_prefix: bool,
}

/// Split a raw frame into an event name and a typed payload.
///
/// The first line is the event name; the remaining lines form one JSON
/// object, which may itself span multiple lines. Failures are scoped to
/// this frame and leave the frame decoder untouched.
pub fn classify(frame: &str) -> Result<Event, ProtocolError> {
    let text = frame.trim();
    let (name, body) = match text.split_once('\n') {
        Some((name, body)) => (name.trim_end(), body),
        None => (text, ""),
    };

    if body.trim().is_empty() {
        return Err(ProtocolError::MissingPayload {
            event: name.to_string(),
        });
    }

    let value: Value =
        serde_json::from_str(body).map_err(|source| ProtocolError::InvalidJson {
            event: name.to_string(),
            source,
        })?;
    let Value::Object(mut payload) = value else {
        return Err(ProtocolError::NotAnObject {
            event: name.to_string(),
        });
    };

    let is_prefix = payload
        .remove(IS_PREFIX_KEY)
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    Ok(Event {
        name: name.to_string(),
        payload,
        is_prefix,
    })
}
