use serde::Serialize;
use serde_json::Value;

use crate::event::EventPayload;

/// Outbound wire commands. ASCII text, no trailing frame delimiter.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask the engine to begin streaming notifications.
    Start,
    /// Ask the engine to stop streaming notifications.
    Stop,
    /// Reply to a pending interception. `None` params vetoes the event.
    InterceptionResult {
        event: String,
        params: Option<EventPayload>,
    },
}

#[derive(Serialize)]
struct Reply<'a> {
    event: &'a str,
    params: Option<ReplyParams>,
}

#[derive(Serialize)]
struct ReplyParams {
    entries: Vec<ReplyEntry>,
}

#[derive(Serialize)]
struct ReplyEntry {
    key: String,
    value: String,
}

impl Command {
    /// Encode the command into its wire text.
    pub fn encode(&self) -> String {
        match self {
            Command::Start => "START".to_string(),
            Command::Stop => "STOP".to_string(),
            Command::InterceptionResult { event, params } => {
                let reply = Reply {
                    event,
                    params: params.as_ref().map(|payload| ReplyParams {
                        entries: payload
                            .iter()
                            .map(|(key, value)| ReplyEntry {
                                key: key.clone(),
                                value: stringify(value),
                            })
                            .collect(),
                    }),
                };
                // Serializing strings into strings cannot fail.
                let json = serde_json::to_string(&reply).unwrap_or_default();
                format!("INTERCEPTION_RESULT:{json}")
            }
        }
    }
}

/// The engine consumes every interception value as a string, whatever its
/// original JSON type. Strings pass through verbatim; everything else
/// becomes its JSON text.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
