use std::time::Duration;

/// Errors surfaced by client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The connect attempt did not complete within the configured timeout.
    #[error("connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// Transport-level connect failure (refused, unreachable, resolution).
    #[error("failed to connect to {addr}: {source} (is the engine running?)")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A send-requiring operation was invoked without a live connection.
    #[error("not connected to the engine (call connect() first)")]
    NotConnected,

    /// A frame violated the wire contract; scoped to that frame only.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Frame-level decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] leakwire_frame::FrameError),

    /// I/O error on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A frame whose body cannot be classified into an event.
///
/// Protocol errors never terminate the connection or disturb the decoder:
/// the offending frame is reported and the stream continues.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame has an event name but no payload text.
    #[error("frame for event {event:?} has no payload")]
    MissingPayload { event: String },

    /// The payload text parsed, but is not a JSON object.
    #[error("payload for event {event:?} is not a JSON object")]
    NotAnObject { event: String },

    /// The payload text failed to parse as JSON.
    #[error("invalid JSON payload for event {event:?}: {source}")]
    InvalidJson {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;
