//! Event dispatch client for the leakwire instrumentation engine.
//!
//! The engine streams delimiter-framed text events over a persistent TCP
//! connection. Ordinary events (notifications) fan out to registered
//! handlers; interception events block the engine until the client's
//! interceptor chain produces exactly one reply, which may mutate or veto
//! the event.
//!
//! ```no_run
//! use leakwire_client::Client;
//!
//! let client = Client::new();
//! client.run(|event, payload, stop| {
//!     println!("{event}: {payload:?}");
//!     if event == "GameEnded" {
//!         stop.stop();
//!     }
//! })?;
//! # Ok::<(), leakwire_client::ClientError>(())
//! ```

pub mod client;
pub mod command;
pub mod error;
pub mod event;
pub mod interceptor;
pub mod registry;
pub mod subscribe;

pub use client::{
    Client, ClientConfig, SessionState, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT,
};
pub use command::Command;
pub use error::{ClientError, ProtocolError, Result};
pub use event::{classify, Event, EventPayload, IS_PREFIX_KEY};
pub use interceptor::{Interceptor, InterceptorId, Outcome};
pub use registry::{Handler, HandlerId, StopHandle};
pub use subscribe::Subscriptions;
