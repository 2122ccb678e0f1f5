//! Client-side bridge to the leakwire instrumentation engine.
//!
//! The engine streams delimiter-framed JSON events over TCP; interception
//! frames block the engine until the client replies, letting application
//! code observe, transform, or veto events in flight.
//!
//! # Crate Structure
//!
//! - [`frame`] — delimiter framing for the inbound byte stream
//! - [`client`] — event classification, interceptor chain, handler
//!   registry, and the session controller

/// Re-export frame types.
pub mod frame {
    pub use leakwire_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use leakwire_client::*;
}
