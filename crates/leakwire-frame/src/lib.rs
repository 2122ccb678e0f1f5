//! Delimiter-based text framing for the leakwire event stream.
//!
//! The instrumentation engine separates frames with a literal `---` line.
//! [`FrameBuffer`] turns arbitrarily chunked incoming bytes into complete
//! text frames, so callers never see partial reads. A
//! delimiter (or a multibyte UTF-8 sequence) may arrive split across any
//! chunk boundary without frame loss or duplication.

pub mod buffer;
pub mod error;

pub use buffer::{FrameBuffer, DELIMITER};
pub use error::{FrameError, Result};
