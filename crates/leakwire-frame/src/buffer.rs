use bytes::{Buf, BytesMut};

use crate::error::{FrameError, Result};

/// Frame delimiter: a literal `---` line.
pub const DELIMITER: &[u8] = b"---\n";

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Accumulates incoming byte chunks and yields delimiter-terminated frames.
///
/// Frames are yielded in the order their delimiters appear in the stream.
/// The buffer is unbounded unless a cap is configured with
/// [`FrameBuffer::with_max_frame_size`]; with a cap, [`FrameBuffer::push`]
/// fails fast once more bytes are buffered ahead of the next delimiter than
/// the cap allows.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    max_frame_size: Option<usize>,
}

impl FrameBuffer {
    /// Create an unbounded frame buffer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_frame_size: None,
        }
    }

    /// Create a frame buffer that rejects frames larger than `max` bytes.
    pub fn with_max_frame_size(max: usize) -> Self {
        Self {
            max_frame_size: Some(max),
            ..Self::new()
        }
    }

    /// Append a chunk of incoming bytes.
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(chunk);
        if let Some(max) = self.max_frame_size {
            if self.buf.len() > max && find_delimiter(&self.buf).is_none() {
                return Err(FrameError::FrameTooLarge {
                    size: self.buf.len(),
                    max,
                });
            }
        }
        Ok(())
    }

    /// Drain the next complete frame, if one is buffered.
    ///
    /// Returns the text before the delimiter and advances past it. A frame
    /// holding invalid UTF-8 is consumed and reported without disturbing
    /// the position of subsequent frames.
    pub fn next_frame(&mut self) -> Option<Result<String>> {
        let at = find_delimiter(&self.buf)?;
        let frame = self.buf.split_to(at);
        self.buf.advance(DELIMITER.len());
        tracing::trace!(bytes = frame.len(), "frame drained");
        Some(String::from_utf8(frame.to_vec()).map_err(FrameError::from))
    }

    /// Number of bytes buffered ahead of the next delimiter.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(DELIMITER.len()).position(|w| w == DELIMITER)
}
