/// Errors that can occur while decoding the delimited frame stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The accumulation buffer grew past the configured cap without
    /// reaching a delimiter.
    #[error("frame too large ({size} bytes buffered, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A complete frame's bytes are not valid UTF-8.
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
