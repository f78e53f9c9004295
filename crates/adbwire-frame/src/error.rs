/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The daemon announced a sync message longer than the configured cap.
    #[error("sync message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// A 4-character length prefix was not hexadecimal.
    #[error("invalid hex length prefix {0:?}")]
    InvalidLength(String),

    /// Expected `OKAY` or `FAIL`, got something else.
    #[error("unexpected status token {0:?}")]
    UnexpectedStatus(String),

    /// A sync chunk carried a tag that is not valid at this point.
    #[error("unexpected sync tag {0:?}")]
    UnexpectedSyncTag(String),

    /// A length-prefixed response was not valid UTF-8.
    #[error("response is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// Render a 4-byte token for error messages without assuming it is text.
pub(crate) fn token_text(token: &[u8]) -> String {
    String::from_utf8_lossy(token).into_owned()
}
