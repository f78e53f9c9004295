use adbwire_frame::FrameError;
use adbwire_transport::{DaemonAddr, TransportError};

/// Errors that can occur in client operations.
///
/// Nothing is retried: every failure reaches the caller, carrying the
/// daemon's own message where it sent one.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The daemon could not be reached.
    #[error("daemon unreachable at {addr}: {source}")]
    ConnectionRefused {
        addr: DaemonAddr,
        source: std::io::Error,
    },

    /// The daemon answered a host request with `FAIL`.
    #[error("daemon rejected request: {0}")]
    RemoteRejected(String),

    /// Unexpected bytes where a known status, tag or length was expected.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Sync-level `FAIL`, or the stream ended in the middle of a transfer.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// A request payload does not fit its length field.
    #[error("payload too large for length field ({size} bytes, max {max})")]
    Encoding { size: usize, max: usize },

    /// The connection was closed through its close handle.
    #[error("operation cancelled")]
    Cancelled,

    /// Socket-level failure while talking to the daemon.
    #[error("connection error: {0}")]
    Frame(FrameError),

    /// Transport setup failure other than an unreachable daemon.
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FrameError> for ClientError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::PayloadTooLarge { size, max } => ClientError::Encoding { size, max },
            FrameError::MessageTooLarge { .. }
            | FrameError::InvalidLength(_)
            | FrameError::UnexpectedStatus(_)
            | FrameError::UnexpectedSyncTag(_)
            | FrameError::InvalidUtf8(_) => ClientError::ProtocolViolation(err.to_string()),
            FrameError::Io(_) | FrameError::ConnectionClosed => ClientError::Frame(err),
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect { addr, source } => {
                ClientError::ConnectionRefused { addr, source }
            }
            other => ClientError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
