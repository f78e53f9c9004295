use crate::addr::DaemonAddr;

/// Errors that can occur in daemon transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the daemon.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: DaemonAddr,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A daemon address could not be parsed.
    #[error("invalid daemon address '{input}': {reason}")]
    InvalidAddress { input: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, TransportError>;
