use std::fmt;
use std::io;

use adbwire_client::ClientError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;
/// 128 + SIGINT, as shells report an interrupted command.
pub const CANCELLED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(FAILURE, format!("{context}: {err}"))
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    let code = match &err {
        ClientError::ConnectionRefused { .. }
        | ClientError::Transport(_)
        | ClientError::Frame(_) => TRANSPORT_ERROR,
        ClientError::RemoteRejected(_) | ClientError::TransferFailed(_) | ClientError::Io(_) => {
            FAILURE
        }
        ClientError::ProtocolViolation(_) => DATA_INVALID,
        ClientError::Encoding { .. } => USAGE,
        ClientError::Cancelled => CANCELLED,
    };
    CliError::new(code, format!("{context}: {err}"))
}
