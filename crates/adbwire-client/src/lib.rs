//! Client for the device-bridge daemon's host protocol.
//!
//! Every operation takes a [`Context`] naming the daemon, opens its own
//! connection, and releases it before returning. Host queries live in
//! [`host`], shell streaming in [`shell`], and file transfer in [`sync`].

pub mod config;
pub mod connection;
pub mod device;
pub mod error;
pub mod host;
pub mod shell;
pub mod sync;

#[cfg(feature = "async")]
pub mod async_client;

#[cfg(test)]
mod testing;

pub use adbwire_frame::{DirEntry, FileStat};
pub use adbwire_transport::{CloseHandle, DaemonAddr};
pub use config::{ClientConfig, Context, DEFAULT_SYNC_CHUNK_SIZE};
pub use connection::{with_connection, Connection};
pub use device::{parse_properties, props, Device, DeviceState};
pub use error::{ClientError, Result};
pub use host::ForwardMap;
pub use shell::ShellSession;
pub use sync::{SyncSession, TransferProgress};

#[cfg(feature = "async")]
pub use async_client::{AsyncConnection, ShellLines};
