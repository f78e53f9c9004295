//! TCP transport to a local device-bridge daemon.
//!
//! The daemon listens on a loopback TCP port (5037 by default) and every
//! client operation opens its own short-lived connection. This is the lowest
//! layer of adbwire: everything else builds on [`DaemonStream`].

pub mod addr;
pub mod error;
pub mod stream;
pub mod tcp;

#[cfg(feature = "async")]
pub mod async_tcp;

pub use addr::{DaemonAddr, DEFAULT_HOST, DEFAULT_PORT, ENV_SERVER_ADDRESS, ENV_SERVER_PORT};
pub use error::{Result, TransportError};
pub use stream::{CloseHandle, DaemonStream};
pub use tcp::connect;

#[cfg(feature = "async")]
pub use async_tcp::connect_async;
