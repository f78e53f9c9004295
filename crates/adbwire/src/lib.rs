//! Client for the device-bridge daemon's host protocol.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connection to the daemon and its address
//! - [`frame`]: hex-length request framing, status tokens, sync chunks, line decoding
//! - [`client`]: host commands, shell sessions, file transfer (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use adbwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use adbwire_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use adbwire_client::*;
}
