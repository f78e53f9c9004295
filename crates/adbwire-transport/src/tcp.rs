use std::net::TcpStream;

use tracing::debug;

use crate::addr::DaemonAddr;
use crate::error::{Result, TransportError};
use crate::stream::DaemonStream;

/// Connect to the daemon (blocking).
pub fn connect(addr: &DaemonAddr) -> Result<DaemonStream> {
    let stream =
        TcpStream::connect((addr.host.as_str(), addr.port)).map_err(|e| TransportError::Connect {
            addr: addr.clone(),
            source: e,
        })?;
    // Requests are tiny and each waits for a reply.
    stream.set_nodelay(true)?;
    debug!(%addr, "connected to daemon");
    Ok(DaemonStream::from_tcp(stream, addr.clone()))
}
