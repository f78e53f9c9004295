use tokio::net::TcpStream;
use tracing::debug;

use crate::addr::DaemonAddr;
use crate::error::{Result, TransportError};

/// Connect to the daemon on the current tokio runtime.
pub async fn connect_async(addr: &DaemonAddr) -> Result<TcpStream> {
    let stream = TcpStream::connect((addr.host.as_str(), addr.port))
        .await
        .map_err(|e| TransportError::Connect {
            addr: addr.clone(),
            source: e,
        })?;
    stream.set_nodelay(true)?;
    debug!(%addr, "connected to daemon (async)");
    Ok(stream)
}
