use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::addr::DaemonAddr;
use crate::error::Result;

/// A connected daemon stream. Implements Read + Write.
///
/// One `DaemonStream` backs exactly one logical operation. Reader and writer
/// halves are obtained with [`DaemonStream::try_clone`].
pub struct DaemonStream {
    inner: TcpStream,
    addr: DaemonAddr,
}

impl Read for DaemonStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for DaemonStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl DaemonStream {
    pub(crate) fn from_tcp(inner: TcpStream, addr: DaemonAddr) -> Self {
        Self { inner, addr }
    }

    /// The daemon address this stream is connected to.
    pub fn addr(&self) -> &DaemonAddr {
        &self.addr
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            inner: self.inner.try_clone()?,
            addr: self.addr.clone(),
        })
    }

    /// Create a handle that can close this stream from another thread.
    pub fn close_handle(&self) -> Result<CloseHandle> {
        Ok(CloseHandle {
            socket: Arc::new(self.inner.try_clone()?),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Shut down both directions. Already-closed sockets are not an error.
    pub fn shutdown(&self) -> Result<()> {
        shutdown_quietly(&self.inner).map_err(Into::into)
    }
}

impl std::fmt::Debug for DaemonStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonStream")
            .field("addr", &self.addr)
            .finish()
    }
}

/// Closes a connection from outside the thread that is using it.
///
/// Closing shuts the socket down in both directions, which wakes any read or
/// write blocked on it. The owner checks [`CloseHandle::is_closed`] to tell a
/// cancellation apart from the daemon hanging up.
#[derive(Clone)]
pub struct CloseHandle {
    socket: Arc<TcpStream>,
    closed: Arc<AtomicBool>,
}

impl CloseHandle {
    /// Close the connection. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("closing daemon connection on request");
        if let Err(err) = shutdown_quietly(&self.socket) {
            debug!(error = %err, "close handle shutdown failed");
        }
    }

    /// Whether [`CloseHandle::close`] has been called on any clone.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CloseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn shutdown_quietly(stream: &TcpStream) -> std::io::Result<()> {
    match stream.shutdown(Shutdown::Both) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
        Err(err) => Err(err),
    }
}
