use bytes::Bytes;
use tracing::{debug, warn};

use adbwire_frame::{FrameError, FrameReader, FrameWriter, Status};
use adbwire_transport::{CloseHandle, DaemonAddr, DaemonStream};

use crate::config::Context;
use crate::error::{ClientError, Result};

/// One short-lived connection to the daemon.
///
/// A connection carries exactly one logical operation. Dropping it shuts the
/// socket down, on success and failure paths alike.
pub struct Connection {
    reader: FrameReader<DaemonStream>,
    writer: FrameWriter<DaemonStream>,
    close: CloseHandle,
    released: bool,
}

impl Connection {
    /// Connect to the daemon named by `ctx`.
    pub fn open(ctx: &Context) -> Result<Self> {
        let stream = adbwire_transport::connect(ctx.addr())?;
        let reader_stream = stream.try_clone()?;
        let close = stream.close_handle()?;

        Ok(Self {
            reader: FrameReader::with_config(reader_stream, ctx.config().frame.clone()),
            writer: FrameWriter::new(stream),
            close,
            released: false,
        })
    }

    /// The daemon address this connection talks to.
    pub fn addr(&self) -> &DaemonAddr {
        self.writer.get_ref().addr()
    }

    /// Send a host request and wait for its status.
    ///
    /// A `FAIL` status becomes [`ClientError::RemoteRejected`] carrying the
    /// daemon's message.
    pub fn send_request(&mut self, payload: &str) -> Result<()> {
        debug!(request = payload, "sending request");
        self.writer
            .send_request(payload)
            .map_err(|err| self.fail(err))?;
        self.read_status()
    }

    /// Read one more `OKAY` / `FAIL` status.
    pub fn read_status(&mut self) -> Result<()> {
        match self.reader.read_status().map_err(|err| self.fail(err))? {
            Status::Okay => Ok(()),
            Status::Fail(message) => {
                warn!(message = %message, "daemon rejected request");
                Err(ClientError::RemoteRejected(message))
            }
        }
    }

    /// Read a hex length-prefixed response payload.
    pub fn read_response(&mut self) -> Result<String> {
        self.reader
            .read_length_prefixed()
            .map_err(|err| self.fail(err))
    }

    /// Route the rest of this connection to one device.
    pub fn select_device(&mut self, serial: &str) -> Result<()> {
        self.send_request(&format!("host:transport:{serial}"))
    }

    /// Write bytes without framing.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_raw(bytes).map_err(|err| self.fail(err))
    }

    /// Read exactly `n` bytes without framing.
    pub fn read_raw(&mut self, n: usize) -> Result<Bytes> {
        self.reader
            .read_exact_bytes(n)
            .map_err(|err| self.fail(err))
    }

    /// Read whatever arrives next; `None` once the daemon closes the stream.
    pub fn read_chunk(&mut self) -> Result<Option<Bytes>> {
        let chunk = self.reader.read_chunk().map_err(|err| self.fail(err))?;
        if chunk.is_none() && self.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        Ok(chunk)
    }

    /// Handle that closes this connection from another thread.
    ///
    /// Whatever the owner is blocked on then fails with
    /// [`ClientError::Cancelled`].
    pub fn close_handle(&self) -> CloseHandle {
        self.close.clone()
    }

    /// Whether the connection was closed through its close handle.
    pub fn is_cancelled(&self) -> bool {
        self.close.is_closed()
    }

    /// Shut the connection down.
    pub fn close(mut self) {
        self.release();
    }

    pub(crate) fn reader_mut(&mut self) -> &mut FrameReader<DaemonStream> {
        &mut self.reader
    }

    pub(crate) fn writer_mut(&mut self) -> &mut FrameWriter<DaemonStream> {
        &mut self.writer
    }

    /// Convert a frame error, reporting cancellation when the close handle fired.
    pub(crate) fn fail(&self, err: impl Into<ClientError>) -> ClientError {
        if self.is_cancelled() {
            ClientError::Cancelled
        } else {
            err.into()
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.writer.get_ref().shutdown() {
            debug!(error = %err, "connection shutdown failed");
        }
        debug!(addr = %self.addr(), "connection released");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("addr", self.addr())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Open a connection, run `body` against it, then release it.
///
/// The connection is shut down whether `body` succeeds or fails.
pub fn with_connection<T, F>(ctx: &Context, body: F) -> Result<T>
where
    F: FnOnce(&mut Connection) -> Result<T>,
{
    let mut conn = Connection::open(ctx)?;
    let result = body(&mut conn);
    conn.close();
    result
}

/// Errors from the middle of a file transfer.
///
/// The stream ending before the transfer completes is a transfer failure
/// rather than a plain connection error.
pub(crate) fn transfer_error(conn: &Connection, err: FrameError) -> ClientError {
    match err {
        FrameError::ConnectionClosed if !conn.is_cancelled() => {
            ClientError::TransferFailed("connection closed mid-transfer".into())
        }
        other => conn.fail(other),
    }
}
