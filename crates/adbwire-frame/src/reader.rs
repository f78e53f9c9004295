use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::codec::{decode_length_prefixed, FrameConfig};
use crate::error::{FrameError, Result};
use crate::status::{decode_status, Status};
use crate::sync::{
    decode_list_item, decode_stat, decode_sync_packet, decode_sync_reply, FileStat, ListItem,
    SyncPacket, SyncReply,
};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete protocol units from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete status
/// frames, responses and sync chunks. Bytes read past the end of one unit stay
/// buffered for the next.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read an `OKAY` / `FAIL` status frame.
    pub fn read_status(&mut self) -> Result<Status> {
        self.read_with(decode_status)
    }

    /// Read one hex length-prefixed UTF-8 payload.
    pub fn read_length_prefixed(&mut self) -> Result<String> {
        self.read_with(decode_length_prefixed)
    }

    /// Read exactly `n` bytes.
    pub fn read_exact_bytes(&mut self, n: usize) -> Result<Bytes> {
        self.read_with(|buf| Ok((buf.len() >= n).then(|| buf.split_to(n).freeze())))
    }

    /// Read one chunk of a `RECV` stream.
    pub fn read_sync_packet(&mut self) -> Result<SyncPacket> {
        let max = self.config.max_sync_message;
        self.read_with(|buf| decode_sync_packet(buf, max))
    }

    /// Read the daemon's answer to a `SEND`.
    pub fn read_sync_reply(&mut self) -> Result<SyncReply> {
        let max = self.config.max_sync_message;
        self.read_with(|buf| decode_sync_reply(buf, max))
    }

    /// Read a `STAT` reply.
    pub fn read_stat(&mut self) -> Result<FileStat> {
        self.read_with(decode_stat)
    }

    /// Read one record of a `LIST` reply.
    pub fn read_list_item(&mut self) -> Result<ListItem> {
        let max = self.config.max_sync_message;
        self.read_with(|buf| decode_list_item(buf, max))
    }

    /// Read whatever arrives next, without framing.
    ///
    /// Buffered bytes are returned first. Returns `Ok(None)` at end of stream.
    pub fn read_chunk(&mut self) -> Result<Option<Bytes>> {
        if !self.buf.is_empty() {
            return Ok(Some(self.buf.split().freeze()));
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Ok(None),
                Ok(n) => return Ok(Some(Bytes::copy_from_slice(&chunk[..n]))),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Run `decode` against the buffer, reading more until it yields a value.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached first.
    fn read_with<R, F>(&mut self, mut decode: F) -> Result<R>
    where
        F: FnMut(&mut BytesMut) -> Result<Option<R>>,
    {
        loop {
            if let Some(value) = decode(&mut self.buf)? {
                return Ok(value);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes received but not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader, returning the stream and any unconsumed bytes.
    pub fn into_parts(self) -> (T, BytesMut) {
        (self.inner, self.buf)
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
