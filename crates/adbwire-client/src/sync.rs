//! File transfer and remote file queries over the sync sub-protocol.
//!
//! A sync session is entered by routing a connection to a device and sending
//! `sync:`. From then on the stream carries tagged binary chunks with
//! little-endian lengths instead of hex-framed requests.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use adbwire_frame::{DirEntry, FileStat, ListItem, SyncPacket, SyncReply, SyncTag, S_IFREG};
use adbwire_transport::CloseHandle;
use tracing::{debug, info, warn};

use crate::config::Context;
use crate::connection::{transfer_error, Connection};
use crate::error::{ClientError, Result};

/// Permission bits used when the local file's own cannot be read.
pub const DEFAULT_PERMISSIONS: u32 = 0o644;

/// Progress of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Total bytes expected, when known up front.
    pub total: Option<u64>,
    /// Bytes moved so far.
    pub transferred: u64,
}

/// A connection switched into sync mode for one device.
#[derive(Debug)]
pub struct SyncSession {
    conn: Connection,
    chunk_size: usize,
}

impl SyncSession {
    pub fn open(ctx: &Context, serial: &str) -> Result<Self> {
        let mut conn = Connection::open(ctx)?;
        conn.select_device(serial)?;
        conn.send_request("sync:")?;
        debug!(serial, "sync session started");

        Ok(Self {
            conn,
            chunk_size: ctx.config().sync_chunk_size.max(1),
        })
    }

    /// Handle that aborts the session from another thread.
    pub fn close_handle(&self) -> CloseHandle {
        self.conn.close_handle()
    }

    /// Upload everything `source` yields to `remote`.
    ///
    /// The remote file mode is the regular-file type bit combined with
    /// `permissions`. `total` is only used for progress reports.
    pub fn push_from<R, F>(
        &mut self,
        mut source: R,
        total: Option<u64>,
        remote: &str,
        permissions: u32,
        mut progress: F,
    ) -> Result<u64>
    where
        R: Read,
        F: FnMut(TransferProgress),
    {
        let mode = S_IFREG | (permissions & 0o7777);
        let header = format!("{remote},{mode}");
        self.send(SyncTag::Send, header.as_bytes())?;

        let mut chunk = vec![0u8; self.chunk_size];
        let mut transferred = 0u64;
        let mut last_len = 0u32;
        loop {
            let n = match source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ClientError::Io(err)),
            };
            self.conn
                .writer_mut()
                .send_data(&chunk[..n])
                .map_err(|err| transfer_error(&self.conn, err))?;
            transferred += n as u64;
            last_len = n as u32;
            progress(TransferProgress { total, transferred });
        }

        // DONE carries the length of the final chunk, not a timestamp.
        self.conn
            .writer_mut()
            .send_done(last_len)
            .map_err(|err| transfer_error(&self.conn, err))?;

        let reply = self
            .conn
            .reader_mut()
            .read_sync_reply()
            .map_err(|err| transfer_error(&self.conn, err))?;
        match reply {
            SyncReply::Okay => {
                info!(remote, bytes = transferred, "push complete");
                Ok(transferred)
            }
            SyncReply::Fail(message) => {
                warn!(remote, message = %message, "push rejected");
                Err(ClientError::TransferFailed(message))
            }
        }
    }

    /// Download `remote` into `dest`.
    pub fn pull_into<W, F>(&mut self, remote: &str, mut dest: W, mut progress: F) -> Result<u64>
    where
        W: Write,
        F: FnMut(TransferProgress),
    {
        self.send(SyncTag::Recv, remote.as_bytes())?;

        let mut transferred = 0u64;
        loop {
            let packet = self
                .conn
                .reader_mut()
                .read_sync_packet()
                .map_err(|err| transfer_error(&self.conn, err))?;
            match packet {
                SyncPacket::Data(data) => {
                    dest.write_all(&data)?;
                    transferred += data.len() as u64;
                    progress(TransferProgress {
                        total: None,
                        transferred,
                    });
                }
                SyncPacket::Done => break,
                SyncPacket::Fail(message) => {
                    warn!(remote, message = %message, "pull rejected");
                    return Err(ClientError::TransferFailed(message));
                }
            }
        }

        dest.flush()?;
        info!(remote, bytes = transferred, "pull complete");
        Ok(transferred)
    }

    /// Metadata of `remote`. Missing paths report all-zero metadata.
    pub fn stat(&mut self, remote: &str) -> Result<FileStat> {
        self.send(SyncTag::Stat, remote.as_bytes())?;
        self.conn
            .reader_mut()
            .read_stat()
            .map_err(|err| self.conn.fail(err))
    }

    /// Entries of the remote directory `remote`.
    pub fn list(&mut self, remote: &str) -> Result<Vec<DirEntry>> {
        self.send(SyncTag::List, remote.as_bytes())?;

        let mut entries = Vec::new();
        loop {
            let item = self
                .conn
                .reader_mut()
                .read_list_item()
                .map_err(|err| self.conn.fail(err))?;
            match item {
                ListItem::Entry(entry) => entries.push(entry),
                ListItem::Done => return Ok(entries),
                ListItem::Fail(message) => return Err(ClientError::TransferFailed(message)),
            }
        }
    }

    fn send(&mut self, tag: SyncTag, payload: &[u8]) -> Result<()> {
        debug!(%tag, len = payload.len(), "sync request");
        self.conn
            .writer_mut()
            .send_sync_request(tag, payload)
            .map_err(|err| self.conn.fail(err))
    }
}

/// Upload the local file `local` to `remote` with `permissions`.
///
/// Returns the number of bytes sent.
pub fn push<F>(
    ctx: &Context,
    serial: &str,
    local: &Path,
    remote: &str,
    permissions: u32,
    progress: F,
) -> Result<u64>
where
    F: FnMut(TransferProgress),
{
    let file = File::open(local)?;
    let total = file.metadata()?.len();
    SyncSession::open(ctx, serial)?.push_from(file, Some(total), remote, permissions, progress)
}

/// Download `remote` into the local file `local`.
///
/// A partially written file is removed if the transfer fails.
pub fn pull<F>(ctx: &Context, serial: &str, remote: &str, local: &Path, progress: F) -> Result<u64>
where
    F: FnMut(TransferProgress),
{
    let mut session = SyncSession::open(ctx, serial)?;
    let file = File::create(local)?;
    let result = session.pull_into(remote, BufWriter::new(file), progress);
    if result.is_err() {
        if let Err(err) = std::fs::remove_file(local) {
            debug!(path = %local.display(), error = %err, "could not remove partial file");
        }
    }
    result
}

/// Download `remote` into any writer.
pub fn pull_into<W, F>(ctx: &Context, serial: &str, remote: &str, dest: W, progress: F) -> Result<u64>
where
    W: Write,
    F: FnMut(TransferProgress),
{
    SyncSession::open(ctx, serial)?.pull_into(remote, dest, progress)
}

pub fn stat(ctx: &Context, serial: &str, remote: &str) -> Result<FileStat> {
    SyncSession::open(ctx, serial)?.stat(remote)
}

pub fn list(ctx: &Context, serial: &str, remote: &str) -> Result<Vec<DirEntry>> {
    SyncSession::open(ctx, serial)?.list(remote)
}

/// Permission bits of a local file, for use as the remote file's.
pub fn local_permissions(metadata: &std::fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o7777
    }
    #[cfg(not(unix))]
    {
        let _ = metadata;
        DEFAULT_PERMISSIONS
    }
}
