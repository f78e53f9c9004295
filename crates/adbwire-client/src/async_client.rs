//! Tokio flavour of the client operations.
//!
//! Same wire behaviour as the blocking API. Cancellation is dropping the
//! future: the connection goes with it.

use std::collections::VecDeque;
use std::future::poll_fn;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, FramedRead};
use tracing::{debug, info, warn};

use adbwire_frame::{
    decode_length_prefixed, decode_status, decode_sync_reply, encode_request_into,
    encode_sync_header, encode_sync_request, FrameError, LineCodec, Status, SyncPacket,
    SyncPacketCodec, SyncReply, SyncTag, S_IFREG,
};
use adbwire_transport::DaemonAddr;

use crate::config::Context;
use crate::device::{Device, DeviceState};
use crate::error::{ClientError, Result};
use crate::host;
use crate::sync::TransferProgress;

/// One short-lived async connection to the daemon.
#[derive(Debug)]
pub struct AsyncConnection {
    stream: TcpStream,
    buf: BytesMut,
    addr: DaemonAddr,
    max_sync_message: usize,
}

impl AsyncConnection {
    pub async fn open(ctx: &Context) -> Result<Self> {
        let stream = adbwire_transport::connect_async(ctx.addr()).await?;
        Ok(Self {
            stream,
            buf: BytesMut::with_capacity(8 * 1024),
            addr: ctx.addr().clone(),
            max_sync_message: ctx.config().frame.max_sync_message,
        })
    }

    pub fn addr(&self) -> &DaemonAddr {
        &self.addr
    }

    /// Send a host request and wait for its status.
    pub async fn send_request(&mut self, payload: &str) -> Result<()> {
        debug!(request = payload, "sending request");
        let mut frame = BytesMut::new();
        encode_request_into(payload, &mut frame)?;
        self.write_raw(&frame).await?;
        self.read_status().await
    }

    pub async fn read_status(&mut self) -> Result<()> {
        match self.read_with(decode_status).await? {
            Status::Okay => Ok(()),
            Status::Fail(message) => {
                warn!(message = %message, "daemon rejected request");
                Err(ClientError::RemoteRejected(message))
            }
        }
    }

    pub async fn read_response(&mut self) -> Result<String> {
        self.read_with(decode_length_prefixed).await
    }

    pub async fn select_device(&mut self, serial: &str) -> Result<()> {
        self.send_request(&format!("host:transport:{serial}")).await
    }

    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream
            .write_all(bytes)
            .await
            .map_err(FrameError::Io)?;
        Ok(())
    }

    pub async fn read_raw(&mut self, n: usize) -> Result<Bytes> {
        self.read_with(|buf| Ok((buf.len() >= n).then(|| buf.split_to(n).freeze())))
            .await
    }

    /// Hand the rest of the stream over as shell output lines.
    pub fn into_lines(mut self) -> Result<ShellLines> {
        // Output that arrived with the status is decoded up front.
        let mut codec = LineCodec::new();
        let mut pending = VecDeque::new();
        while let Some(line) = codec.decode(&mut self.buf)? {
            pending.push_back(line);
        }
        Ok(ShellLines {
            pending,
            inner: FramedRead::new(self.stream, codec),
        })
    }

    async fn read_with<R, F>(&mut self, mut decode: F) -> Result<R>
    where
        F: FnMut(&mut BytesMut) -> adbwire_frame::Result<Option<R>>,
    {
        loop {
            if let Some(value) = decode(&mut self.buf)? {
                return Ok(value);
            }
            let read = self
                .stream
                .read_buf(&mut self.buf)
                .await
                .map_err(FrameError::Io)?;
            if read == 0 {
                return Err(FrameError::ConnectionClosed.into());
            }
        }
    }
}

/// Output lines of a running shell command.
#[derive(Debug)]
pub struct ShellLines {
    pending: VecDeque<String>,
    inner: FramedRead<TcpStream, LineCodec>,
}

impl Stream for ShellLines {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(line) = this.pending.pop_front() {
            return Poll::Ready(Some(Ok(line)));
        }
        Pin::new(&mut this.inner)
            .poll_next(cx)
            .map(|item| item.map(|line| line.map_err(ClientError::from)))
    }
}

/// Send `host:<command>` and return the length-prefixed response.
pub async fn query(ctx: &Context, command: &str) -> Result<String> {
    let mut conn = AsyncConnection::open(ctx).await?;
    conn.send_request(&format!("host:{command}")).await?;
    conn.read_response().await
}

pub async fn devices(ctx: &Context, filter: Option<DeviceState>) -> Result<Vec<Device>> {
    Ok(host::parse_devices(&query(ctx, "devices").await?, filter))
}

pub async fn version(ctx: &Context) -> Result<u32> {
    host::parse_version(&query(ctx, "version").await?)
}

/// Start `command` on a device and stream its output lines.
pub async fn shell(ctx: &Context, serial: &str, command: &str) -> Result<ShellLines> {
    let mut conn = AsyncConnection::open(ctx).await?;
    conn.select_device(serial).await?;
    conn.send_request(&format!("shell:{command}")).await?;
    debug!(serial, command, "shell session started");
    conn.into_lines()
}

async fn open_sync(ctx: &Context, serial: &str) -> Result<AsyncConnection> {
    let mut conn = AsyncConnection::open(ctx).await?;
    conn.select_device(serial).await?;
    conn.send_request("sync:").await?;
    Ok(conn)
}

/// Upload everything `source` yields to `remote`.
pub async fn push<R, F>(
    ctx: &Context,
    serial: &str,
    mut source: R,
    total: Option<u64>,
    remote: &str,
    permissions: u32,
    mut progress: F,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    F: FnMut(TransferProgress),
{
    let mut conn = open_sync(ctx, serial).await?;
    let mode = S_IFREG | (permissions & 0o7777);

    let mut out = BytesMut::new();
    encode_sync_request(SyncTag::Send, format!("{remote},{mode}").as_bytes(), &mut out)?;
    conn.write_raw(&out).await?;

    let mut chunk = vec![0u8; ctx.config().sync_chunk_size.max(1)];
    let mut transferred = 0u64;
    let mut last_len = 0u32;
    loop {
        let n = source.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        out.clear();
        encode_sync_request(SyncTag::Data, &chunk[..n], &mut out)?;
        conn.write_raw(&out).await.map_err(mid_transfer)?;
        transferred += n as u64;
        last_len = n as u32;
        progress(TransferProgress { total, transferred });
    }

    out.clear();
    encode_sync_header(SyncTag::Done, last_len, &mut out);
    conn.write_raw(&out).await.map_err(mid_transfer)?;

    let max = conn.max_sync_message;
    match conn
        .read_with(|buf| decode_sync_reply(buf, max))
        .await
        .map_err(mid_transfer)?
    {
        SyncReply::Okay => {
            info!(remote, bytes = transferred, "push complete");
            Ok(transferred)
        }
        SyncReply::Fail(message) => Err(ClientError::TransferFailed(message)),
    }
}

/// Download `remote` into `dest`.
pub async fn pull<W, F>(
    ctx: &Context,
    serial: &str,
    remote: &str,
    mut dest: W,
    mut progress: F,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
    F: FnMut(TransferProgress),
{
    let mut conn = open_sync(ctx, serial).await?;
    let mut out = BytesMut::new();
    encode_sync_request(SyncTag::Recv, remote.as_bytes(), &mut out)?;
    conn.write_raw(&out).await?;

    let mut packets = FramedRead::new(conn.stream, SyncPacketCodec::new(conn.max_sync_message));
    *packets.read_buffer_mut() = conn.buf;

    let mut transferred = 0u64;
    loop {
        let packet = poll_fn(|cx| Pin::new(&mut packets).poll_next(cx)).await;
        match packet {
            Some(Ok(SyncPacket::Data(data))) => {
                dest.write_all(&data).await?;
                transferred += data.len() as u64;
                progress(TransferProgress {
                    total: None,
                    transferred,
                });
            }
            Some(Ok(SyncPacket::Done)) => break,
            Some(Ok(SyncPacket::Fail(message))) => return Err(ClientError::TransferFailed(message)),
            Some(Err(err)) => return Err(mid_transfer(err.into())),
            None => return Err(mid_transfer(FrameError::ConnectionClosed.into())),
        }
    }

    dest.flush().await?;
    info!(remote, bytes = transferred, "pull complete");
    Ok(transferred)
}

fn mid_transfer(err: ClientError) -> ClientError {
    match err {
        ClientError::Frame(FrameError::ConnectionClosed) => {
            ClientError::TransferFailed("connection closed mid-transfer".into())
        }
        other => other,
    }
}
