//! The binary sync sub-protocol used for file transfer.
//!
//! Every chunk starts with a 4-byte ASCII tag and a 4-byte little-endian
//! length; the meaning of the length depends on the tag.
//!
//! ```text
//! ┌───────────┬──────────────┬─────────────────────┐
//! │ Tag (4B)  │ Length (4B)  │ Payload             │
//! │ ASCII     │ u32 LE       │ (Length bytes)      │
//! └───────────┴──────────────┴─────────────────────┘
//! ```

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{token_text, FrameError, Result};

/// Tag (4) + little-endian length (4).
pub const SYNC_HEADER_SIZE: usize = 8;

/// STAT reply body: mode, size, mtime.
const STAT_BODY_SIZE: usize = 12;

/// DENT record body before the name: mode, size, mtime, name length.
const DENT_BODY_SIZE: usize = 16;

/// Bit mask for the file type bit fields.
pub const S_IFMT: u32 = 0o170000;
/// Socket.
pub const S_IFSOCK: u32 = 0o140000;
/// Symbolic link.
pub const S_IFLNK: u32 = 0o120000;
/// Regular file.
pub const S_IFREG: u32 = 0o100000;
/// Block device.
pub const S_IFBLK: u32 = 0o060000;
/// Directory.
pub const S_IFDIR: u32 = 0o040000;
/// Character device.
pub const S_IFCHR: u32 = 0o020000;
/// FIFO.
pub const S_IFIFO: u32 = 0o010000;

/// Sync chunk tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTag {
    Send,
    Recv,
    Data,
    Done,
    Okay,
    Fail,
    Stat,
    List,
    Dent,
    Quit,
}

impl SyncTag {
    /// The 4 ASCII bytes written on the wire.
    pub fn as_bytes(self) -> &'static [u8; 4] {
        match self {
            SyncTag::Send => b"SEND",
            SyncTag::Recv => b"RECV",
            SyncTag::Data => b"DATA",
            SyncTag::Done => b"DONE",
            SyncTag::Okay => b"OKAY",
            SyncTag::Fail => b"FAIL",
            SyncTag::Stat => b"STAT",
            SyncTag::List => b"LIST",
            SyncTag::Dent => b"DENT",
            SyncTag::Quit => b"QUIT",
        }
    }

    /// Look up a tag from its wire bytes.
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        Some(match raw {
            b"SEND" => SyncTag::Send,
            b"RECV" => SyncTag::Recv,
            b"DATA" => SyncTag::Data,
            b"DONE" => SyncTag::Done,
            b"OKAY" => SyncTag::Okay,
            b"FAIL" => SyncTag::Fail,
            b"STAT" => SyncTag::Stat,
            b"LIST" => SyncTag::List,
            b"DENT" => SyncTag::Dent,
            b"QUIT" => SyncTag::Quit,
            _ => return None,
        })
    }
}

impl fmt::Display for SyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&token_text(self.as_bytes()))
    }
}

/// One unit of a `RECV` response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPacket {
    Data(Bytes),
    Done,
    Fail(String),
}

/// Final answer to a `SEND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReply {
    Okay,
    Fail(String),
}

/// Remote file metadata from a `STAT` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub mode: u32,
    pub size: u32,
    /// Seconds since the Unix epoch.
    pub mtime: u32,
}

impl FileStat {
    /// The daemon reports all-zero metadata for paths that do not exist.
    pub fn exists(&self) -> bool {
        self.mode != 0 || self.size != 0 || self.mtime != 0
    }

    pub fn file_type(&self) -> u32 {
        self.mode & S_IFMT
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == S_IFDIR
    }

    pub fn is_file(&self) -> bool {
        self.file_type() == S_IFREG
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type() == S_IFLNK
    }

    /// Permission bits, including setuid/setgid/sticky.
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }
}

/// One directory entry from a `LIST` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub stat: FileStat,
}

/// One unit of a `LIST` response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItem {
    Entry(DirEntry),
    Done,
    Fail(String),
}

/// Write a tag and a little-endian `u32` field.
pub fn encode_sync_header(tag: SyncTag, value: u32, dst: &mut BytesMut) {
    dst.reserve(SYNC_HEADER_SIZE);
    dst.put_slice(tag.as_bytes());
    dst.put_u32_le(value);
}

/// Write a tag, the payload length, and the payload.
pub fn encode_sync_request(tag: SyncTag, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(SYNC_HEADER_SIZE + payload.len());
    encode_sync_header(tag, len, dst);
    dst.put_slice(payload);
    Ok(())
}

/// Peek the tag and length of a buffered chunk header.
fn peek_header(src: &BytesMut) -> Option<([u8; 4], u32)> {
    if src.len() < SYNC_HEADER_SIZE {
        return None;
    }
    let mut tag = [0u8; 4];
    tag.copy_from_slice(&src[..4]);
    let mut len = [0u8; 4];
    len.copy_from_slice(&src[4..SYNC_HEADER_SIZE]);
    Some((tag, u32::from_le_bytes(len)))
}

/// Take `len` bytes after the header once they are all buffered.
fn take_payload(src: &mut BytesMut, len: usize) -> Option<Bytes> {
    if src.len() < SYNC_HEADER_SIZE + len {
        return None;
    }
    src.advance(SYNC_HEADER_SIZE);
    Some(src.split_to(len).freeze())
}

/// Like [`take_payload`], for text the daemon sends about a failure.
fn take_message(src: &mut BytesMut, len: usize, max: usize) -> Result<Option<Bytes>> {
    if len > max {
        return Err(FrameError::MessageTooLarge { size: len, max });
    }
    if src.len() < SYNC_HEADER_SIZE + len {
        return Ok(None);
    }
    src.advance(SYNC_HEADER_SIZE);
    Ok(Some(src.split_to(len).freeze()))
}

fn fail_message(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

/// Decode one chunk of a `RECV` stream.
///
/// `DATA` yields exactly the declared number of bytes, however many that is;
/// `DONE` consumes its 4-byte field; `FAIL` yields the daemon's message, which
/// may not exceed `max_message`. Returns `Ok(None)` until the whole chunk is
/// buffered.
pub fn decode_sync_packet(src: &mut BytesMut, max_message: usize) -> Result<Option<SyncPacket>> {
    let Some((tag, len)) = peek_header(src) else {
        return Ok(None);
    };

    match SyncTag::from_bytes(&tag) {
        Some(SyncTag::Data) => Ok(take_payload(src, len as usize).map(SyncPacket::Data)),
        Some(SyncTag::Done) => {
            src.advance(SYNC_HEADER_SIZE);
            Ok(Some(SyncPacket::Done))
        }
        Some(SyncTag::Fail) => Ok(take_message(src, len as usize, max_message)?
            .map(|payload| SyncPacket::Fail(fail_message(&payload)))),
        _ => Err(FrameError::UnexpectedSyncTag(token_text(&tag))),
    }
}

/// Decode the daemon's answer to a completed `SEND`.
///
/// `OKAY` carries a length field that is normally zero; any bytes it
/// announces are skipped.
pub fn decode_sync_reply(src: &mut BytesMut, max_message: usize) -> Result<Option<SyncReply>> {
    let Some((tag, len)) = peek_header(src) else {
        return Ok(None);
    };

    match SyncTag::from_bytes(&tag) {
        Some(SyncTag::Okay) => {
            Ok(take_message(src, len as usize, max_message)?.map(|_| SyncReply::Okay))
        }
        Some(SyncTag::Fail) => Ok(take_message(src, len as usize, max_message)?
            .map(|payload| SyncReply::Fail(fail_message(&payload)))),
        _ => Err(FrameError::UnexpectedSyncTag(token_text(&tag))),
    }
}

/// Decode a `STAT` reply: tag followed by mode, size and mtime.
pub fn decode_stat(src: &mut BytesMut) -> Result<Option<FileStat>> {
    if src.len() < 4 {
        return Ok(None);
    }
    if &src[..4] != SyncTag::Stat.as_bytes() {
        return Err(FrameError::UnexpectedSyncTag(token_text(&src[..4])));
    }
    if src.len() < 4 + STAT_BODY_SIZE {
        return Ok(None);
    }
    src.advance(4);
    Ok(Some(FileStat {
        mode: src.get_u32_le(),
        size: src.get_u32_le(),
        mtime: src.get_u32_le(),
    }))
}

/// Decode one record of a `LIST` reply.
///
/// `DENT` carries mode, size, mtime, name length and the name. `DONE` is
/// followed by 16 bytes that carry nothing. `FAIL` uses the usual
/// length-prefixed message.
pub fn decode_list_item(src: &mut BytesMut, max_message: usize) -> Result<Option<ListItem>> {
    if src.len() < 4 {
        return Ok(None);
    }
    let mut tag = [0u8; 4];
    tag.copy_from_slice(&src[..4]);

    match SyncTag::from_bytes(&tag) {
        Some(SyncTag::Dent) => {
            if src.len() < 4 + DENT_BODY_SIZE {
                return Ok(None);
            }
            let mut body = &src[4..4 + DENT_BODY_SIZE];
            let stat = FileStat {
                mode: body.get_u32_le(),
                size: body.get_u32_le(),
                mtime: body.get_u32_le(),
            };
            let name_len = body.get_u32_le() as usize;
            if name_len > max_message {
                return Err(FrameError::MessageTooLarge {
                    size: name_len,
                    max: max_message,
                });
            }
            let total = 4 + DENT_BODY_SIZE + name_len;
            if src.len() < total {
                return Ok(None);
            }
            src.advance(4 + DENT_BODY_SIZE);
            let name = src.split_to(name_len);
            Ok(Some(ListItem::Entry(DirEntry {
                name: String::from_utf8_lossy(&name).into_owned(),
                stat,
            })))
        }
        Some(SyncTag::Done) => {
            if src.len() < 4 + DENT_BODY_SIZE {
                return Ok(None);
            }
            src.advance(4 + DENT_BODY_SIZE);
            Ok(Some(ListItem::Done))
        }
        Some(SyncTag::Fail) => {
            let Some((_, len)) = peek_header(src) else {
                return Ok(None);
            };
            Ok(take_message(src, len as usize, max_message)?
                .map(|payload| ListItem::Fail(fail_message(&payload))))
        }
        _ => Err(FrameError::UnexpectedSyncTag(token_text(&tag))),
    }
}
