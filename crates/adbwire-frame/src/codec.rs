use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{token_text, FrameError, Result};

/// Length prefix: 4 ASCII hex digits.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest payload a 4-hex-digit prefix can describe.
pub const MAX_REQUEST_PAYLOAD: usize = 0xFFFF;

/// Default cap on a sync message (`FAIL` text, directory entry name): 64 KiB.
pub const DEFAULT_MAX_SYNC_MESSAGE: usize = 64 * 1024;

/// Encode a request frame into a fresh buffer.
///
/// Wire format:
/// ```text
/// ┌────────────────────┬──────────────────────┐
/// │ Length (4B ASCII)  │ Payload              │
/// │ uppercase hex      │ UTF-8, Length bytes  │
/// └────────────────────┴──────────────────────┘
/// ```
pub fn encode_request(payload: &str) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    encode_request_into(payload, &mut dst)?;
    Ok(dst.freeze())
}

/// Encode a request frame, appending to `dst`.
pub fn encode_request_into(payload: &str, dst: &mut BytesMut) -> Result<()> {
    encode_length_prefixed(payload.as_bytes(), dst)
}

/// Encode arbitrary bytes behind a 4-hex-digit length.
///
/// Requests and the daemon's own responses share this layout.
pub fn encode_length_prefixed(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_REQUEST_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_REQUEST_PAYLOAD,
        });
    }
    dst.reserve(LENGTH_PREFIX_SIZE + payload.len());
    dst.put_slice(format!("{:04X}", payload.len()).as_bytes());
    dst.put_slice(payload);
    Ok(())
}

/// Parse a 4-character hex length. Both letter cases are accepted.
pub fn parse_hex_length(prefix: &[u8]) -> Result<usize> {
    let invalid = || FrameError::InvalidLength(token_text(prefix));
    if prefix.len() != LENGTH_PREFIX_SIZE || !prefix.iter().all(u8::is_ascii_hexdigit) {
        return Err(invalid());
    }
    let text = std::str::from_utf8(prefix).map_err(|_| invalid())?;
    usize::from_str_radix(text, 16).map_err(|_| invalid())
}

/// Decode one length-prefixed UTF-8 payload from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain the whole payload yet.
/// On success, consumes the prefix and payload from the buffer.
pub fn decode_length_prefixed(src: &mut BytesMut) -> Result<Option<String>> {
    if src.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let len = parse_hex_length(&src[..LENGTH_PREFIX_SIZE])?;
    if src.len() < LENGTH_PREFIX_SIZE + len {
        return Ok(None);
    }

    src.advance(LENGTH_PREFIX_SIZE);
    let payload = src.split_to(len);
    Ok(Some(String::from_utf8(payload.to_vec())?))
}

/// Configuration for the frame reader.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest sync message accepted from the daemon. `DATA` chunks are not
    /// capped. Default: 64 KiB.
    pub max_sync_message: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_sync_message: DEFAULT_MAX_SYNC_MESSAGE,
        }
    }
}
