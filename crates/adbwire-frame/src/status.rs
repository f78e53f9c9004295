use bytes::{Buf, BufMut, BytesMut};

use crate::codec::{encode_length_prefixed, parse_hex_length, LENGTH_PREFIX_SIZE};
use crate::error::{token_text, FrameError, Result};

/// Success token.
pub const OKAY: &[u8; 4] = b"OKAY";

/// Failure token, followed by a length-prefixed message.
pub const FAIL: &[u8; 4] = b"FAIL";

const TOKEN_SIZE: usize = 4;

/// Daemon reply to a host-level request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Okay,
    /// The daemon refused the request, with its explanation.
    Fail(String),
}

/// Decode a status frame from a buffer.
///
/// Returns `Ok(None)` until the token (and, for `FAIL`, the whole message) is
/// buffered. Nothing is consumed until the frame is complete.
pub fn decode_status(src: &mut BytesMut) -> Result<Option<Status>> {
    if src.len() < TOKEN_SIZE {
        return Ok(None);
    }

    let mut token = [0u8; TOKEN_SIZE];
    token.copy_from_slice(&src[..TOKEN_SIZE]);

    match &token {
        OKAY => {
            src.advance(TOKEN_SIZE);
            Ok(Some(Status::Okay))
        }
        FAIL => {
            let header = TOKEN_SIZE + LENGTH_PREFIX_SIZE;
            if src.len() < header {
                return Ok(None);
            }
            let len = parse_hex_length(&src[TOKEN_SIZE..header])?;
            if src.len() < header + len {
                return Ok(None);
            }
            src.advance(header);
            let message = src.split_to(len);
            Ok(Some(Status::Fail(
                String::from_utf8_lossy(&message).into_owned(),
            )))
        }
        other => Err(FrameError::UnexpectedStatus(token_text(other))),
    }
}

/// Encode a status frame (daemon side; used by test doubles and tooling).
pub fn encode_status(status: &Status, dst: &mut BytesMut) -> Result<()> {
    match status {
        Status::Okay => {
            dst.put_slice(OKAY);
            Ok(())
        }
        Status::Fail(message) => {
            dst.put_slice(FAIL);
            encode_length_prefixed(message.as_bytes(), dst)
        }
    }
}
