//! `tokio_util::codec` decoders for the unframed parts of the protocol.

use std::collections::VecDeque;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::DEFAULT_MAX_SYNC_MESSAGE;
use crate::error::FrameError;
use crate::line::LineDecoder;
use crate::sync::{decode_sync_packet, SyncPacket};

/// Decodes shell output into text lines.
///
/// Wraps [`LineDecoder`]; the last unterminated line is produced at EOF.
#[derive(Debug, Default)]
pub struct LineCodec {
    decoder: LineDecoder,
    ready: VecDeque<String>,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, FrameError> {
        if let Some(line) = self.ready.pop_front() {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let chunk = src.split();
        let ready = &mut self.ready;
        self.decoder.feed(&chunk, |line| ready.push_back(line));
        Ok(self.ready.pop_front())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, FrameError> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        Ok(self.decoder.finish())
    }
}

/// Decodes the chunk stream that answers a `RECV`.
#[derive(Debug, Clone)]
pub struct SyncPacketCodec {
    max_message: usize,
}

impl SyncPacketCodec {
    pub fn new(max_message: usize) -> Self {
        Self { max_message }
    }
}

impl Default for SyncPacketCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SYNC_MESSAGE)
    }
}

impl Decoder for SyncPacketCodec {
    type Item = SyncPacket;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<SyncPacket>, FrameError> {
        decode_sync_packet(src, self.max_message)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<SyncPacket>, FrameError> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}
