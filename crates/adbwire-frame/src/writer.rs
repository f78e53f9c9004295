use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::encode_request_into;
use crate::error::{FrameError, Result};
use crate::sync::{encode_sync_header, encode_sync_request, SyncTag};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete protocol units to any `Write` stream.
///
/// Every call encodes into an internal buffer, writes all of it and flushes,
/// so a unit is never left half-written on success.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode and send a host request frame.
    pub fn send_request(&mut self, payload: &str) -> Result<()> {
        self.buf.clear();
        encode_request_into(payload, &mut self.buf)?;
        self.write_buffered()
    }

    /// Send a sync request: tag, little-endian payload length, payload.
    pub fn send_sync_request(&mut self, tag: SyncTag, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_sync_request(tag, payload, &mut self.buf)?;
        self.write_buffered()
    }

    /// Send one `DATA` chunk.
    pub fn send_data(&mut self, chunk: &[u8]) -> Result<()> {
        self.send_sync_request(SyncTag::Data, chunk)
    }

    /// Send `DONE` with its 4-byte field.
    pub fn send_done(&mut self, value: u32) -> Result<()> {
        self.buf.clear();
        encode_sync_header(SyncTag::Done, value, &mut self.buf);
        self.write_buffered()
    }

    /// Write bytes as-is.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        write_all(&mut self.inner, bytes)?;
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    fn write_buffered(&mut self) -> Result<()> {
        write_all(&mut self.inner, &self.buf)?;
        self.flush()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn write_all<T: Write>(inner: &mut T, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match inner.write(&bytes[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::{decode_length_prefixed, MAX_REQUEST_PAYLOAD};
    use crate::reader::FrameReader;
    use crate::sync::{decode_sync_packet, SyncPacket};

    #[test]
    fn write_request_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_request("host:transport:emulator-5554").unwrap();

        let inner = writer.into_inner().into_inner();
        assert_eq!(inner, b"001Chost:transport:emulator-5554");
    }

    #[test]
    fn oversized_request_writes_nothing() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer
            .send_request(&"a".repeat(MAX_REQUEST_PAYLOAD + 1))
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn write_multiple_requests_back_to_back() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_request("host:transport:abc").unwrap();
        writer.send_request("sync:").unwrap();

        let mut buf = BytesMut::from(writer.into_inner().into_inner().as_slice());
        assert_eq!(
            decode_length_prefixed(&mut buf).unwrap().unwrap(),
            "host:transport:abc"
        );
        assert_eq!(decode_length_prefixed(&mut buf).unwrap().unwrap(), "sync:");
    }

    #[test]
    fn data_and_done_layout() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_data(b"abc").unwrap();
        writer.send_done(3).unwrap();

        let bytes = writer.into_inner().into_inner();
        assert_eq!(&bytes[..8], b"DATA\x03\x00\x00\x00");
        assert_eq!(&bytes[8..11], b"abc");
        assert_eq!(&bytes[11..], b"DONE\x03\x00\x00\x00");

        let mut buf = BytesMut::from(&bytes[..11]);
        assert!(matches!(
            decode_sync_packet(&mut buf, 1024).unwrap(),
            Some(SyncPacket::Data(d)) if d.as_ref() == b"abc"
        ));
    }

    #[test]
    fn write_raw_passes_bytes_through() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_raw(b"\x00\x01raw").unwrap();
        assert_eq!(writer.into_inner().into_inner(), b"\x00\x01raw");
    }

    #[test]
    fn write_zero_returns_connection_closed() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send_request("host:version").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn write_interrupted_retries() {
        let mut writer = FrameWriter::new(InterruptedOnceWriter {
            interrupted: false,
            data: Vec::new(),
        });
        writer.send_request("host:kill").unwrap();
        assert_eq!(writer.get_ref().data, b"0009host:kill");
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send_request("host:features").unwrap();
        assert_eq!(reader.read_length_prefixed().unwrap(), "host:features");
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct InterruptedOnceWriter {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedOnceWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
