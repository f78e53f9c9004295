//! Scripted stand-in for the daemon, for unit tests.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use adbwire_transport::DaemonAddr;

use crate::config::Context;

pub(crate) struct FakeDaemon {
    addr: DaemonAddr,
    handle: JoinHandle<()>,
}

impl FakeDaemon {
    /// Accept one connection and run `script` against it.
    pub(crate) fn serve<F>(script: F) -> Self
    where
        F: FnOnce(&mut DaemonSide) + Send + 'static,
    {
        let mut script = Some(script);
        Self::serve_many(1, move |_, side| {
            if let Some(script) = script.take() {
                script(side);
            }
        })
    }

    /// Accept `connections` connections in order, running `script` with the
    /// connection index for each.
    pub(crate) fn serve_many<F>(connections: usize, mut script: F) -> Self
    where
        F: FnMut(usize, &mut DaemonSide) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("fake daemon should bind");
        let port = listener
            .local_addr()
            .expect("fake daemon should have an address")
            .port();

        let handle = thread::spawn(move || {
            for index in 0..connections {
                let (stream, _) = listener.accept().expect("fake daemon should accept");
                let mut side = DaemonSide { stream };
                script(index, &mut side);
            }
        });

        Self {
            addr: DaemonAddr::new("127.0.0.1", port),
            handle,
        }
    }

    pub(crate) fn context(&self) -> Context {
        Context::new(self.addr.clone())
    }

    /// Wait for the script to finish, re-raising its assertion failures.
    pub(crate) fn join(self) {
        if let Err(panic) = self.handle.join() {
            std::panic::resume_unwind(panic);
        }
    }
}

pub(crate) struct DaemonSide {
    stream: TcpStream,
}

impl DaemonSide {
    pub(crate) fn read_request(&mut self) -> String {
        let len = std::str::from_utf8(&self.read_exact(4))
            .ok()
            .and_then(|hex| usize::from_str_radix(hex, 16).ok())
            .expect("request should start with a hex length");
        String::from_utf8(self.read_exact(len)).expect("request should be UTF-8")
    }

    pub(crate) fn expect_request(&mut self, expected: &str) {
        assert_eq!(self.read_request(), expected);
    }

    pub(crate) fn okay(&mut self) {
        self.write(b"OKAY");
    }

    pub(crate) fn fail(&mut self, message: &str) {
        self.write(b"FAIL");
        self.respond(message);
    }

    /// Send a hex length-prefixed payload.
    pub(crate) fn respond(&mut self, payload: &str) {
        self.write(format!("{:04X}{payload}", payload.len()).as_bytes());
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) {
        self.stream
            .write_all(bytes)
            .expect("fake daemon write should succeed");
    }

    /// Send a sync header: tag plus little-endian value.
    pub(crate) fn sync_header(&mut self, tag: &[u8; 4], value: u32) {
        self.write(tag);
        self.write(&value.to_le_bytes());
    }

    /// Send a sync chunk: tag, little-endian length, payload.
    pub(crate) fn sync_chunk(&mut self, tag: &[u8; 4], payload: &[u8]) {
        self.sync_header(tag, payload.len() as u32);
        self.write(payload);
    }

    pub(crate) fn read_exact(&mut self, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        self.stream
            .read_exact(&mut buf)
            .expect("fake daemon read should succeed");
        buf
    }

    /// Read a sync header: tag and little-endian value.
    pub(crate) fn read_sync_header(&mut self) -> ([u8; 4], u32) {
        let raw = self.read_exact(8);
        let mut tag = [0u8; 4];
        tag.copy_from_slice(&raw[..4]);
        let value = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        (tag, value)
    }

    /// Read a sync request and return its tag and payload.
    pub(crate) fn read_sync_request(&mut self) -> ([u8; 4], Vec<u8>) {
        let (tag, len) = self.read_sync_header();
        (tag, self.read_exact(len as usize))
    }

    /// True when the client has closed its side.
    pub(crate) fn at_eof(&mut self) -> bool {
        let mut byte = [0u8; 1];
        matches!(self.stream.read(&mut byte), Ok(0) | Err(_))
    }

    /// Block until the client closes its side.
    pub(crate) fn wait_for_eof(&mut self) {
        let mut sink = Vec::new();
        let _ = self.stream.read_to_end(&mut sink);
    }
}
