//! Streaming shell command output as text lines.

use std::collections::VecDeque;

use adbwire_frame::LineDecoder;
use adbwire_transport::CloseHandle;
use tracing::debug;

use crate::config::Context;
use crate::connection::Connection;
use crate::error::Result;

/// A running shell command on one device.
///
/// Yields output lines as they arrive. The session ends when the device
/// closes the stream; the connection is released when the session is dropped.
#[derive(Debug)]
pub struct ShellSession {
    conn: Connection,
    decoder: LineDecoder,
    ready: VecDeque<String>,
    finished: bool,
}

impl ShellSession {
    /// Start `command` on the device with `serial`.
    pub fn open(ctx: &Context, serial: &str, command: &str) -> Result<Self> {
        let mut conn = Connection::open(ctx)?;
        conn.select_device(serial)?;
        conn.send_request(&format!("shell:{command}"))?;
        debug!(serial, command, "shell session started");

        Ok(Self {
            conn,
            decoder: LineDecoder::new(),
            ready: VecDeque::new(),
            finished: false,
        })
    }

    /// Handle that ends the session from another thread.
    ///
    /// A blocked [`ShellSession::next_line`] then fails with
    /// [`ClientError::Cancelled`](crate::ClientError::Cancelled).
    pub fn close_handle(&self) -> CloseHandle {
        self.conn.close_handle()
    }

    /// The next complete output line, or `None` once output has ended.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            if self.finished {
                return Ok(None);
            }

            match self.conn.read_chunk() {
                Ok(Some(chunk)) => {
                    let ready = &mut self.ready;
                    self.decoder.feed(&chunk, |line| ready.push_back(line));
                }
                Ok(None) => {
                    self.finished = true;
                    if let Some(line) = self.decoder.finish() {
                        self.ready.push_back(line);
                    }
                }
                Err(err) => {
                    self.finished = true;
                    self.ready.clear();
                    return Err(err);
                }
            }
        }
    }

    /// Hand every remaining line to `consumer`, in order.
    pub fn for_each_line<F>(mut self, mut consumer: F) -> Result<()>
    where
        F: FnMut(String),
    {
        while let Some(line) = self.next_line()? {
            consumer(line);
        }
        debug!("shell session finished");
        Ok(())
    }
}

impl Iterator for ShellSession {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

/// Run `command` on a device, handing each output line to `consumer`.
///
/// Returns once the device closes the stream.
pub fn run<F>(ctx: &Context, serial: &str, command: &str, consumer: F) -> Result<()>
where
    F: FnMut(String),
{
    ShellSession::open(ctx, serial, command)?.for_each_line(consumer)
}

/// Run `command` and collect its output lines.
pub fn output(ctx: &Context, serial: &str, command: &str) -> Result<Vec<String>> {
    ShellSession::open(ctx, serial, command)?.collect()
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::error::ClientError;
    use crate::testing::FakeDaemon;

    fn shell_prologue(side: &mut crate::testing::DaemonSide, command: &str) {
        side.expect_request("host:transport:emulator-5554");
        side.okay();
        side.expect_request(&format!("shell:{command}"));
        side.okay();
    }

    #[test]
    fn lines_split_across_writes() {
        let daemon = FakeDaemon::serve(|side| {
            shell_prologue(side, "logcat -d");
            side.write(b"first li");
            thread::sleep(Duration::from_millis(10));
            side.write(b"ne\nsecond line\n\nthird");
        });

        let mut lines = Vec::new();
        run(&daemon.context(), "emulator-5554", "logcat -d", |line| {
            lines.push(line)
        })
        .expect("shell should succeed");
        assert_eq!(lines, ["first line", "second line", "third"]);
        daemon.join();
    }

    #[test]
    fn multibyte_character_split_between_chunks() {
        let daemon = FakeDaemon::serve(|side| {
            shell_prologue(side, "echo");
            side.write(b"caf\xC3");
            thread::sleep(Duration::from_millis(10));
            side.write(b"\xA9\n");
        });

        let lines = output(&daemon.context(), "emulator-5554", "echo").expect("shell");
        assert_eq!(lines, ["café"]);
        daemon.join();
    }

    #[test]
    fn session_is_an_iterator() {
        let daemon = FakeDaemon::serve(|side| {
            shell_prologue(side, "pm list packages");
            side.write(b"package:com.android.shell\npackage:com.android.phone\n");
        });

        let packages: Vec<String> =
            ShellSession::open(&daemon.context(), "emulator-5554", "pm list packages")
                .expect("session should open")
                .map(|line| line.expect("line should decode"))
                .filter_map(|line| line.strip_prefix("package:").map(str::to_string))
                .collect();
        assert_eq!(packages, ["com.android.shell", "com.android.phone"]);
        daemon.join();
    }

    #[test]
    fn unknown_device_is_rejected() {
        let daemon = FakeDaemon::serve(|side| {
            side.expect_request("host:transport:ghost");
            side.fail("device 'ghost' not found");
        });

        let err = ShellSession::open(&daemon.context(), "ghost", "ls").expect_err("no device");
        assert!(matches!(err, ClientError::RemoteRejected(_)));
        daemon.join();
    }

    #[test]
    fn close_handle_cancels_session() {
        let daemon = FakeDaemon::serve(|side| {
            shell_prologue(side, "logcat");
            side.write(b"boot complete\n");
            side.wait_for_eof();
        });

        let mut session = ShellSession::open(&daemon.context(), "emulator-5554", "logcat")
            .expect("session should open");
        assert_eq!(
            session.next_line().expect("first line").as_deref(),
            Some("boot complete")
        );

        let handle = session.close_handle();
        let closer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.close();
        });

        let err = session.next_line().expect_err("session should be cancelled");
        assert!(matches!(err, ClientError::Cancelled));
        assert_eq!(session.next_line().expect("finished session"), None);

        closer.join().expect("closer thread should complete");
        drop(session);
        daemon.join();
    }
}
