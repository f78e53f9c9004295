#![cfg(feature = "cli")]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Command, Output};
use std::thread::{self, JoinHandle};

/// Serves `connections` scripted connections on a loopback port.
fn fake_daemon<F>(connections: usize, script: F) -> (u16, JoinHandle<()>)
where
    F: Fn(usize, &mut TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("fake daemon should bind");
    let port = listener
        .local_addr()
        .expect("fake daemon should have an address")
        .port();
    let handle = thread::spawn(move || {
        for index in 0..connections {
            let (mut stream, _) = listener.accept().expect("fake daemon should accept");
            script(index, &mut stream);
        }
    });
    (port, handle)
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut len = [0u8; 4];
    stream.read_exact(&mut len).expect("request length");
    let len = usize::from_str_radix(std::str::from_utf8(&len).expect("hex digits"), 16)
        .expect("hex length");
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).expect("request payload");
    String::from_utf8(payload).expect("UTF-8 request")
}

fn expect_request(stream: &mut TcpStream, expected: &str) {
    assert_eq!(read_request(stream), expected);
}

fn reply(stream: &mut TcpStream, bytes: &[u8]) {
    stream.write_all(bytes).expect("fake daemon write");
}

fn respond(stream: &mut TcpStream, payload: &str) {
    reply(stream, format!("OKAY{:04X}{payload}", payload.len()).as_bytes());
}

fn adbwire(port: u16, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_adbwire"))
        .env_remove("ANDROID_SERIAL")
        .env_remove("ANDROID_ADB_SERVER_ADDRESS")
        .arg("-P")
        .arg(port.to_string())
        .arg("--log-level")
        .arg("off")
        .args(args)
        .output()
        .expect("adbwire should run")
}

fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    listener.local_addr().expect("local addr").port()
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "adbwire-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

#[test]
fn devices_prints_listing() {
    let (port, daemon) = fake_daemon(1, |_, stream| {
        expect_request(stream, "host:devices");
        respond(stream, "emulator-5554\tdevice\nR58M\tunauthorized\n\n");
    });

    let output = adbwire(port, &["--format", "raw", "devices"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "emulator-5554\tdevice\nR58M\tunauthorized\n");
    daemon.join().expect("daemon thread");
}

#[test]
fn devices_json_uses_state_words() {
    let (port, daemon) = fake_daemon(1, |_, stream| {
        expect_request(stream, "host:devices");
        respond(stream, "emulator-5554\tdevice\nR58M\tbootloader\n");
    });

    let output = adbwire(port, &["--format", "json", "devices", "--state", "bootloader"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"serial\":\"R58M\""));
    assert!(stdout.contains("\"state\":\"bootloader\""));
    assert!(!stdout.contains("emulator-5554"));
    daemon.join().expect("daemon thread");
}

#[test]
fn unreachable_daemon_exits_with_transport_code() {
    let output = adbwire(unused_port(), &["devices"]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("daemon unreachable"));
}

#[test]
fn rejected_request_reports_daemon_message() {
    let (port, daemon) = fake_daemon(1, |_, stream| {
        expect_request(stream, "host:transport:ghost");
        reply(stream, b"FAIL0018device 'ghost' not found");
    });

    let output = adbwire(port, &["-s", "ghost", "shell", "true"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("device 'ghost' not found"));
    daemon.join().expect("daemon thread");
}

#[test]
fn shell_streams_output_lines() {
    let (port, daemon) = fake_daemon(1, |_, stream| {
        expect_request(stream, "host:transport:S1");
        reply(stream, b"OKAY");
        expect_request(stream, "shell:echo one two");
        reply(stream, b"OKAY");
        reply(stream, b"one\r\ntwo");
    });

    let output = adbwire(port, &["-s", "S1", "--format", "raw", "shell", "echo", "one", "two"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "one\r\ntwo\n");
    daemon.join().expect("daemon thread");
}

#[test]
fn shell_without_serial_uses_only_online_device() {
    let (port, daemon) = fake_daemon(2, |index, stream| {
        if index == 0 {
            expect_request(stream, "host:devices");
            respond(stream, "OFF1\toffline\nON1\tdevice\n");
        } else {
            expect_request(stream, "host:transport:ON1");
            reply(stream, b"OKAY");
            expect_request(stream, "shell:id");
            reply(stream, b"OKAYuid=2000(shell)\n");
        }
    });

    let output = adbwire(port, &["--format", "raw", "shell", "id"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "uid=2000(shell)\n");
    daemon.join().expect("daemon thread");
}

#[test]
fn pull_writes_local_file() {
    let dir = unique_temp_dir("pull");
    let target = dir.join("hosts");

    let (port, daemon) = fake_daemon(1, |_, stream| {
        expect_request(stream, "host:transport:S1");
        reply(stream, b"OKAY");
        expect_request(stream, "sync:");
        reply(stream, b"OKAY");

        let mut header = [0u8; 8];
        stream.read_exact(&mut header).expect("RECV header");
        assert_eq!(&header[..4], b"RECV");
        let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let mut path = vec![0u8; len as usize];
        stream.read_exact(&mut path).expect("RECV path");
        assert_eq!(path, b"/system/etc/hosts");

        let body = b"127.0.0.1 localhost\n";
        reply(stream, b"DATA");
        reply(stream, &(body.len() as u32).to_le_bytes());
        reply(stream, body);
        reply(stream, b"DONE\x00\x00\x00\x00");
    });

    let target_arg = target.display().to_string();
    let output = adbwire(
        port,
        &["-s", "S1", "--format", "raw", "pull", "/system/etc/hosts", &target_arg],
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "20\n");
    assert_eq!(
        std::fs::read(&target).expect("pulled file"),
        b"127.0.0.1 localhost\n"
    );

    daemon.join().expect("daemon thread");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn push_sends_file_with_requested_mode() {
    let dir = unique_temp_dir("push");
    let source = dir.join("script.sh");
    std::fs::write(&source, b"#!/bin/sh\necho hi\n").expect("source file");

    let (port, daemon) = fake_daemon(1, |_, stream| {
        expect_request(stream, "host:transport:S1");
        reply(stream, b"OKAY");
        expect_request(stream, "sync:");
        reply(stream, b"OKAY");

        let mut header = [0u8; 8];
        stream.read_exact(&mut header).expect("SEND header");
        assert_eq!(&header[..4], b"SEND");
        let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let mut spec = vec![0u8; len as usize];
        stream.read_exact(&mut spec).expect("SEND spec");
        // 0o100755
        assert_eq!(spec, b"/data/local/tmp/script.sh,33261");

        let mut received = Vec::new();
        loop {
            stream.read_exact(&mut header).expect("chunk header");
            let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
            if &header[..4] == b"DONE" {
                assert_eq!(len as usize, received.len());
                break;
            }
            assert_eq!(&header[..4], b"DATA");
            let mut chunk = vec![0u8; len as usize];
            stream.read_exact(&mut chunk).expect("chunk body");
            received.extend_from_slice(&chunk);
        }
        assert_eq!(received, b"#!/bin/sh\necho hi\n");
        reply(stream, b"OKAY\x00\x00\x00\x00");
    });

    let source_arg = source.display().to_string();
    let output = adbwire(
        port,
        &[
            "-s",
            "S1",
            "--format",
            "json",
            "push",
            &source_arg,
            "/data/local/tmp/script.sh",
            "--mode",
            "755",
        ],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"bytes\":18"));

    daemon.join().expect("daemon thread");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_reports_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_adbwire"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("adbwire "));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
