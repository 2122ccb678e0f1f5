#![cfg(all(unix, feature = "cli"))]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

fn loopback_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("loopback bind should succeed");
    let addr = listener.local_addr().expect("listener should have an addr");
    (listener, addr.to_string())
}

fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut seen = String::new();
    let mut buf = [0u8; 256];
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout should be settable");
    while !seen.contains(needle) {
        let n = stream.read(&mut buf).expect("server read should succeed");
        if n == 0 {
            break;
        }
        seen.push_str(&String::from_utf8_lossy(&buf[..n]));
    }
    seen
}

#[test]
fn info_reports_a_reachable_endpoint() {
    let (listener, addr) = loopback_listener();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept should succeed");
        // Hold the socket open until the probe disconnects.
        let mut stream = stream;
        let mut buf = [0u8; 64];
        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
        let _ = stream.read(&mut buf);
    });

    let output = Command::new(env!("CARGO_BIN_EXE_leakwire"))
        .args(["--format", "json", "info", &addr])
        .stderr(Stdio::null())
        .output()
        .expect("info command should run");

    server.join().expect("server thread should join");
    assert!(output.status.success(), "info against a live endpoint should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"status\":\"reachable\""), "got: {stdout}");
}

#[test]
fn info_reports_a_refused_endpoint_with_transport_code() {
    let (listener, addr) = loopback_listener();
    drop(listener);

    let output = Command::new(env!("CARGO_BIN_EXE_leakwire"))
        .args(["--format", "json", "info", &addr])
        .output()
        .expect("info command should run");

    assert_eq!(output.status.code(), Some(3));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"status\":\"unreachable\""), "got: {stdout}");
}

#[test]
fn tap_prints_a_frame_and_exits_at_count() {
    let (listener, addr) = loopback_listener();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept should succeed");
        let commands = read_until(&mut stream, "START");
        assert!(commands.contains("START"));
        stream
            .write_all(b"LeakSpotted\n{\"site\":\"heap\"}\n---\n")
            .expect("frame write should succeed");
        // Drain until the tap tears the session down.
        let _ = read_until(&mut stream, "\u{0}");
    });

    let output = Command::new(env!("CARGO_BIN_EXE_leakwire"))
        .args(["--format", "json", "tap", &addr, "--count", "1"])
        .stderr(Stdio::null())
        .output()
        .expect("tap command should run");

    server.join().expect("server thread should join");
    assert!(output.status.success(), "tap should exit 0 after --count events");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"event\":\"LeakSpotted\""), "got: {stdout}");
    assert!(stdout.contains("\"site\":\"heap\""), "got: {stdout}");
}

#[test]
fn version_prints_the_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_leakwire"))
        .arg("version")
        .output()
        .expect("version command should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")), "got: {stdout}");
}
