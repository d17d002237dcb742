#![cfg(all(unix, feature = "cli"))]

use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/prpccli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    loop {
        if UnixStream::connect(path).is_ok() {
            return;
        }
        if start.elapsed() >= timeout {
            panic!("connect timeout");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

/// A running `prpc serve` that is killed on drop.
struct Device {
    child: Child,
    dir: PathBuf,
    sock: PathBuf,
}

impl Device {
    fn start(tag: &str) -> Self {
        let dir = unique_temp_dir(tag);
        let sock = dir.join("device.sock");
        let child = Command::new(env!("CARGO_BIN_EXE_prpc"))
            .args(["--log-level", "error", "serve"])
            .arg(&sock)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("serve should start");
        wait_for_socket(&sock, Duration::from_secs(3));
        Self { child, dir, sock }
    }

    fn req(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_prpc"))
            .env_remove("PRPC_TIMEOUT")
            .env_remove("PRPC_MAX_REQS")
            .args(["--log-level", "error", "--format", "json", "req"])
            .arg(&self.sock)
            .args(args)
            .output()
            .expect("req should run")
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

#[test]
fn ping_succeeds_with_empty_result() {
    let device = Device::start("ping");
    let output = device.req(&["ping"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(value["identifier"], "ping");
    assert_eq!(value["seq_id"], 0);
    assert_eq!(value["result"], serde_json::json!([]));
}

#[test]
fn echo_returns_typed_arguments() {
    let device = Device::start("echo");
    let output = device.req(&["echo", "42", "-1.5", "no", "\"two words\""]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    let result = &value["result"];
    assert_eq!(result[0]["type"], "int");
    assert_eq!(result[0]["value"], 42);
    assert_eq!(result[1]["type"], "float");
    assert_eq!(result[1]["value"], -1.5);
    assert_eq!(result[2]["value"], false);
    assert_eq!(result[3]["value"], "two words");
}

#[test]
fn error_reply_exits_with_failure() {
    let device = Device::start("error");
    let output = device.req(&["reboot"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown command: reboot"));
}

#[test]
fn empty_pool_exits_with_tempfail() {
    let device = Device::start("pool");
    let output = device.req(&["ping", "--max-reqs", "0"]);

    assert_eq!(output.status.code(), Some(75));
}

#[test]
fn silent_device_times_out() {
    let dir = unique_temp_dir("silent");
    let sock = dir.join("silent.sock");
    let listener = UnixListener::bind(&sock).expect("bind should succeed");
    let holder = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept should succeed");
        thread::sleep(Duration::from_secs(2));
        drop(stream);
    });

    let output = Command::new(env!("CARGO_BIN_EXE_prpc"))
        .env_remove("PRPC_MAX_REQS")
        .env("PRPC_TIMEOUT", "200ms")
        .args(["--log-level", "error", "req"])
        .arg(&sock)
        .arg("ping")
        .output()
        .expect("req should run");

    assert_eq!(output.status.code(), Some(124));
    holder.join().expect("holder thread should finish");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_device_is_a_transport_error() {
    let dir = unique_temp_dir("missing");
    let output = Command::new(env!("CARGO_BIN_EXE_prpc"))
        .args(["req"])
        .arg(dir.join("absent.sock"))
        .arg("ping")
        .output()
        .expect("req should run");

    assert_eq!(output.status.code(), Some(3));
    let _ = std::fs::remove_dir_all(&dir);
}
