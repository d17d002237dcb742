#![cfg(feature = "cli")]

use std::process::Command;

fn prpc() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_prpc"));
    cmd.env_remove("PRPC_TIMEOUT").env_remove("PRPC_MAX_REQS");
    cmd
}

#[test]
fn parse_prints_frame_as_json() {
    let output = prpc()
        .args(["--format", "json", "parse", "0:with_args yes 2.0"])
        .output()
        .expect("parse should run");

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(value["seq_id"], 0);
    assert_eq!(value["identifier"], "with_args");
    assert_eq!(value["args"][0]["type"], "bool");
    assert_eq!(value["args"][0]["value"], true);
    assert_eq!(value["args"][1]["type"], "float");
    assert_eq!(value["args"][1]["value"], 2.0);
    assert_eq!(value["wire"], "0:with_args yes 2.0");
}

#[test]
fn parse_unescapes_quotes() {
    let output = prpc()
        .args(["--format", "json", "parse", r#"0:escaped "escaped \"quote\"""#])
        .output()
        .expect("parse should run");

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(value["args"][0]["value"], "escaped \"quote\"");
}

#[test]
fn parse_rejects_malformed_line() {
    let output = prpc()
        .args(["parse", "hello"])
        .output()
        .expect("parse should run");

    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("parse error at column"));
}

#[test]
fn encode_prints_wire_line() {
    let output = prpc()
        .args(["--format", "raw", "encode", "gpio/led/set", "yes", "3.0", "--seq", "7"])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "7:gpio/led/set yes 3.0\n");
}

#[test]
fn encode_notification() {
    let output = prpc()
        .args(["--format", "raw", "encode", "evt/boot", "--seq", "*"])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "*:evt/boot\n");
}

#[test]
fn encode_rejects_invalid_identifier() {
    let output = prpc()
        .args(["encode", "not valid"])
        .output()
        .expect("encode should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_reports_package_version() {
    let output = prpc().arg("version").output().expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("prpc {}", env!("CARGO_PKG_VERSION")));
}
