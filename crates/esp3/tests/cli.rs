#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

const ROCKER: &str = "55000707017AF650FEFE8A013001FFFFFFFF2D006B";
const TEMPERATURE: &str = "55000A0701EBA5000080080180F62A0001FFFFFFFF2D00B7";
const CHAIN: [&str; 3] = [
    "55000F07012B40400011D10790010200042058A58001FF9C8080470090",
    "55000F07012B404104201C1C00010000042058A58001FF9C8080470097",
    "55000B070180404200000000042058A58001FF9C8080470071",
];

fn esp3(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_esp3"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("esp3 should run")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout should be JSON lines"))
        .collect()
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "esp3cli-{tag}-{}-{}",
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
fn crc_of_header() {
    let output = esp3(&["crc", "00 07 07 01"]);
    assert!(output.status.success());
    let lines = json_lines(&output);
    assert_eq!(lines[0]["crc"], "0x7A");
    assert_eq!(lines[0]["length"], 4);
}

#[test]
fn decode_bound_rocker() {
    let output = esp3(&["decode", ROCKER, "--bind", "FE:FE:8A:01=F6-02-01"]);
    assert!(output.status.success());
    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["kind"], "radio");
    assert_eq!(lines[0]["radio"]["sender"], "FE:FE:8A:01");
    assert_eq!(lines[0]["profile"], "F6-02-01");
    let fields = lines[0]["fields"].as_array().expect("fields");
    assert!(fields
        .iter()
        .any(|field| field["shortcut"] == "R1" && field["value"] == "Button BI"));
}

#[test]
fn decode_reassembles_chain() {
    let mut args = vec!["decode"];
    args.extend(CHAIN);
    args.extend(["--bind", "04:20:58:A5=D1079-01-00"]);
    let output = esp3(&args);
    assert!(output.status.success());

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["event"], "chain_pending");
    assert_eq!(lines[1]["received"], 14);
    assert_eq!(lines[2]["kind"], "chained");
    assert_eq!(lines[2]["chain"]["fragments"], 3);
    let fields = lines[2]["fields"].as_array().expect("fields");
    assert!(fields
        .iter()
        .any(|field| field["shortcut"] == "TEMPEL" && field["value"] == 32.0));
}

#[test]
fn decode_capture_file() {
    let dir = unique_temp_dir("capture");
    let path = dir.join("capture.bin");
    let mut bytes = hex::decode(TEMPERATURE).unwrap();
    bytes.extend(hex::decode(ROCKER).unwrap());
    std::fs::write(&path, bytes).unwrap();

    let output = esp3(&[
        "decode",
        "--file",
        path.to_str().unwrap(),
        "--bind",
        "01:80:F6:2A=A5-02-05",
    ]);
    assert!(output.status.success());
    let lines = json_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["profile"], "A5-02-05");
    assert_eq!(lines[1]["rorg"], "RPS");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn damaged_frame_returns_60() {
    let damaged = format!("{}00", &ROCKER[..ROCKER.len() - 2]);
    let output = esp3(&["decode", &damaged, TEMPERATURE]);
    assert_eq!(output.status.code(), Some(60));
    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["rorg"], "BS4");
}

#[test]
fn encode_then_decode() {
    let output = esp3(&[
        "encode",
        "A5-02-05",
        "--sender",
        "01:80:F6:2A",
        "--set",
        "TMP=20",
    ]);
    assert!(output.status.success());
    let lines = json_lines(&output);
    let frame = lines[0]["frame"].as_str().expect("frame hex").to_string();
    assert!(frame.starts_with("55000A0701"));

    let output = esp3(&["decode", &frame, "--bind", "01:80:F6:2A=A5-02-05"]);
    assert!(output.status.success());
    let lines = json_lines(&output);
    let tmp = lines[0]["fields"][0]["value"].as_f64().expect("TMP value");
    assert!((tmp - 20.0).abs() < 0.2, "{tmp}");
}

#[test]
fn encode_unknown_profile_returns_64() {
    let output = esp3(&["encode", "A5-7F-7F", "--sender", "01:80:F6:2A"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no profile"));
}

#[test]
fn profiles_list_and_show() {
    let output = esp3(&["profiles"]);
    assert!(output.status.success());
    let lines = json_lines(&output);
    assert!(lines.iter().any(|line| line["eep"] == "D1079-01-00"));

    let output = esp3(&["profiles", "D2-01-01"]);
    assert!(output.status.success());
    let lines = json_lines(&output);
    assert_eq!(lines[0]["eep"], "D2-01-01");
    assert_eq!(lines[0]["data"].as_array().map(Vec::len), Some(3));
}
