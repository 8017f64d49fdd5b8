use assert_cmd::prelude::*;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Command;

const PAYLOAD: &str = r#"[
  [{"service": "A", "operation": "x"}, {"service": "B", "operation": "x"}, {"service": "C", "operation": "x"}],
  [{"service": "A", "operation": "x"}, {"service": "B", "operation": "x"}, {"service": "D", "operation": "x"}]
]"#;

fn payload_file(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("payload.json");
    std::fs::write(&path, PAYLOAD).expect("write payload");
    path
}

fn run_json(args: &[&str]) -> Value {
    let exe = assert_cmd::cargo_bin!("ddg-cli");
    let out = Command::new(exe).args(args).assert().success();
    serde_json::from_slice(&out.get_output().stdout).expect("stdout is JSON")
}

fn keys(v: &Value) -> Vec<String> {
    v["vertices"]
        .as_array()
        .expect("vertices")
        .iter()
        .map(|v| v["key"].as_str().expect("key").to_string())
        .collect()
}

#[test]
fn graph_prints_the_assembled_snapshot() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let payload = payload_file(&tmp);
    let out = run_json(&[
        "graph",
        "--focal-service",
        "B",
        "--hide-op",
        "--hops",
        "1",
        payload.to_string_lossy().as_ref(),
    ]);
    assert_eq!(out["visibilityKey"], "v1");
    assert_eq!(keys(&out), vec!["B", "B|C", "B|D", "A|B"]);
    assert_eq!(out["edges"].as_array().expect("edges").len(), 3);
}

#[test]
fn layout_places_every_vertex() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let payload = payload_file(&tmp);
    let out = run_json(&[
        "layout",
        "--focal-service",
        "B",
        "--hide-op",
        payload.to_string_lossy().as_ref(),
    ]);
    let vertices = out["vertices"].as_array().expect("vertices");
    assert_eq!(vertices.len(), 4);
    assert!(vertices.iter().all(|v| v["width"] == 72.0 && v["height"] == 36.0));
    assert_eq!(out["edges"].as_array().expect("edges").len(), 3);
    assert!(out["graph"]["width"].as_f64().expect("width") > 0.0);
    assert!(out.get("unroutedEdges").is_none());
}

#[test]
fn layout_can_grow_incrementally() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let payload = payload_file(&tmp);
    let options = tmp.path().join("options.json");
    std::fs::write(&options, r#"{"layout": {"ranksep": 2}, "assembler": {"showOp": false}}"#)
        .expect("write options");
    let out = run_json(&[
        "layout",
        "--focal-service",
        "B",
        "--options",
        options.to_string_lossy().as_ref(),
        "--visibility",
        "1",
        "--next-visibility",
        "v1",
        payload.to_string_lossy().as_ref(),
    ]);
    assert_eq!(out["visibilityKey"], "v1");
    assert_eq!(keys(&out).len(), 4);
    assert_eq!(out["edges"].as_array().expect("edges").len(), 3);
}

#[test]
fn diff_reports_added_and_removed_indices() {
    let out = run_json(&["diff", "3", "5"]);
    assert_eq!(out, serde_json::json!({"added": [2], "removed": [1]}));
}

#[test]
fn missing_focal_service_is_a_usage_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let payload = payload_file(&tmp);
    let exe = assert_cmd::cargo_bin!("ddg-cli");
    Command::new(exe)
        .args(["graph", payload.to_string_lossy().as_ref()])
        .assert()
        .code(2);
}

#[test]
fn invalid_keys_fail_with_a_message() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let payload = payload_file(&tmp);
    let exe = assert_cmd::cargo_bin!("ddg-cli");
    let out = Command::new(exe)
        .args([
            "graph",
            "--focal-service",
            "B",
            "--visibility",
            "zz",
            payload.to_string_lossy().as_ref(),
        ])
        .assert()
        .code(1);
    let stderr = String::from_utf8_lossy(&out.get_output().stderr).to_string();
    assert!(stderr.contains("invalid visibility key"), "{stderr}");
}
