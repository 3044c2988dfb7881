#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

/// Paths are relative to the repository root.
pub fn fixture_path(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join(rel)
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    spawn_sidecar_with_env(&[])
}

pub fn spawn_sidecar_with_env(env: &[(&str, &str)]) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendd");
    let mut cmd = Command::new(exe);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .env_remove("ATTENDD_WORKSPACE");
    for (k, v) in env {
        cmd.env(k, v);
    }
    let mut child = cmd.spawn().expect("spawn attendd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

pub fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

pub struct Catalog {
    pub department_id: String,
    pub cse_a2: String,
    pub cse_a3: String,
    pub it2: String,
}

/// One CSE department with classes "II CSE A" and "III CSE A", plus "II IT"
/// under the IT stream. There is deliberately no "III IT".
pub fn seed_catalog(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) -> Catalog {
    let dep = request_ok(
        stdin,
        reader,
        "seed-dep",
        "departments.create",
        json!({ "name": "Computer Science and Engineering", "code": "CSE", "streamId": "cse" }),
    );
    let department_id = dep["departmentId"].as_str().expect("departmentId").to_string();
    let mut class = |id: &str, name: &str, params: serde_json::Value| -> String {
        let mut p = params;
        p["name"] = json!(name);
        let res = request_ok(stdin, reader, id, "classes.create", p);
        res["classId"].as_str().expect("classId").to_string()
    };
    let cse_a2 = class("seed-c1", "II CSE A", json!({ "departmentId": department_id }));
    let cse_a3 = class("seed-c2", "III CSE A", json!({ "departmentId": department_id }));
    let it2 = class("seed-c3", "II IT", json!({ "streamId": "it" }));
    Catalog {
        department_id,
        cse_a2,
        cse_a3,
        it2,
    }
}
