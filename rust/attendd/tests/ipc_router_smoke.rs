mod test_support;

use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{error_code, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("attendd-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["maxPeriods"].as_u64(), Some(8));
    assert!(health["workspacePath"].is_null());

    for method in ["students.list", "departments.list", "classes.list", "streams.list"] {
        let no_ws = request(&mut stdin, &mut reader, "2", method, json!({}));
        assert_eq!(error_code(&no_ws), "no_workspace", "{method}");
    }

    let unknown = request(&mut stdin, &mut reader, "3", "attendance.explode", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");
    assert!(unknown["error"]["message"]
        .as_str()
        .unwrap_or("")
        .contains("attendance.explode"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert!(workspace.join("attendd.sqlite3").is_file());

    let streams = request_ok(&mut stdin, &mut reader, "5", "streams.list", json!({}));
    let ids: Vec<&str> = streams["streams"]
        .as_array()
        .expect("streams")
        .iter()
        .filter_map(|s| s["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["cse", "it", "ece", "eee", "mech", "civil"]);

    let template = request_ok(&mut stdin, &mut reader, "6", "templates.studentsCsv", json!({}));
    assert_eq!(template["fileName"], "student_import_template.csv");
    assert!(template["text"]
        .as_str()
        .unwrap_or("")
        .starts_with("roll_number,name,department,class"));

    let template_out = workspace.join("out").join("timetable.csv");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "templates.timetableCsv",
        json!({ "outPath": template_out.to_string_lossy() }),
    );
    let written = std::fs::read_to_string(&template_out).expect("template written");
    assert!(written.starts_with("class,day_of_week,period_number"));

    let missing = request(&mut stdin, &mut reader, "8", "classes.create", json!({}));
    assert_eq!(error_code(&missing), "bad_params");

    // A malformed line gets a bad_json reply without an id.
    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json reply");
    let v: serde_json::Value = serde_json::from_str(line.trim()).expect("bad_json is json");
    assert_eq!(v["ok"], false);
    assert_eq!(v["error"]["code"], "bad_json");

    // The loop keeps serving after a bad line.
    let _ = request_ok(&mut stdin, &mut reader, "9", "health", json!({}));

    drop(stdin);
    let _ = child.wait();
}
