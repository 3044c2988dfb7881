mod test_support;

use serde_json::json;
use test_support::{error_code, fixture_path, request, request_ok, seed_catalog, spawn_sidecar, temp_dir};

#[test]
fn student_csv_import_resolves_loose_class_labels() {
    let workspace = temp_dir("attendd-student-import");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let cat = seed_catalog(&mut stdin, &mut reader);
    let csv = fixture_path("fixtures/import/students.csv");

    let preview = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.previewCsv",
        json!({ "inPath": csv.to_string_lossy() }),
    );
    assert_eq!(preview["report"]["total"], 5);
    assert_eq!(preview["report"]["rejected"], 2);
    assert_eq!(preview["rows"].as_array().map(|r| r.len()), Some(3));
    // Preview writes nothing.
    let listed = request_ok(&mut stdin, &mut reader, "3", "students.list", json!({}));
    assert_eq!(listed["students"].as_array().map(|s| s.len()), Some(0));

    let import = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.importCsv",
        json!({ "inPath": csv.to_string_lossy() }),
    );
    let report = &import["report"];
    assert_eq!(report["total"], 5);
    assert_eq!(report["succeeded"], 3);
    assert_eq!(report["rejected"], 2);
    assert_eq!(report["failed"], 0);
    assert_eq!(report["maxReportedErrors"], 5);
    let errors = report["errors"].as_array().expect("errors");
    assert_eq!(errors[0]["rowNumber"], 4);
    assert!(errors[0]["message"].as_str().unwrap_or("").contains("III YR IT"));
    assert_eq!(errors[1]["rowNumber"], 6);

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.list",
        json!({ "classId": cat.cse_a2 }),
    );
    let students = listed["students"].as_array().expect("students");
    let rolls: Vec<&str> = students
        .iter()
        .filter_map(|s| s["rollNumber"].as_str())
        .collect();
    assert_eq!(rolls, vec!["21CS001", "21CS002", "21CS003"]);
    assert!(students
        .iter()
        .all(|s| s["departmentId"] == cat.department_id.as_str() && s["streamId"] == "cse"));

    // The same file again: every resolvable row now collides on roll number.
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.importCsv",
        json!({ "inPath": csv.to_string_lossy() }),
    );
    assert_eq!(again["report"]["succeeded"], 0);
    assert_eq!(again["report"]["failed"], 3);
    assert_eq!(again["report"]["errorCount"], 5);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn timetable_csv_import_rejects_bad_rows_and_feeds_allocation() {
    let workspace = temp_dir("attendd-timetable-import");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let cat = seed_catalog(&mut stdin, &mut reader);
    let text = std::fs::read_to_string(fixture_path("fixtures/import/timetable.csv"))
        .expect("timetable fixture");

    let import = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "timetable.importCsv",
        json!({ "text": text }),
    );
    let report = &import["report"];
    assert_eq!(report["total"], 7);
    assert_eq!(report["succeeded"], 4);
    assert_eq!(report["rejected"], 3);
    let errors = report["errors"].as_array().expect("errors");
    let lines: Vec<u64> = errors.iter().filter_map(|e| e["rowNumber"].as_u64()).collect();
    assert_eq!(lines, vec![6, 7, 8]);
    // "III IT" must not fall back to "II IT".
    assert!(errors[0]["message"].as_str().unwrap_or("").contains("III IT"));
    assert!(errors[1]["message"].as_str().unwrap_or("").contains("Funday"));
    assert!(errors[2]["message"].as_str().unwrap_or("").contains("expected 1 to 8"));

    let it_slots = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "timetable.list",
        json!({ "classId": cat.it2 }),
    );
    assert_eq!(it_slots["entries"].as_array().map(|e| e.len()), Some(0));

    let slots = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "timetable.list",
        json!({ "classId": cat.cse_a2 }),
    );
    let days: Vec<&str> = slots["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .filter_map(|e| e["dayLabel"].as_str())
        .collect();
    assert_eq!(days, vec!["Monday", "Tuesday", "Wednesday", "Thursday"]);

    let alloc = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "timetable.subjectAllocation",
        json!({ "classId": cat.cse_a2 }),
    );
    let subjects = alloc["subjects"].as_array().expect("subjects");
    let summary: Vec<(&str, u64)> = subjects
        .iter()
        .map(|s| {
            (
                s["subjectCode"].as_str().unwrap_or(""),
                s["hoursPerWeek"].as_u64().unwrap_or(0),
            )
        })
        .collect();
    assert_eq!(summary, vec![("CA(302)", 2), ("DS(303)", 1), ("OOP,T", 1)]);
    assert_eq!(subjects[0]["roomNumber"], "R101");
    assert_eq!(alloc["totalHours"], 4);

    let again = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "timetable.subjectAllocation",
        json!({ "classId": cat.cse_a2 }),
    );
    assert_eq!(again, alloc);

    let resolved = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "classes.resolve",
        json!({ "label": "3 CSE A" }),
    );
    assert_eq!(resolved["classId"], cat.cse_a3.as_str());
    assert_eq!(resolved["step"], "roman_digit_equivalent");

    let missing = request(
        &mut stdin,
        &mut reader,
        "8",
        "classes.resolve",
        json!({ "label": "III IT" }),
    );
    assert_eq!(error_code(&missing), "not_found");
    assert_eq!(missing["error"]["details"]["kind"], "class_not_found");

    let bad_header = request(
        &mut stdin,
        &mut reader,
        "9",
        "timetable.previewCsv",
        json!({ "text": "class,day,period\nII CSE A,Mon,1\n" }),
    );
    assert_eq!(error_code(&bad_header), "parse_failed");
    assert_eq!(
        bad_header["error"]["details"]["missingColumns"],
        json!(["subject_code", "subject_name", "faculty_name"])
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn equivalent_class_names_are_refused() {
    let workspace = temp_dir("attendd-duplicate-class");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let cat = seed_catalog(&mut stdin, &mut reader);

    for (id, name, step) in [
        ("2", "II  CSE A", "exact"),
        ("3", "ii cse a", "exact"),
        ("4", "II YR CSE A", "year_word_stripped"),
        ("5", "2 CSE A", "roman_digit_equivalent"),
    ] {
        let dup = request(
            &mut stdin,
            &mut reader,
            id,
            "classes.create",
            json!({ "name": name, "streamId": "cse" }),
        );
        assert_eq!(error_code(&dup), "bad_params", "{name}");
        assert_eq!(dup["error"]["details"]["classId"], json!(cat.cse_a2), "{name}");
        assert_eq!(dup["error"]["details"]["step"], step, "{name}");
    }

    // Another year of the same section is a different class.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "classes.create",
        json!({ "name": "IV CSE A", "streamId": "cse" }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "7", "classes.list", json!({}));
    assert_eq!(listed["classes"].as_array().map(|c| c.len()), Some(4));

    let hit = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "classes.resolve",
        json!({ "label": "II CSE A" }),
    );
    assert_eq!(hit["classId"], json!(cat.cse_a2));

    drop(stdin);
    let _ = child.wait();
}
