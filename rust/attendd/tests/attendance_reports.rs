mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{
    error_code, request, request_ok, seed_catalog, spawn_sidecar_with_env, temp_dir, Catalog,
};

fn create_student(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    roll: &str,
    name: &str,
    class_id: &str,
) -> String {
    let res = request_ok(
        stdin,
        reader,
        id,
        "students.create",
        json!({ "rollNumber": roll, "name": name, "classId": class_id }),
    );
    res["studentId"].as_str().expect("studentId").to_string()
}

struct Marked {
    cat: Catalog,
    students: Vec<String>,
    period1: String,
    period2: String,
}

/// 2025-03-07 is a Friday. Period 1 takes its subject from the timetable,
/// period 2 is covered by alternative staff.
fn mark_friday(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) -> Marked {
    let cat = seed_catalog(stdin, reader);
    let students = vec![
        create_student(stdin, reader, "s1", "21CS001", "Asha", &cat.cse_a2),
        create_student(stdin, reader, "s2", "21CS002", "Bala", &cat.cse_a2),
        create_student(stdin, reader, "s3", "21CS003", "Chitra", &cat.cse_a2),
        create_student(stdin, reader, "s4", "21CS004", "Deepa", &cat.cse_a2),
    ];
    let _ = request_ok(
        stdin,
        reader,
        "s4-intern",
        "students.setStatus",
        json!({ "studentId": students[3], "status": "intern" }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "tt",
        "timetable.create",
        json!({
            "classId": cat.cse_a2,
            "dayOfWeek": "Fri",
            "periodNumber": 1,
            "subjectCode": "CA(302)",
            "subjectName": "Computer Architecture",
            "facultyName": "Mrs. Roshini"
        }),
    );

    let p1 = request_ok(
        stdin,
        reader,
        "m1",
        "attendance.markPeriod",
        json!({
            "classId": cat.cse_a2,
            "date": "2025-03-07",
            "periodNumber": 1,
            "marks": [
                { "studentId": students[0], "status": "present" },
                { "studentId": students[1], "status": "absent", "approval": "approved" },
                { "studentId": students[2], "status": "on_duty" }
            ]
        }),
    );
    assert_eq!(p1["isAlternativeStaff"], false);
    let p2 = request_ok(
        stdin,
        reader,
        "m2",
        "attendance.markPeriod",
        json!({
            "classId": cat.cse_a2,
            "date": "2025-03-07",
            "periodNumber": 2,
            "subjectCode": "DS(303)",
            "subjectName": "Data Structures",
            "facultyName": "Dr. Kumar",
            "alternativeStaffName": "Mr. Ravi",
            "marks": [
                { "studentId": students[0], "status": "absent" },
                { "studentId": students[1], "status": "absent", "approval": "approved" },
                { "studentId": students[2], "status": "present" }
            ]
        }),
    );
    assert_eq!(p2["isAlternativeStaff"], true);
    Marked {
        cat,
        students,
        period1: p1["periodAttendanceId"].as_str().expect("p1 id").to_string(),
        period2: p2["periodAttendanceId"].as_str().expect("p2 id").to_string(),
    }
}

#[test]
fn short_report_digest_counts_first_mark_of_the_day() {
    let workspace = temp_dir("attendd-short-report");
    let (mut child, mut stdin, mut reader) = spawn_sidecar_with_env(&[]);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let marked = mark_friday(&mut stdin, &mut reader);

    let short = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "reports.shortReport",
        json!({
            "streamId": "cse",
            "date": "2025-03-07",
            "reporter": "Dr. Meena",
            "classIds": [marked.cat.cse_a2]
        }),
    );
    let expected = "☀️Stream: Computer Science and Engineering\n\
☀️Date: 07/03/2025\n\
\n\
➕II CSE A: CSE  1/4\n\
📍Approved: 01\n\
📍OD: 01\n\
📍Intern: 01\n\
\n\
\n\
Reported by: Program Coordinator, CSE - Dr. Meena";
    assert_eq!(short["text"].as_str(), Some(expected));
    assert_eq!(short["report"]["classes"][0]["total"], 4);

    let unknown = request(
        &mut stdin,
        &mut reader,
        "3",
        "reports.shortReport",
        json!({ "streamId": "nope", "date": "2025-03-07", "reporter": "x" }),
    );
    assert_eq!(error_code(&unknown), "not_found");

    let bad_date = request(
        &mut stdin,
        &mut reader,
        "4",
        "reports.shortReport",
        json!({ "streamId": "cse", "date": "07/03/2025", "reporter": "x" }),
    );
    assert_eq!(error_code(&bad_date), "bad_params");

    let dean = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "reports.shortReport",
        json!({
            "streamId": "cse",
            "date": "2025-03-07",
            "reporterRole": "dean",
            "classIds": [marked.cat.cse_a2]
        }),
    );
    assert_eq!(dean["reporterRole"], "dean");
    let text = dean["text"].as_str().unwrap_or("");
    assert!(text.starts_with("☀️Stream: Computer Science and Engineering\n"));
    assert!(text.ends_with("📍Intern: 01\n\n\nReported by: Dean, CSE"));

    // The coordinator digest still needs a name.
    let unsigned = request(
        &mut stdin,
        &mut reader,
        "6",
        "reports.shortReport",
        json!({ "streamId": "cse", "date": "2025-03-07" }),
    );
    assert_eq!(error_code(&unsigned), "bad_params");
    let bad_role = request(
        &mut stdin,
        &mut reader,
        "7",
        "reports.shortReport",
        json!({ "streamId": "cse", "date": "2025-03-07", "reporterRole": "principal" }),
    );
    assert_eq!(error_code(&bad_role), "bad_params");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn attendance_model_grid_and_approvals() {
    let workspace = temp_dir("attendd-attendance-model");
    let missing_fonts = workspace.join("no-fonts");
    let (mut child, mut stdin, mut reader) = spawn_sidecar_with_env(&[(
        "ATTENDD_FONT_DIR",
        missing_fonts.to_str().expect("utf8 path"),
    )]);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let marked = mark_friday(&mut stdin, &mut reader);

    let model = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "reports.attendanceModel",
        json!({ "startDate": "2025-03-07", "endDate": "2025-03-07", "classId": marked.cat.cse_a2 }),
    );
    let report = &model["report"];
    assert_eq!(report["title"], "Attendance Report");
    assert_eq!(report["className"], "II CSE A");
    assert_eq!(report["summary"]["sessions"], 2);
    assert_eq!(report["summary"]["marked"], 6);
    assert_eq!(report["summary"]["present"], 2);
    assert_eq!(report["summary"]["absent"], 3);
    assert_eq!(report["summary"]["onDuty"], 1);
    assert_eq!(report["summary"]["rate"], 33.3);

    let rows = report["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0]["rollNumber"], "21CS001");
    assert_eq!(rows[0]["subject"], "CA(302) - Computer Architecture");
    assert_eq!(rows[0]["faculty"], "Mrs. Roshini");
    assert_eq!(rows[0]["style"]["color"], "green");
    assert_eq!(rows[1]["style"]["label"], "Approved");
    assert_eq!(rows[1]["style"]["bold"], true);
    assert_eq!(rows[2]["style"]["color"], "blue");
    assert_eq!(rows[3]["periodNumber"], 2);
    assert_eq!(rows[3]["faculty"], "Mr. Ravi");
    assert_eq!(rows[3]["isAlternativeStaff"], true);
    assert_eq!(rows[3]["style"]["color"], "red");

    let grid = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "reports.dailyGridModel",
        json!({ "classId": marked.cat.cse_a2, "date": "2025-03-07" }),
    );
    let grid = &grid["grid"];
    assert_eq!(grid["periods"], json!([1, 2]));
    assert_eq!(grid["staff"], json!(["Mrs. Roshini", "Mr. Ravi"]));
    assert_eq!(grid["rows"][0]["cells"], json!(["P", "A"]));
    assert_eq!(grid["rows"][0]["label"], "PARTIAL");
    assert_eq!(grid["rows"][1]["cells"], json!(["A", "A"]));
    assert_eq!(grid["rows"][1]["label"], "ABSENT");

    let grid_out = workspace.join("reports").join("grid.pdf");
    let grid_pdf = request(
        &mut stdin,
        &mut reader,
        "3a",
        "reports.dailyGridPdf",
        json!({
            "classId": marked.cat.cse_a2,
            "date": "2025-03-07",
            "outPath": grid_out.to_string_lossy()
        }),
    );
    assert_eq!(error_code(&grid_pdf), "pdf_failed");
    assert!(!grid_out.exists());
    let quiet_day = request(
        &mut stdin,
        &mut reader,
        "3b",
        "reports.dailyGridPdf",
        json!({
            "classId": marked.cat.cse_a2,
            "date": "2025-03-08",
            "outPath": grid_out.to_string_lossy()
        }),
    );
    assert_eq!(error_code(&quiet_day), "not_found");
    assert_eq!(quiet_day["error"]["details"]["date"], "2025-03-08");

    let approve = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.setApproval",
        json!({
            "periodAttendanceId": marked.period2,
            "studentId": marked.students[0],
            "approval": "unapproved"
        }),
    );
    assert_eq!(approve["approval"], "unapproved");
    let present = request(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.setApproval",
        json!({
            "periodAttendanceId": marked.period1,
            "studentId": marked.students[0],
            "approval": "approved"
        }),
    );
    assert_eq!(error_code(&present), "bad_params");

    let pdf_out = workspace.join("reports").join("attendance.pdf");
    let pdf = request(
        &mut stdin,
        &mut reader,
        "6",
        "reports.attendancePdf",
        json!({
            "startDate": "2025-03-07",
            "endDate": "2025-03-07",
            "outPath": pdf_out.to_string_lossy()
        }),
    );
    assert_eq!(error_code(&pdf), "pdf_failed");
    assert_eq!(
        pdf["error"]["details"]["outPath"].as_str(),
        Some(pdf_out.to_string_lossy().as_ref())
    );

    let reversed = request(
        &mut stdin,
        &mut reader,
        "7",
        "reports.attendanceModel",
        json!({ "startDate": "2025-03-08", "endDate": "2025-03-07" }),
    );
    assert_eq!(error_code(&reversed), "bad_params");

    // Re-marking period 1 replaces its marks.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "attendance.markPeriod",
        json!({
            "classId": marked.cat.cse_a2,
            "date": "2025-03-07",
            "periodNumber": 1,
            "marks": [{ "studentId": marked.students[0], "status": "absent" }]
        }),
    );
    let periods = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "attendance.periodList",
        json!({ "classId": marked.cat.cse_a2, "date": "2025-03-07" }),
    );
    let periods = periods["periods"].as_array().expect("periods");
    assert_eq!(periods.len(), 2);
    assert_eq!(periods[0]["id"].as_str(), Some(marked.period1.as_str()));
    assert_eq!(periods[0]["present"], 0);
    assert_eq!(periods[0]["absent"], 1);
    assert_eq!(periods[1]["alternativeStaffName"], "Mr. Ravi");

    let outsider = request(
        &mut stdin,
        &mut reader,
        "10",
        "attendance.markPeriod",
        json!({
            "classId": marked.cat.cse_a3,
            "date": "2025-03-07",
            "periodNumber": 1,
            "subjectCode": "X",
            "subjectName": "X",
            "facultyName": "X",
            "marks": [{ "studentId": marked.students[0], "status": "present" }]
        }),
    );
    assert_eq!(error_code(&outsider), "bad_params");

    drop(stdin);
    let _ = child.wait();
}
