use crate::config::Config;
use crate::db;
use crate::import::{
    parse_csv_text, validate_students_table, StudentCatalogs, Validated, ValidatedStudent,
};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    get_optional_str, get_required_str, read_text_input, report_json, row_exists, with_db,
    HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

const STUDENT_STATUSES: [&str; 3] = ["active", "suspended", "intern"];

fn students_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_optional_str(params, "classId");
    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.roll_number, s.name, s.class_id, c.name, s.department_id,
                    s.stream_id, s.status, s.email, s.phone
             FROM students s
             LEFT JOIN classes c ON c.id = s.class_id
             WHERE (?1 IS NULL OR s.class_id = ?1)
             ORDER BY s.roll_number",
        )
        .map_err(HandlerErr::query)?;
    let students = stmt
        .query_map([&class_id], |r| {
            let id: String = r.get(0)?;
            let roll_number: String = r.get(1)?;
            let name: String = r.get(2)?;
            let class_id: String = r.get(3)?;
            let class_name: Option<String> = r.get(4)?;
            let department_id: Option<String> = r.get(5)?;
            let stream_id: Option<String> = r.get(6)?;
            let status: String = r.get(7)?;
            let email: Option<String> = r.get(8)?;
            let phone: Option<String> = r.get(9)?;
            Ok(json!({
                "id": id,
                "rollNumber": roll_number,
                "name": name,
                "classId": class_id,
                "className": class_name,
                "departmentId": department_id,
                "streamId": stream_id,
                "status": status,
                "email": email,
                "phone": phone
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::query)?;
    Ok(json!({ "students": students }))
}

fn students_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll_number = get_required_str(params, "rollNumber")?;
    let name = get_required_str(params, "name")?;
    let class_id = get_required_str(params, "classId")?;

    let class_row: Option<(Option<String>, Option<String>)> = conn
        .query_row(
            "SELECT department_id, stream_id FROM classes WHERE id = ?",
            [&class_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .map_err(HandlerErr::query)?;
    let Some((class_department, class_stream)) = class_row else {
        return Err(HandlerErr::new("not_found", "class not found"));
    };
    let department_id = get_optional_str(params, "departmentId").or(class_department);
    let stream_id = get_optional_str(params, "streamId").or(class_stream);

    let student_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(
            id, roll_number, name, class_id, department_id, stream_id, status, email, phone
         ) VALUES(?, ?, ?, ?, ?, ?, 'active', ?, ?)",
        rusqlite::params![
            student_id,
            roll_number,
            name,
            class_id,
            department_id,
            stream_id,
            get_optional_str(params, "email"),
            get_optional_str(params, "phone"),
        ],
    )
    .map_err(|e| HandlerErr::with_table("db_insert_failed", e, "students"))?;

    Ok(json!({ "studentId": student_id }))
}

fn students_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    if !row_exists(conn, "students", &student_id)? {
        return Err(HandlerErr::new("not_found", "student not found"));
    }
    let class_id = get_optional_str(params, "classId");
    if let Some(c) = &class_id {
        if !row_exists(conn, "classes", c)? {
            return Err(HandlerErr::new("not_found", "class not found"));
        }
    }

    conn.execute(
        "UPDATE students SET
           roll_number = COALESCE(?, roll_number),
           name = COALESCE(?, name),
           class_id = COALESCE(?, class_id),
           email = COALESCE(?, email),
           phone = COALESCE(?, phone)
         WHERE id = ?",
        rusqlite::params![
            get_optional_str(params, "rollNumber"),
            get_optional_str(params, "name"),
            class_id,
            get_optional_str(params, "email"),
            get_optional_str(params, "phone"),
            student_id,
        ],
    )
    .map_err(|e| HandlerErr::with_table("db_update_failed", e, "students"))?;

    Ok(json!({ "ok": true }))
}

fn students_set_status(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let status = get_required_str(params, "status")?.to_ascii_lowercase();
    if !STUDENT_STATUSES.contains(&status.as_str()) {
        return Err(HandlerErr::bad_params(format!(
            "status must be one of {}",
            STUDENT_STATUSES.join(", ")
        )));
    }
    let changed = conn
        .execute(
            "UPDATE students SET status = ? WHERE id = ?",
            (&status, &student_id),
        )
        .map_err(|e| HandlerErr::with_table("db_update_failed", e, "students"))?;
    if changed == 0 {
        return Err(HandlerErr::new("not_found", "student not found"));
    }
    Ok(json!({ "studentId": student_id, "status": status }))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = match get_required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match row_exists(conn, "students", &student_id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "student not found", None),
        Err(e) => return e.response(&req.id),
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    if let Err(e) = tx.execute(
        "DELETE FROM period_student_attendance WHERE student_id = ?",
        [&student_id],
    ) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "period_student_attendance" })),
        );
    }
    if let Err(e) = tx.execute("DELETE FROM students WHERE id = ?", [&student_id]) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "ok": true }))
}

fn validate_csv(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<Validated<ValidatedStudent>, HandlerErr> {
    let text = read_text_input(params)?;
    let table =
        parse_csv_text(&text).map_err(|e| HandlerErr::new("parse_failed", e.to_string()))?;
    let classes = db::load_class_catalog(conn).map_err(HandlerErr::query)?;
    let departments = db::load_departments(conn).map_err(HandlerErr::query)?;
    let streams = db::load_streams(conn).map_err(HandlerErr::query)?;
    let cats = StudentCatalogs {
        classes: &classes,
        departments: &departments,
        streams: &streams,
        fallback: &config.unknown_stream,
    };
    Ok(validate_students_table(&table, &cats)?)
}

fn students_preview_csv(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let v = validate_csv(conn, config, params)?;
    let rows: Vec<serde_json::Value> = v
        .accepted
        .iter()
        .map(|(line, s)| json!({ "rowNumber": line, "student": s }))
        .collect();
    Ok(json!({ "report": report_json(&v.report), "rows": rows }))
}

fn students_import_csv(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let Validated {
        accepted,
        mut report,
    } = validate_csv(conn, config, params)?;
    for (line, student) in &accepted {
        match db::insert_student(conn, student) {
            Ok(_) => report.succeed(),
            Err(e) => report.fail(*line, format!("{}: {}", student.roll_number, e)),
        }
    }
    info!(
        total = report.total,
        succeeded = report.succeeded,
        rejected = report.rejected,
        failed = report.failed,
        "student import finished"
    );
    Ok(json!({ "report": report_json(&report) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(with_db(state, req, |c, _, p| students_list(c, p))),
        "students.create" => Some(with_db(state, req, |c, _, p| students_create(c, p))),
        "students.update" => Some(with_db(state, req, |c, _, p| students_update(c, p))),
        "students.setStatus" => Some(with_db(state, req, |c, _, p| students_set_status(c, p))),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.previewCsv" => Some(with_db(state, req, students_preview_csv)),
        "students.importCsv" => Some(with_db(state, req, students_import_csv)),
        _ => None,
    }
}
