use crate::config::Config;
use crate::db;
use crate::ipc::helpers::{
    get_optional_str, get_required_str, row_exists, with_db, DbOp, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::resolve::{expand_year_variants, map_department_to_stream, resolve_class, year_token};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

fn streams_list(
    conn: &Connection,
    _config: &Config,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let streams = db::load_streams(conn).map_err(HandlerErr::query)?;
    Ok(json!({ "streams": streams }))
}

fn departments_list(
    conn: &Connection,
    _config: &Config,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT
               d.id,
               d.name,
               d.code,
               d.stream_id,
               (SELECT COUNT(*) FROM classes c WHERE c.department_id = d.id) AS class_count
             FROM departments d
             ORDER BY d.name",
        )
        .map_err(HandlerErr::query)?;

    let departments = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let code: Option<String> = row.get(2)?;
            let stream_id: Option<String> = row.get(3)?;
            let class_count: i64 = row.get(4)?;
            Ok(json!({
                "id": id,
                "name": name,
                "code": code,
                "streamId": stream_id,
                "classCount": class_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::query)?;
    Ok(json!({ "departments": departments }))
}

fn departments_create(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let code = get_optional_str(params, "code");
    let stream_id = match get_optional_str(params, "streamId") {
        Some(id) => {
            if !row_exists(conn, "streams", &id)? {
                return Err(HandlerErr::new("not_found", "stream not found"));
            }
            id
        }
        None => {
            let streams = db::load_streams(conn).map_err(HandlerErr::query)?;
            map_department_to_stream(&name, &streams, &config.unknown_stream)?
        }
    };

    let department_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO departments(id, name, code, stream_id) VALUES(?, ?, ?, ?)",
        (&department_id, &name, &code, &stream_id),
    )
    .map_err(|e| HandlerErr::with_table("db_insert_failed", e, "departments"))?;

    Ok(json!({
        "departmentId": department_id,
        "name": name,
        "code": code,
        "streamId": stream_id
    }))
}

fn departments_delete(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let department_id = get_required_str(params, "departmentId")?;
    if !row_exists(conn, "departments", &department_id)? {
        return Err(HandlerErr::new("not_found", "department not found"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;

    // Classes and students keep existing; they only lose the link.
    for (table, sql) in [
        (
            "students",
            "UPDATE students SET department_id = NULL WHERE department_id = ?",
        ),
        (
            "classes",
            "UPDATE classes SET department_id = NULL WHERE department_id = ?",
        ),
    ] {
        tx.execute(sql, [&department_id])
            .map_err(|e| HandlerErr::with_table("db_update_failed", e, table))?;
    }
    tx.execute("DELETE FROM departments WHERE id = ?", [&department_id])
        .map_err(|e| HandlerErr::with_table("db_delete_failed", e, "departments"))?;
    tx.commit()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;

    Ok(json!({ "ok": true }))
}

fn classes_list(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let stream_filter = get_optional_str(params, "streamId");

    let mut stmt = conn
        .prepare(
            "SELECT
               c.id,
               c.name,
               c.department_id,
               c.stream_id,
               (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id) AS student_count,
               (SELECT COUNT(*) FROM timetable t WHERE t.class_id = c.id) AS slot_count
             FROM classes c
             WHERE (?1 IS NULL OR c.stream_id = ?1)
             ORDER BY c.name",
        )
        .map_err(HandlerErr::query)?;

    let classes = stmt
        .query_map([&stream_filter], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let department_id: Option<String> = row.get(2)?;
            let stream_id: Option<String> = row.get(3)?;
            let student_count: i64 = row.get(4)?;
            let slot_count: i64 = row.get(5)?;
            Ok(json!({
                "id": id,
                "name": name,
                "departmentId": department_id,
                "streamId": stream_id,
                "year": year_token(&name),
                "studentCount": student_count,
                "timetableSlotCount": slot_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::query)?;
    Ok(json!({ "classes": classes }))
}

fn classes_create(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let department_id = get_optional_str(params, "departmentId");
    let mut stream_id = get_optional_str(params, "streamId");

    if let Some(dep) = &department_id {
        let dep_stream: Option<Option<String>> = conn
            .query_row(
                "SELECT stream_id FROM departments WHERE id = ?",
                [dep],
                |r| r.get(0),
            )
            .optional()
            .map_err(HandlerErr::query)?;
        let Some(dep_stream) = dep_stream else {
            return Err(HandlerErr::new("not_found", "department not found"));
        };
        if stream_id.is_none() {
            stream_id = dep_stream;
        }
    }
    if let Some(s) = &stream_id {
        if !row_exists(conn, "streams", s)? {
            return Err(HandlerErr::new("not_found", "stream not found"));
        }
    }

    // A name that already resolves to a class, by any resolver step, is a
    // duplicate.
    let catalog = db::load_class_catalog(conn).map_err(HandlerErr::query)?;
    if let Ok(hit) = resolve_class(&name, &catalog) {
        return Err(HandlerErr {
            code: "bad_params",
            message: format!(
                "class \"{}\" is equivalent to existing class \"{}\"",
                name, hit.entry.name
            ),
            details: Some(json!({ "classId": hit.entry.id, "step": hit.step })),
        });
    }

    let class_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO classes(id, name, department_id, stream_id) VALUES(?, ?, ?, ?)",
        (&class_id, &name, &department_id, &stream_id),
    )
    .map_err(|e| HandlerErr::with_table("db_insert_failed", e, "classes"))?;

    Ok(json!({
        "classId": class_id,
        "name": name,
        "departmentId": department_id,
        "streamId": stream_id
    }))
}

/// Deletes everything owned by the given classes, children first.
pub fn delete_classes_cascade(
    tx: &rusqlite::Transaction<'_>,
    class_filter_sql: &str,
    key: &str,
) -> Result<usize, HandlerErr> {
    let steps = [
        (
            "period_student_attendance",
            format!(
                "DELETE FROM period_student_attendance
                 WHERE period_attendance_id IN (
                   SELECT id FROM period_attendance WHERE class_id IN ({class_filter_sql})
                 )"
            ),
        ),
        (
            "period_attendance",
            format!("DELETE FROM period_attendance WHERE class_id IN ({class_filter_sql})"),
        ),
        (
            "timetable",
            format!("DELETE FROM timetable WHERE class_id IN ({class_filter_sql})"),
        ),
        (
            "students",
            format!("DELETE FROM students WHERE class_id IN ({class_filter_sql})"),
        ),
    ];
    for (table, sql) in steps.iter() {
        tx.execute(sql, [key])
            .map_err(|e| HandlerErr::with_table("db_delete_failed", e, table))?;
    }
    tx.execute(
        &format!("DELETE FROM classes WHERE id IN ({class_filter_sql})"),
        [key],
    )
    .map_err(|e| HandlerErr::with_table("db_delete_failed", e, "classes"))
}

fn classes_delete(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if !row_exists(conn, "classes", &class_id)? {
        return Err(HandlerErr::new("not_found", "class not found"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    delete_classes_cascade(&tx, "SELECT ?", &class_id)?;
    tx.commit()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;

    info!(class_id = %class_id, "class deleted");
    Ok(json!({ "ok": true }))
}

fn classes_resolve(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let label = get_required_str(params, "label")?;
    let catalog = db::load_class_catalog(conn).map_err(HandlerErr::query)?;
    let hit = resolve_class(&label, &catalog)?;
    let variants = expand_year_variants(&label);
    Ok(json!({
        "classId": hit.entry.id,
        "name": hit.entry.name,
        "departmentId": hit.entry.department_id,
        "step": hit.step,
        "labelVariants": {
            "withDigits": variants.with_digits,
            "withRoman": variants.with_roman
        }
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let op: DbOp = match req.method.as_str() {
        "streams.list" => streams_list,
        "departments.list" => departments_list,
        "departments.create" => departments_create,
        "departments.delete" => departments_delete,
        "classes.list" => classes_list,
        "classes.create" => classes_create,
        "classes.delete" => classes_delete,
        "classes.resolve" => classes_resolve,
        _ => return None,
    };
    Some(with_db(state, req, op))
}
