use crate::config::Config;
use crate::ipc::helpers::{
    get_optional_str, get_required_str, parse_date, row_exists, with_db, DbOp, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::report::{Approval, MarkStatus};
use crate::resolve::check_period;
use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

struct Mark {
    student_id: String,
    status: MarkStatus,
    approval: Option<Approval>,
}

struct Subject {
    timetable_id: Option<String>,
    code: String,
    name: String,
    faculty: String,
}

fn parse_marks(params: &serde_json::Value) -> Result<Vec<Mark>, HandlerErr> {
    let Some(items) = params.get("marks").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing marks"));
    };
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let student_id = get_required_str(item, "studentId")?;
        if !seen.insert(student_id.clone()) {
            return Err(HandlerErr::bad_params(format!(
                "student {} is marked twice",
                student_id
            )));
        }
        let raw_status = get_required_str(item, "status")?;
        let status = MarkStatus::parse(&raw_status).ok_or_else(|| {
            HandlerErr::bad_params(format!("unknown status {raw_status:?}"))
        })?;
        let approval = match get_optional_str(item, "approval") {
            None => None,
            Some(a) => Some(
                Approval::parse(&a)
                    .ok_or_else(|| HandlerErr::bad_params(format!("unknown approval {a:?}")))?,
            ),
        };
        out.push(Mark {
            student_id,
            status,
            // Approval only qualifies an absence.
            approval: if status == MarkStatus::Absent {
                approval
            } else {
                None
            },
        });
    }
    Ok(out)
}

/// Subject details come from the request when given, otherwise from the
/// timetable slot for that weekday and period.
fn resolve_subject(
    conn: &Connection,
    params: &serde_json::Value,
    class_id: &str,
    date: NaiveDate,
    period_number: u8,
) -> Result<Subject, HandlerErr> {
    type Slot = (String, String, String, String);
    let slot: Option<Slot> = match get_optional_str(params, "timetableId") {
        Some(id) => {
            let row: Option<Slot> = conn
                .query_row(
                    "SELECT id, subject_code, subject_name, faculty_name
                     FROM timetable WHERE id = ? AND class_id = ?",
                    (&id, class_id),
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
                )
                .optional()
                .map_err(HandlerErr::query)?;
            if row.is_none() {
                return Err(HandlerErr::new("not_found", "timetable entry not found"));
            }
            row
        }
        None => conn
            .query_row(
                "SELECT id, subject_code, subject_name, faculty_name
                 FROM timetable
                 WHERE class_id = ? AND day_of_week = ? AND period_number = ?
                 ORDER BY rowid LIMIT 1",
                (class_id, date.weekday().number_from_monday(), period_number),
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()
            .map_err(HandlerErr::query)?,
    };

    let (timetable_id, code, name, faculty) = match slot {
        Some((id, c, n, f)) => (Some(id), Some(c), Some(n), Some(f)),
        None => (None, None, None, None),
    };
    let pick = |key: &str, fallback: Option<String>| {
        get_optional_str(params, key)
            .or(fallback)
            .ok_or_else(|| HandlerErr::bad_params(format!("missing {key} and no timetable slot")))
    };
    Ok(Subject {
        timetable_id,
        code: pick("subjectCode", code)?,
        name: pick("subjectName", name)?,
        faculty: pick("facultyName", faculty)?,
    })
}

fn attendance_mark_period(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if !row_exists(conn, "classes", &class_id)? {
        return Err(HandlerErr::new("not_found", "class not found"));
    }
    let date = parse_date(&get_required_str(params, "date")?)?;
    let period = params
        .get("periodNumber")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params("missing periodNumber"))?;
    let period_number = check_period(period, config.max_periods)?;
    let marks = parse_marks(params)?;
    let subject = resolve_subject(conn, params, &class_id, date, period_number)?;
    let alternative_staff = get_optional_str(params, "alternativeStaffName");

    let class_students: HashSet<String> = {
        let mut stmt = conn
            .prepare("SELECT id FROM students WHERE class_id = ?")
            .map_err(HandlerErr::query)?;
        let ids = stmt
            .query_map([&class_id], |r| r.get(0))
            .and_then(|it| it.collect::<Result<HashSet<_>, _>>())
            .map_err(HandlerErr::query)?;
        ids
    };
    if let Some(m) = marks.iter().find(|m| !class_students.contains(&m.student_id)) {
        return Err(HandlerErr {
            code: "bad_params",
            message: "student does not belong to this class".to_string(),
            details: Some(json!({ "studentId": m.student_id })),
        });
    }

    let date_key = date.format("%Y-%m-%d").to_string();
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;

    // Re-marking a period replaces its previous marks.
    let existing: Option<String> = tx
        .query_row(
            "SELECT id FROM period_attendance WHERE class_id = ? AND date = ? AND period_number = ?",
            (&class_id, &date_key, period_number),
            |r| r.get(0),
        )
        .optional()
        .map_err(HandlerErr::query)?;
    let period_id = match existing {
        Some(id) => {
            tx.execute(
                "DELETE FROM period_student_attendance WHERE period_attendance_id = ?",
                [&id],
            )
            .map_err(|e| {
                HandlerErr::with_table("db_delete_failed", e, "period_student_attendance")
            })?;
            tx.execute("DELETE FROM period_attendance WHERE id = ?", [&id])
                .map_err(|e| HandlerErr::with_table("db_delete_failed", e, "period_attendance"))?;
            id
        }
        None => Uuid::new_v4().to_string(),
    };

    tx.execute(
        "INSERT INTO period_attendance(
            id, class_id, timetable_id, date, period_number, subject_code, subject_name,
            faculty_name, is_alternative_staff, alternative_staff_name, marked_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            period_id,
            class_id,
            subject.timetable_id,
            date_key,
            period_number,
            subject.code,
            subject.name,
            subject.faculty,
            alternative_staff.is_some() as i64,
            alternative_staff,
            chrono::Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| HandlerErr::with_table("db_insert_failed", e, "period_attendance"))?;

    for m in &marks {
        tx.execute(
            "INSERT INTO period_student_attendance(
                id, period_attendance_id, student_id, status, approval_status
             ) VALUES(?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                &period_id,
                &m.student_id,
                m.status.as_str(),
                m.approval.map(|a| a.as_str()),
            ),
        )
        .map_err(|e| HandlerErr::with_table("db_insert_failed", e, "period_student_attendance"))?;
    }
    tx.commit()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;

    let present = marks
        .iter()
        .filter(|m| m.status == MarkStatus::Present)
        .count();
    info!(
        class_id = %class_id,
        date = %date_key,
        period = period_number,
        marked = marks.len(),
        present,
        "period marked"
    );
    Ok(json!({
        "periodAttendanceId": period_id,
        "marked": marks.len(),
        "present": present,
        "isAlternativeStaff": alternative_staff.is_some()
    }))
}

fn attendance_period_list(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_optional_str(params, "classId");
    let date = match get_optional_str(params, "date") {
        Some(d) => Some(parse_date(&d)?.format("%Y-%m-%d").to_string()),
        None => None,
    };

    let mut stmt = conn
        .prepare(
            "SELECT pa.id, pa.class_id, c.name, pa.date, pa.period_number, pa.subject_code,
                    pa.subject_name, pa.faculty_name, pa.is_alternative_staff,
                    pa.alternative_staff_name, pa.marked_at,
                    (SELECT COUNT(*) FROM period_student_attendance x
                      WHERE x.period_attendance_id = pa.id AND x.status = 'present'),
                    (SELECT COUNT(*) FROM period_student_attendance x
                      WHERE x.period_attendance_id = pa.id AND x.status = 'absent'),
                    (SELECT COUNT(*) FROM period_student_attendance x
                      WHERE x.period_attendance_id = pa.id AND x.status = 'on_duty')
             FROM period_attendance pa
             JOIN classes c ON c.id = pa.class_id
             WHERE (?1 IS NULL OR pa.class_id = ?1)
               AND (?2 IS NULL OR pa.date = ?2)
             ORDER BY pa.date DESC, c.name, pa.period_number",
        )
        .map_err(HandlerErr::query)?;
    let periods = stmt
        .query_map((&class_id, &date), |r| {
            let id: String = r.get(0)?;
            let class_id: String = r.get(1)?;
            let class_name: String = r.get(2)?;
            let date: String = r.get(3)?;
            let period_number: i64 = r.get(4)?;
            let subject_code: String = r.get(5)?;
            let subject_name: String = r.get(6)?;
            let faculty_name: String = r.get(7)?;
            let is_alt = r.get::<_, i64>(8)? != 0;
            let alt_name: Option<String> = r.get(9)?;
            let marked_at: String = r.get(10)?;
            let present: i64 = r.get(11)?;
            let absent: i64 = r.get(12)?;
            let on_duty: i64 = r.get(13)?;
            Ok(json!({
                "id": id,
                "classId": class_id,
                "className": class_name,
                "date": date,
                "periodNumber": period_number,
                "subjectCode": subject_code,
                "subjectName": subject_name,
                "facultyName": faculty_name,
                "isAlternativeStaff": is_alt,
                "alternativeStaffName": alt_name,
                "markedAt": marked_at,
                "present": present,
                "absent": absent,
                "onDuty": on_duty
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::query)?;
    Ok(json!({ "periods": periods }))
}

fn attendance_set_approval(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let period_id = get_required_str(params, "periodAttendanceId")?;
    let student_id = get_required_str(params, "studentId")?;
    let approval = match get_optional_str(params, "approval") {
        None => None,
        Some(a) => Some(
            Approval::parse(&a)
                .ok_or_else(|| HandlerErr::bad_params(format!("unknown approval {a:?}")))?,
        ),
    };

    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM period_student_attendance
             WHERE period_attendance_id = ? AND student_id = ?",
            (&period_id, &student_id),
            |r| r.get(0),
        )
        .optional()
        .map_err(HandlerErr::query)?;
    let Some(status) = status else {
        return Err(HandlerErr::new("not_found", "mark not found"));
    };
    if MarkStatus::parse(&status) != Some(MarkStatus::Absent) {
        return Err(HandlerErr::bad_params("only absences can be approved"));
    }

    conn.execute(
        "UPDATE period_student_attendance SET approval_status = ?
         WHERE period_attendance_id = ? AND student_id = ?",
        (approval.map(|a| a.as_str()), &period_id, &student_id),
    )
    .map_err(|e| HandlerErr::with_table("db_update_failed", e, "period_student_attendance"))?;

    Ok(json!({ "approval": approval }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let op: DbOp = match req.method.as_str() {
        "attendance.markPeriod" => attendance_mark_period,
        "attendance.periodList" => attendance_period_list,
        "attendance.setApproval" => attendance_set_approval,
        _ => return None,
    };
    Some(with_db(state, req, op))
}
