use crate::allocation;
use crate::config::Config;
use crate::db;
use crate::import::{
    parse_csv_text, parse_timetable_text, validate_for_class, validate_timetable_table,
    BatchReport, Validated, ValidatedEntry,
};
use crate::ipc::helpers::{
    get_optional_bool, get_optional_str, get_required_str, read_text_input, report_json,
    with_db, DbOp, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::resolve::{check_period, day_label, normalize_day, ClassCatalogEntry, ResolveError};
use chrono::NaiveTime;
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashMap;
use tracing::info;

fn find_class(conn: &Connection, class_id: &str) -> Result<ClassCatalogEntry, HandlerErr> {
    db::load_class_catalog(conn)
        .map_err(HandlerErr::query)?
        .into_iter()
        .find(|c| c.id == class_id)
        .ok_or_else(|| HandlerErr::new("not_found", "class not found"))
}

fn timetable_list(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let entries = db::load_timetable(conn, &class_id).map_err(HandlerErr::query)?;
    let times: HashMap<u8, String> = db::load_period_times(conn)
        .map_err(HandlerErr::query)?
        .into_iter()
        .map(|t| (t.period_number, t.range()))
        .collect();
    let entries: Vec<serde_json::Value> = entries
        .into_iter()
        .map(|e| {
            let mut v = serde_json::to_value(&e).unwrap_or_else(|_| json!({}));
            v["dayLabel"] = json!(day_label(e.day_of_week));
            v["timeRange"] = json!(times.get(&e.period_number));
            v
        })
        .collect();
    Ok(json!({ "entries": entries }))
}

/// Day may be a name ("Tue") or a number 1..=6.
fn day_param(params: &serde_json::Value) -> Result<u8, HandlerErr> {
    match params.get("dayOfWeek") {
        Some(serde_json::Value::Number(n)) => {
            let token = n.to_string();
            match n.as_i64() {
                Some(d @ 1..=6) => Ok(d as u8),
                _ => Err(ResolveError::InvalidDay { token }.into()),
            }
        }
        Some(serde_json::Value::String(s)) => Ok(normalize_day(s)?),
        _ => Err(HandlerErr::bad_params("missing dayOfWeek")),
    }
}

fn timetable_create(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let class = find_class(conn, &class_id)?;
    let day_of_week = day_param(params)?;
    let period = params
        .get("periodNumber")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params("missing periodNumber"))?;
    let period_number = check_period(period, config.max_periods)?;

    let entry = ValidatedEntry {
        class_id: class.id,
        class_name: class.name,
        day_of_week,
        period_number,
        subject_code: get_required_str(params, "subjectCode")?,
        subject_name: get_required_str(params, "subjectName")?,
        faculty_name: get_required_str(params, "facultyName")?,
        faculty_code: get_optional_str(params, "facultyCode"),
        room_number: get_optional_str(params, "roomNumber"),
        is_lab: get_optional_bool(params, "isLab"),
    };
    let timetable_id = db::insert_timetable_entry(conn, &entry)
        .map_err(|e| HandlerErr::with_table("db_insert_failed", e, "timetable"))?;
    Ok(json!({ "timetableId": timetable_id, "entry": entry }))
}

/// Accepts `HH:MM` or `HH:MM:SS` and keeps minutes precision.
fn parse_clock(params: &serde_json::Value, key: &str) -> Result<NaiveTime, HandlerErr> {
    let raw = get_required_str(params, key)?;
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
        .map_err(|_| HandlerErr::bad_params(format!("{key} must be HH:MM, got {raw:?}")))
}

fn timetable_period_times(
    conn: &Connection,
    _config: &Config,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let times = db::load_period_times(conn).map_err(HandlerErr::query)?;
    Ok(json!({ "periodTimes": times }))
}

fn timetable_set_period_time(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let period = params
        .get("periodNumber")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params("missing periodNumber"))?;
    let period_number = check_period(period, config.max_periods)?;
    let start = parse_clock(params, "startTime")?;
    let end = parse_clock(params, "endTime")?;
    if end <= start {
        return Err(HandlerErr::bad_params("endTime must be after startTime"));
    }
    let time = db::PeriodTime {
        period_number,
        start_time: start.format("%H:%M").to_string(),
        end_time: end.format("%H:%M").to_string(),
    };
    db::upsert_period_time(conn, &time)
        .map_err(|e| HandlerErr::with_table("db_insert_failed", e, "period_times"))?;
    Ok(json!({ "periodTime": time }))
}

fn timetable_delete(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let timetable_id = get_required_str(params, "timetableId")?;
    let changed = conn
        .execute("DELETE FROM timetable WHERE id = ?", [&timetable_id])
        .map_err(|e| HandlerErr::with_table("db_delete_failed", e, "timetable"))?;
    if changed == 0 {
        return Err(HandlerErr::new("not_found", "timetable entry not found"));
    }
    Ok(json!({ "ok": true }))
}

fn validate_csv(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<Validated<ValidatedEntry>, HandlerErr> {
    let text = read_text_input(params)?;
    let table =
        parse_csv_text(&text).map_err(|e| HandlerErr::new("parse_failed", e.to_string()))?;
    let catalog = db::load_class_catalog(conn).map_err(HandlerErr::query)?;
    Ok(validate_timetable_table(&table, &catalog, config.max_periods)?)
}

/// OCR rows are numbered by their position in the parsed output.
fn validate_ocr(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<Validated<ValidatedEntry>, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let class = find_class(conn, &class_id)?;
    let text = read_text_input(params)?;
    let rows = parse_timetable_text(&text, &class.name);
    if rows.is_empty() {
        return Err(HandlerErr::new(
            "parse_failed",
            "no timetable rows found in the text",
        ));
    }

    let mut report = BatchReport::new(rows.len());
    let mut accepted = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        match validate_for_class(row, &class, config.max_periods) {
            Ok(entry) => accepted.push((i + 1, entry)),
            Err(e) => report.reject(i + 1, e.to_string()),
        }
    }
    Ok(Validated { accepted, report })
}

fn preview(v: Validated<ValidatedEntry>) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = v
        .accepted
        .iter()
        .map(|(line, e)| json!({ "rowNumber": line, "entry": e }))
        .collect();
    json!({ "report": report_json(&v.report), "rows": rows })
}

fn insert_all(conn: &Connection, v: Validated<ValidatedEntry>, source: &str) -> serde_json::Value {
    let Validated {
        accepted,
        mut report,
    } = v;
    for (line, entry) in &accepted {
        match db::insert_timetable_entry(conn, entry) {
            Ok(_) => report.succeed(),
            Err(e) => report.fail(*line, e.to_string()),
        }
    }
    info!(
        source,
        total = report.total,
        succeeded = report.succeeded,
        rejected = report.rejected,
        failed = report.failed,
        "timetable import finished"
    );
    json!({ "report": report_json(&report) })
}

fn timetable_preview_csv(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    Ok(preview(validate_csv(conn, config, params)?))
}

fn timetable_import_csv(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let v = validate_csv(conn, config, params)?;
    Ok(insert_all(conn, v, "csv"))
}

fn timetable_preview_ocr(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    Ok(preview(validate_ocr(conn, config, params)?))
}

fn timetable_import_ocr(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let v = validate_ocr(conn, config, params)?;
    Ok(insert_all(conn, v, "ocr"))
}

fn timetable_subject_allocation(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let class = find_class(conn, &class_id)?;
    let entries = db::load_timetable(conn, &class.id).map_err(HandlerErr::query)?;
    let subjects = allocation::aggregate(&entries);
    let total_hours: u32 = subjects.iter().map(|s| s.hours_per_week).sum();
    Ok(json!({
        "classId": class.id,
        "className": class.name,
        "subjects": subjects,
        "totalHours": total_hours
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let op: DbOp = match req.method.as_str() {
        "timetable.list" => timetable_list,
        "timetable.create" => timetable_create,
        "timetable.delete" => timetable_delete,
        "timetable.previewCsv" => timetable_preview_csv,
        "timetable.importCsv" => timetable_import_csv,
        "timetable.previewOcrText" => timetable_preview_ocr,
        "timetable.importOcrText" => timetable_import_ocr,
        "timetable.subjectAllocation" => timetable_subject_allocation,
        "timetable.periodTimes" => timetable_period_times,
        "timetable.setPeriodTime" => timetable_set_period_time,
        _ => return None,
    };
    Some(with_db(state, req, op))
}
