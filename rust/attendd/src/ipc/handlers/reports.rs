use crate::config::Config;
use crate::ipc::helpers::{
    get_optional_str, get_required_str, parse_date, with_db, DbOp, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::report::{
    build_grid, build_report, load_grid_marks, load_grid_periods, load_records,
    render_attendance_pdf, render_daily_grid_pdf, render_digest, summarize_class,
    AttendanceReport, Approval, DailyGrid, DayMark, MarkStatus, ReportFilter, ReporterRole,
    ShortReport,
};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

const ATTENDANCE_REPORT_TITLE: &str = "Attendance Report";

fn class_name(conn: &Connection, class_id: &str) -> Result<String, HandlerErr> {
    conn.query_row("SELECT name FROM classes WHERE id = ?", [class_id], |r| {
        r.get(0)
    })
    .optional()
    .map_err(HandlerErr::query)?
    .ok_or_else(|| HandlerErr::new("not_found", "class not found"))
}

fn count_students(conn: &Connection, class_id: &str, status: Option<&str>) -> Result<u32, HandlerErr> {
    conn.query_row(
        "SELECT COUNT(*) FROM students WHERE class_id = ?1 AND (?2 IS NULL OR status = ?2)",
        (class_id, status),
        |r| r.get(0),
    )
    .map_err(HandlerErr::query)
}

fn day_marks(conn: &Connection, class_id: &str, date: &str) -> Result<Vec<DayMark>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT psa.student_id, psa.status, psa.approval_status
             FROM period_student_attendance psa
             JOIN period_attendance pa ON pa.id = psa.period_attendance_id
             WHERE pa.class_id = ? AND pa.date = ?
             ORDER BY pa.period_number",
        )
        .map_err(HandlerErr::query)?;
    stmt.query_map((class_id, date), |r| {
        let status: String = r.get(1)?;
        let approval: Option<String> = r.get(2)?;
        Ok(DayMark {
            student_id: r.get(0)?,
            status: MarkStatus::parse(&status).unwrap_or(MarkStatus::Absent),
            approval: approval.as_deref().and_then(Approval::parse),
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(HandlerErr::query)
}

fn stream_class_ids(conn: &Connection, stream_id: &str) -> Result<Vec<String>, HandlerErr> {
    let mut stmt = conn
        .prepare("SELECT id FROM classes WHERE stream_id = ? ORDER BY name")
        .map_err(HandlerErr::query)?;
    stmt.query_map([stream_id], |r| r.get(0))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::query)
}

fn reports_short_report(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let stream_id = get_required_str(params, "streamId")?;
    let date = parse_date(&get_required_str(params, "date")?)?;
    let role = match get_optional_str(params, "reporterRole") {
        Some(raw) => ReporterRole::parse(&raw).ok_or_else(|| {
            HandlerErr::bad_params(format!(
                "reporterRole must be programCoordinator or dean, got {raw:?}"
            ))
        })?,
        None => ReporterRole::ProgramCoordinator,
    };
    // A dean's digest may leave the name out.
    let reporter = match role {
        ReporterRole::ProgramCoordinator => get_required_str(params, "reporter")?,
        ReporterRole::Dean => get_optional_str(params, "reporter").unwrap_or_default(),
    };

    let stream: Option<(String, String)> = conn
        .query_row(
            "SELECT name, code FROM streams WHERE id = ?",
            [&stream_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .map_err(HandlerErr::query)?;
    let Some((stream_name, stream_code)) = stream else {
        return Err(HandlerErr::new("not_found", "stream not found"));
    };

    let class_ids: Vec<String> = match params.get("classIds").and_then(|v| v.as_array()) {
        Some(ids) => ids
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        None => stream_class_ids(conn, &stream_id)?,
    };

    let date_key = date.format("%Y-%m-%d").to_string();
    let mut classes = Vec::with_capacity(class_ids.len());
    for class_id in &class_ids {
        let name = class_name(conn, class_id)?;
        let total = count_students(conn, class_id, None)?;
        let suspended = count_students(conn, class_id, Some("suspended"))?;
        let intern = count_students(conn, class_id, Some("intern"))?;
        let marks = day_marks(conn, class_id, &date_key)?;
        classes.push(summarize_class(&name, total, &marks, suspended, intern));
    }

    let report = ShortReport {
        stream_name,
        stream_code,
        date,
        classes,
    };
    let text = render_digest(&report, role, &reporter);
    Ok(json!({ "report": report, "reporterRole": role, "text": text }))
}

fn load_attendance_report(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<AttendanceReport, HandlerErr> {
    let start = parse_date(&get_required_str(params, "startDate")?)?;
    let end = parse_date(&get_required_str(params, "endDate")?)?;
    if end < start {
        return Err(HandlerErr::bad_params("endDate is before startDate"));
    }
    let class_id = get_optional_str(params, "classId");
    let class_label = match &class_id {
        Some(id) => Some(class_name(conn, id)?),
        None => None,
    };
    let filter = ReportFilter {
        start_date: start.format("%Y-%m-%d").to_string(),
        end_date: end.format("%Y-%m-%d").to_string(),
        class_id,
    };
    let records = load_records(conn, &filter).map_err(HandlerErr::query)?;
    let title = get_optional_str(params, "title")
        .unwrap_or_else(|| ATTENDANCE_REPORT_TITLE.to_string());
    Ok(build_report(&title, &filter, class_label, records))
}

fn reports_attendance_model(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let report = load_attendance_report(conn, params)?;
    Ok(json!({ "report": report }))
}

fn reports_attendance_pdf(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let out_path = PathBuf::from(get_required_str(params, "outPath")?);
    let report = load_attendance_report(conn, params)?;
    render_attendance_pdf(&report, config, &out_path).map_err(|e| HandlerErr {
        code: "pdf_failed",
        message: format!("{e:#}"),
        details: Some(json!({ "outPath": out_path.to_string_lossy() })),
    })?;
    info!(path = %out_path.display(), rows = report.rows.len(), "attendance pdf written");
    Ok(json!({
        "outPath": out_path.to_string_lossy(),
        "rowCount": report.rows.len(),
        "summary": report.summary
    }))
}

fn load_daily_grid(conn: &Connection, params: &serde_json::Value) -> Result<DailyGrid, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let date = parse_date(&get_required_str(params, "date")?)?;
    let name = class_name(conn, &class_id)?;
    let date_key = date.format("%Y-%m-%d").to_string();
    let periods = load_grid_periods(conn, &class_id, &date_key).map_err(HandlerErr::query)?;
    let marks = load_grid_marks(conn, &class_id, &date_key).map_err(HandlerErr::query)?;
    Ok(build_grid(&name, &date_key, periods, &marks))
}

fn reports_daily_grid_model(
    conn: &Connection,
    _config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let grid = load_daily_grid(conn, params)?;
    Ok(json!({ "grid": grid }))
}

fn reports_daily_grid_pdf(
    conn: &Connection,
    config: &Config,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let out_path = PathBuf::from(get_required_str(params, "outPath")?);
    let grid = load_daily_grid(conn, params)?;
    if grid.periods.is_empty() {
        return Err(HandlerErr {
            code: "not_found",
            message: format!(
                "no attendance was marked for {} on {}",
                grid.class_name, grid.date
            ),
            details: Some(json!({ "className": grid.class_name, "date": grid.date })),
        });
    }
    render_daily_grid_pdf(&grid, config, &out_path).map_err(|e| HandlerErr {
        code: "pdf_failed",
        message: format!("{e:#}"),
        details: Some(json!({ "outPath": out_path.to_string_lossy() })),
    })?;
    info!(path = %out_path.display(), students = grid.rows.len(), "daily grid pdf written");
    Ok(json!({
        "outPath": out_path.to_string_lossy(),
        "periodCount": grid.periods.len(),
        "rowCount": grid.rows.len()
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let op: DbOp = match req.method.as_str() {
        "reports.shortReport" => reports_short_report,
        "reports.attendanceModel" => reports_attendance_model,
        "reports.attendancePdf" => reports_attendance_pdf,
        "reports.dailyGridModel" => reports_daily_grid_model,
        "reports.dailyGridPdf" => reports_daily_grid_pdf,
        _ => return None,
    };
    Some(with_db(state, req, op))
}
