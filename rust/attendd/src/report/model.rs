use super::status::{status_style, Approval, MarkStatus, StatusStyle};
use rusqlite::Connection;
use serde::Serialize;

/// One student's mark in one recorded period, flattened for reporting.
#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub roll_number: String,
    pub name: String,
    pub class_name: String,
    pub date: String,
    pub period_number: u8,
    pub subject_code: String,
    pub subject_name: String,
    pub faculty_name: String,
    pub alternative_staff: Option<String>,
    pub status: MarkStatus,
    pub approval: Option<Approval>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub roll_number: String,
    pub name: String,
    pub class_name: String,
    pub date: String,
    pub period_number: u8,
    pub subject: String,
    pub faculty: String,
    pub is_alternative_staff: bool,
    pub status: MarkStatus,
    pub approval: Option<Approval>,
    pub style: StatusStyle,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub sessions: usize,
    pub marked: usize,
    pub present: usize,
    pub absent: usize,
    pub on_duty: usize,
    /// Percentage of marks that are present, one decimal.
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub class_name: Option<String>,
    pub summary: ReportSummary,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone)]
pub struct ReportFilter {
    pub start_date: String,
    pub end_date: String,
    pub class_id: Option<String>,
}

/// Sorts by date, period, then roll number, and attaches display styles.
/// Alternative staff replace the timetabled faculty in the faculty column.
pub fn build_report(
    title: &str,
    filter: &ReportFilter,
    class_name: Option<String>,
    mut records: Vec<AttendanceRecord>,
) -> AttendanceReport {
    records.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.period_number.cmp(&b.period_number))
            .then_with(|| a.roll_number.cmp(&b.roll_number))
    });

    let mut summary = ReportSummary::default();
    let mut sessions = std::collections::HashSet::new();
    let rows: Vec<ReportRow> = records
        .into_iter()
        .map(|r| {
            sessions.insert((r.class_name.clone(), r.date.clone(), r.period_number));
            summary.marked += 1;
            match r.status {
                MarkStatus::Present => summary.present += 1,
                MarkStatus::Absent => summary.absent += 1,
                MarkStatus::OnDuty => summary.on_duty += 1,
            }
            let is_alternative_staff = r.alternative_staff.is_some();
            ReportRow {
                subject: format!("{} - {}", r.subject_code, r.subject_name),
                faculty: r.alternative_staff.unwrap_or(r.faculty_name),
                is_alternative_staff,
                style: status_style(r.status, r.approval),
                status: r.status,
                approval: r.approval,
                roll_number: r.roll_number,
                name: r.name,
                class_name: r.class_name,
                date: r.date,
                period_number: r.period_number,
            }
        })
        .collect();

    summary.sessions = sessions.len();
    if summary.marked > 0 {
        let pct = summary.present as f64 * 100.0 / summary.marked as f64;
        summary.rate = (pct * 10.0).round() / 10.0;
    }

    AttendanceReport {
        title: title.to_string(),
        start_date: filter.start_date.clone(),
        end_date: filter.end_date.clone(),
        class_name,
        summary,
        rows,
    }
}

pub fn load_records(
    conn: &Connection,
    filter: &ReportFilter,
) -> rusqlite::Result<Vec<AttendanceRecord>> {
    let mut stmt = conn.prepare(
        "SELECT s.roll_number, s.name, c.name, pa.date, pa.period_number,
                pa.subject_code, pa.subject_name, pa.faculty_name,
                pa.is_alternative_staff, pa.alternative_staff_name,
                psa.status, psa.approval_status
         FROM period_student_attendance psa
         JOIN period_attendance pa ON pa.id = psa.period_attendance_id
         JOIN students s ON s.id = psa.student_id
         JOIN classes c ON c.id = pa.class_id
         WHERE pa.date >= ?1 AND pa.date <= ?2
           AND (?3 IS NULL OR pa.class_id = ?3)",
    )?;
    let rows = stmt.query_map(
        (&filter.start_date, &filter.end_date, &filter.class_id),
        |r| {
            let is_alt = r.get::<_, i64>(8)? != 0;
            let alt_name: Option<String> = r.get(9)?;
            let status: String = r.get(10)?;
            let approval: Option<String> = r.get(11)?;
            Ok(AttendanceRecord {
                roll_number: r.get(0)?,
                name: r.get(1)?,
                class_name: r.get(2)?,
                date: r.get(3)?,
                period_number: r.get(4)?,
                subject_code: r.get(5)?,
                subject_name: r.get(6)?,
                faculty_name: r.get(7)?,
                alternative_staff: if is_alt { alt_name } else { None },
                status: MarkStatus::parse(&status).unwrap_or(MarkStatus::Absent),
                approval: approval.as_deref().and_then(Approval::parse),
            })
        },
    )?;
    rows.collect()
}
