use super::status::MarkStatus;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// A recorded period of one class on one day.
#[derive(Debug, Clone)]
pub struct GridPeriod {
    pub id: String,
    pub period_number: u8,
    pub staff_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GridMark {
    pub period_id: String,
    pub roll_number: String,
    pub name: String,
    pub status: MarkStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayLabel {
    Full,
    Partial,
    Absent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    pub roll_number: String,
    pub name: String,
    pub cells: Vec<String>,
    pub label: DayLabel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyGrid {
    pub class_name: String,
    pub date: String,
    pub periods: Vec<u8>,
    pub staff: Vec<String>,
    pub rows: Vec<GridRow>,
}

fn cell(status: Option<MarkStatus>) -> &'static str {
    match status {
        Some(MarkStatus::Present) => "P",
        Some(MarkStatus::Absent) => "A",
        Some(MarkStatus::OnDuty) => "OD",
        None => "-",
    }
}

fn day_label(present: usize, marked: usize) -> DayLabel {
    if present == marked {
        DayLabel::Full
    } else if present > 0 {
        DayLabel::Partial
    } else {
        DayLabel::Absent
    }
}

/// Builds one row per marked student, ordered by roll number, with one cell
/// per recorded period in period order. Only present marks count towards the
/// FULL label; on-duty periods make the day PARTIAL.
pub fn build_grid(
    class_name: &str,
    date: &str,
    mut periods: Vec<GridPeriod>,
    marks: &[GridMark],
) -> DailyGrid {
    periods.sort_by_key(|p| p.period_number);

    let mut staff: Vec<String> = Vec::new();
    for name in periods.iter().filter_map(|p| p.staff_name.as_ref()) {
        if !name.trim().is_empty() && !staff.contains(name) {
            staff.push(name.clone());
        }
    }

    let period_number: HashMap<&str, u8> = periods
        .iter()
        .map(|p| (p.id.as_str(), p.period_number))
        .collect();

    // roll number -> (name, period -> status)
    let mut students: BTreeMap<&str, (&str, HashMap<u8, MarkStatus>)> = BTreeMap::new();
    for m in marks {
        let Some(&n) = period_number.get(m.period_id.as_str()) else {
            continue;
        };
        students
            .entry(m.roll_number.as_str())
            .or_insert_with(|| (m.name.as_str(), HashMap::new()))
            .1
            .insert(n, m.status);
    }

    let rows = students
        .into_iter()
        .map(|(roll, (name, by_period))| {
            let cells: Vec<String> = periods
                .iter()
                .map(|p| cell(by_period.get(&p.period_number).copied()).to_string())
                .collect();
            let present = by_period
                .values()
                .filter(|s| **s == MarkStatus::Present)
                .count();
            GridRow {
                roll_number: roll.to_string(),
                name: name.to_string(),
                cells,
                label: day_label(present, by_period.len()),
            }
        })
        .collect();

    DailyGrid {
        class_name: class_name.to_string(),
        date: date.to_string(),
        periods: periods.iter().map(|p| p.period_number).collect(),
        staff,
        rows,
    }
}

pub fn load_grid_periods(
    conn: &Connection,
    class_id: &str,
    date: &str,
) -> rusqlite::Result<Vec<GridPeriod>> {
    let mut stmt = conn.prepare(
        "SELECT id, period_number, faculty_name, is_alternative_staff, alternative_staff_name
         FROM period_attendance
         WHERE class_id = ? AND date = ?
         ORDER BY period_number",
    )?;
    let rows = stmt.query_map((class_id, date), |r| {
        let faculty: String = r.get(2)?;
        let is_alt = r.get::<_, i64>(3)? != 0;
        let alt: Option<String> = r.get(4)?;
        Ok(GridPeriod {
            id: r.get(0)?,
            period_number: r.get(1)?,
            staff_name: if is_alt { alt } else { Some(faculty) },
        })
    })?;
    rows.collect()
}

pub fn load_grid_marks(
    conn: &Connection,
    class_id: &str,
    date: &str,
) -> rusqlite::Result<Vec<GridMark>> {
    let mut stmt = conn.prepare(
        "SELECT psa.period_attendance_id, s.roll_number, s.name, psa.status
         FROM period_student_attendance psa
         JOIN period_attendance pa ON pa.id = psa.period_attendance_id
         JOIN students s ON s.id = psa.student_id
         WHERE pa.class_id = ? AND pa.date = ?",
    )?;
    let rows = stmt.query_map((class_id, date), |r| {
        let status: String = r.get(3)?;
        Ok(GridMark {
            period_id: r.get(0)?,
            roll_number: r.get(1)?,
            name: r.get(2)?,
            status: MarkStatus::parse(&status).unwrap_or(MarkStatus::Absent),
        })
    })?;
    rows.collect()
}
