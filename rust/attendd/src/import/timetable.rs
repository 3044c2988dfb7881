use super::batch::BatchReport;
use super::fields::{FieldIndex, ImportRow, TIMETABLE_FIELDS};
use super::table::CsvTable;
use super::ImportError;
use crate::resolve::{normalize_day, parse_period, resolve_class, ClassCatalogEntry, ResolveError};
use serde::Serialize;

/// A timetable row whose class and day are resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedEntry {
    pub class_id: String,
    pub class_name: String,
    pub day_of_week: u8,
    pub period_number: u8,
    pub subject_code: String,
    pub subject_name: String,
    pub faculty_name: String,
    pub faculty_code: Option<String>,
    pub room_number: Option<String>,
    pub is_lab: bool,
}

/// Rows that passed validation, keyed by source row number, plus a report
/// that already counts the rejected ones.
#[derive(Debug, Clone)]
pub struct Validated<T> {
    pub accepted: Vec<(usize, T)>,
    pub report: BatchReport,
}

pub fn validate_row(
    row: &ImportRow,
    catalog: &[ClassCatalogEntry],
    max_periods: u8,
) -> Result<ValidatedEntry, ResolveError> {
    let class = resolve_class(&row.class_name, catalog)?;
    let day_of_week = normalize_day(&row.day_token)?;
    let period_number = parse_period(&row.period_token, max_periods)?;
    Ok(ValidatedEntry {
        class_id: class.entry.id.clone(),
        class_name: class.entry.name.clone(),
        day_of_week,
        period_number,
        subject_code: row.subject_code.clone(),
        subject_name: row.subject_name.clone(),
        faculty_name: row.faculty_name.clone(),
        faculty_code: row.faculty_code.clone(),
        room_number: row.room_number.clone(),
        is_lab: row.is_lab,
    })
}

/// OCR rows are parsed for one class picked up front, so only the day and
/// period still need checking.
pub fn validate_for_class(
    row: &ImportRow,
    class: &ClassCatalogEntry,
    max_periods: u8,
) -> Result<ValidatedEntry, ResolveError> {
    let day_of_week = normalize_day(&row.day_token)?;
    let period_number = parse_period(&row.period_token, max_periods)?;
    Ok(ValidatedEntry {
        class_id: class.id.clone(),
        class_name: class.name.clone(),
        day_of_week,
        period_number,
        subject_code: row.subject_code.clone(),
        subject_name: row.subject_name.clone(),
        faculty_name: row.faculty_name.clone(),
        faculty_code: row.faculty_code.clone(),
        room_number: row.room_number.clone(),
        is_lab: row.is_lab,
    })
}

pub fn validate_timetable_table(
    table: &CsvTable,
    catalog: &[ClassCatalogEntry],
    max_periods: u8,
) -> Result<Validated<ValidatedEntry>, ImportError> {
    let idx = FieldIndex::for_table(table, TIMETABLE_FIELDS);
    let missing = idx.missing_columns();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns { fields: missing });
    }

    let mut report = BatchReport::new(table.rows.len());
    let mut accepted = Vec::new();
    for row in &table.rows {
        let result = ImportRow::from_csv_row(&idx, row)
            .and_then(|r| validate_row(&r, catalog, max_periods));
        match result {
            Ok(entry) => accepted.push((row.line, entry)),
            Err(e) => report.reject(row.line, e.to_string()),
        }
    }
    Ok(Validated { accepted, report })
}
