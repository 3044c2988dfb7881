//! Bulk import of students and timetables from CSV text and OCR output.

mod batch;
mod fields;
mod ocr;
mod students;
mod table;
mod template;
mod timetable;

use thiserror::Error;

pub use batch::{BatchReport, MAX_REPORTED_ERRORS};
pub use ocr::parse_timetable_text;
pub use students::{validate_students_table, DepartmentEntry, StudentCatalogs, ValidatedStudent};
pub use table::{parse_csv_text, TableError};
pub use template::{
    STUDENTS_TEMPLATE, STUDENTS_TEMPLATE_FILE, TIMETABLE_TEMPLATE, TIMETABLE_TEMPLATE_FILE,
};
pub use timetable::{validate_for_class, validate_timetable_table, Validated, ValidatedEntry};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("missing required columns: {}", fields.join(", "))]
    MissingColumns { fields: Vec<String> },
}
