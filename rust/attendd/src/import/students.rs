use super::fields::{FieldIndex, StudentImportRow, STUDENT_FIELDS};
use super::table::CsvTable;
use super::timetable::Validated;
use super::{BatchReport, ImportError};
use crate::resolve::{
    map_department_to_stream, resolve_class, ClassCatalogEntry, ResolveError, Stream,
    StreamFallback,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentEntry {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
}

/// Everything the student importer resolves against.
pub struct StudentCatalogs<'a> {
    pub classes: &'a [ClassCatalogEntry],
    pub departments: &'a [DepartmentEntry],
    pub streams: &'a [Stream],
    pub fallback: &'a StreamFallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedStudent {
    pub roll_number: String,
    pub name: String,
    pub class_id: String,
    pub class_name: String,
    pub department_id: String,
    pub stream_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

fn find_department<'a>(label: &str, departments: &'a [DepartmentEntry]) -> Option<&'a DepartmentEntry> {
    let t = label.trim();
    departments.iter().find(|d| {
        d.name.trim().eq_ignore_ascii_case(t)
            || d.code
                .as_deref()
                .map(|c| c.trim().eq_ignore_ascii_case(t))
                .unwrap_or(false)
    })
}

/// Department falls back to the resolved class's own department when the
/// label names none. The stream always comes from the mapper.
pub fn validate_student(
    row: &StudentImportRow,
    cats: &StudentCatalogs<'_>,
) -> Result<ValidatedStudent, ResolveError> {
    let class = resolve_class(&row.class_name, cats.classes)?;
    let department_id = match find_department(&row.department, cats.departments) {
        Some(d) => d.id.clone(),
        None => class
            .entry
            .department_id
            .clone()
            .ok_or_else(|| ResolveError::DepartmentNotFound {
                label: row.department.trim().to_string(),
            })?,
    };
    let stream_id = map_department_to_stream(&row.department, cats.streams, cats.fallback)?;
    Ok(ValidatedStudent {
        roll_number: row.roll_number.clone(),
        name: row.name.clone(),
        class_id: class.entry.id.clone(),
        class_name: class.entry.name.clone(),
        department_id,
        stream_id,
        email: row.email.clone(),
        phone: row.phone.clone(),
    })
}

pub fn validate_students_table(
    table: &CsvTable,
    cats: &StudentCatalogs<'_>,
) -> Result<Validated<ValidatedStudent>, ImportError> {
    let idx = FieldIndex::for_table(table, STUDENT_FIELDS);
    let missing = idx.missing_columns();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns { fields: missing });
    }

    let mut report = BatchReport::new(table.rows.len());
    let mut accepted = Vec::new();
    for row in &table.rows {
        let result =
            StudentImportRow::from_csv_row(&idx, row).and_then(|r| validate_student(&r, cats));
        match result {
            Ok(s) => accepted.push((row.line, s)),
            Err(e) => report.reject(row.line, e.to_string()),
        }
    }
    Ok(Validated { accepted, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::table::parse_csv_text;

    fn classes() -> Vec<ClassCatalogEntry> {
        vec![
            ClassCatalogEntry {
                id: "c1".into(),
                name: "I YR CSE-A".into(),
                department_id: Some("d-cse".into()),
            },
            ClassCatalogEntry {
                id: "c2".into(),
                name: "II ECE".into(),
                department_id: None,
            },
        ]
    }

    fn departments() -> Vec<DepartmentEntry> {
        vec![
            DepartmentEntry {
                id: "d-cse".into(),
                name: "Computer Science".into(),
                code: Some("CS".into()),
            },
            DepartmentEntry {
                id: "d-ece".into(),
                name: "Electronics".into(),
                code: Some("ECE".into()),
            },
        ]
    }

    fn streams() -> Vec<Stream> {
        vec![
            Stream {
                id: "cse".into(),
                name: "Computer Science and Engineering".into(),
                code: "CSE".into(),
            },
            Stream {
                id: "ece".into(),
                name: "Electronics and Communication Engineering".into(),
                code: "ECE".into(),
            },
        ]
    }

    #[test]
    fn template_rows_import_cleanly() {
        let (c, d, s, fb) = (classes(), departments(), streams(), StreamFallback::default());
        let cats = StudentCatalogs {
            classes: &c,
            departments: &d,
            streams: &s,
            fallback: &fb,
        };
        let t = parse_csv_text(
            "roll_number,name,department,class\n\
             CS001,John Doe,Computer Science,I YR CSE-A\n\
             CS002,Jane Smith,CS,I CSE-A\n\
             EC001,Ravi,ECE,2 ECE\n",
        )
        .expect("parse");
        let v = validate_students_table(&t, &cats).expect("validate");
        assert_eq!(v.report.rejected, 0);
        assert_eq!(v.accepted.len(), 3);
        assert_eq!(v.accepted[1].1.class_id, "c1");
        assert_eq!(v.accepted[1].1.department_id, "d-cse");
        assert_eq!(v.accepted[1].1.stream_id, "cse");
        assert_eq!(v.accepted[2].1.class_id, "c2");
        assert_eq!(v.accepted[2].1.stream_id, "ece");
    }

    #[test]
    fn unknown_department_uses_class_department_or_rejects() {
        let (c, d, s, fb) = (classes(), departments(), streams(), StreamFallback::default());
        let cats = StudentCatalogs {
            classes: &c,
            departments: &d,
            streams: &s,
            fallback: &fb,
        };
        let row = StudentImportRow {
            roll_number: "X1".into(),
            name: "A".into(),
            department: "AIML".into(),
            class_name: "I YR CSE-A".into(),
            email: None,
            phone: None,
        };
        let v = validate_student(&row, &cats).expect("student");
        assert_eq!(v.department_id, "d-cse");
        assert_eq!(v.stream_id, "cse");

        let row = StudentImportRow {
            class_name: "II ECE".into(),
            department: "Biotech".into(),
            ..row
        };
        assert_eq!(
            validate_student(&row, &cats),
            Err(ResolveError::DepartmentNotFound {
                label: "Biotech".into()
            })
        );
    }

    #[test]
    fn reject_fallback_surfaces_stream_error() {
        let (c, s) = (classes(), streams());
        let d = vec![DepartmentEntry {
            id: "d-bio".into(),
            name: "Biotech".into(),
            code: None,
        }];
        let fb = StreamFallback::Reject;
        let cats = StudentCatalogs {
            classes: &c,
            departments: &d,
            streams: &s,
            fallback: &fb,
        };
        let row = StudentImportRow {
            roll_number: "B1".into(),
            name: "B".into(),
            department: "Biotech".into(),
            class_name: "II ECE".into(),
            email: None,
            phone: None,
        };
        assert!(matches!(
            validate_student(&row, &cats),
            Err(ResolveError::StreamNotFound { .. })
        ));
    }
}
