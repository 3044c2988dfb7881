use super::table::{CsvRow, CsvTable};
use crate::resolve::ResolveError;
use std::collections::HashMap;

/// A logical import field and the (already normalized) header names that
/// may carry it. Earlier aliases win when several are present.
pub struct FieldSpec {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
}

pub const STUDENT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        canonical: "roll_number",
        aliases: &["register_number", "roll_number", "rollnumber", "roll"],
        required: true,
    },
    FieldSpec {
        canonical: "name",
        aliases: &["name", "student_name", "studentname"],
        required: true,
    },
    FieldSpec {
        canonical: "department",
        aliases: &["department", "dept", "stream"],
        required: true,
    },
    FieldSpec {
        canonical: "class",
        aliases: &["class", "class_name", "classname"],
        required: true,
    },
    FieldSpec {
        canonical: "email",
        aliases: &["email", "email_id", "mail"],
        required: false,
    },
    FieldSpec {
        canonical: "phone",
        aliases: &["phone", "phone_number", "mobile"],
        required: false,
    },
];

pub const TIMETABLE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        canonical: "class",
        aliases: &["class", "class_name", "classname"],
        required: true,
    },
    FieldSpec {
        canonical: "day",
        aliases: &["day", "day_of_week"],
        required: true,
    },
    FieldSpec {
        canonical: "period",
        aliases: &["period", "period_number"],
        required: true,
    },
    FieldSpec {
        canonical: "subject_code",
        aliases: &["subject_code", "code"],
        required: true,
    },
    FieldSpec {
        canonical: "subject_name",
        aliases: &["subject_name", "subject"],
        required: true,
    },
    FieldSpec {
        canonical: "faculty_name",
        aliases: &["faculty_name", "faculty", "staff_name"],
        required: true,
    },
    FieldSpec {
        canonical: "faculty_code",
        aliases: &["faculty_code", "staff_code"],
        required: false,
    },
    FieldSpec {
        canonical: "room_number",
        aliases: &["room_number", "room"],
        required: false,
    },
    FieldSpec {
        canonical: "is_lab",
        aliases: &["is_lab", "lab"],
        required: false,
    },
];

/// Column lookup built once per file from the header row.
pub struct FieldIndex {
    columns: HashMap<&'static str, usize>,
    specs: &'static [FieldSpec],
}

impl FieldIndex {
    pub fn new(headers: &[String], specs: &'static [FieldSpec]) -> Self {
        let mut columns = HashMap::new();
        for spec in specs {
            let col = spec
                .aliases
                .iter()
                .find_map(|a| headers.iter().position(|h| h == a));
            if let Some(c) = col {
                columns.insert(spec.canonical, c);
            }
        }
        FieldIndex { columns, specs }
    }

    pub fn for_table(table: &CsvTable, specs: &'static [FieldSpec]) -> Self {
        Self::new(&table.headers, specs)
    }

    /// Required fields with no matching header at all.
    pub fn missing_columns(&self) -> Vec<String> {
        self.specs
            .iter()
            .filter(|s| s.required && !self.columns.contains_key(s.canonical))
            .map(|s| s.canonical.to_string())
            .collect()
    }

    pub fn get<'r>(&self, row: &'r CsvRow, field: &str) -> Option<&'r str> {
        let c = *self.columns.get(field)?;
        row.values
            .get(c)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, row: &CsvRow) -> Result<(), ResolveError> {
        let missing: Vec<String> = self
            .specs
            .iter()
            .filter(|s| s.required && self.get(row, s.canonical).is_none())
            .map(|s| s.canonical.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ResolveError::MissingRequiredField { fields: missing })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentImportRow {
    pub roll_number: String,
    pub name: String,
    pub department: String,
    pub class_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl StudentImportRow {
    pub fn from_csv_row(idx: &FieldIndex, row: &CsvRow) -> Result<Self, ResolveError> {
        idx.require(row)?;
        let field = |f: &str| idx.get(row, f).unwrap_or_default().to_string();
        Ok(StudentImportRow {
            roll_number: field("roll_number"),
            name: field("name"),
            department: field("department"),
            class_name: field("class"),
            email: idx.get(row, "email").map(str::to_string),
            phone: idx.get(row, "phone").map(str::to_string),
        })
    }
}

/// A timetable line as typed by a human; class and day are still free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub class_name: String,
    pub day_token: String,
    pub period_token: String,
    pub subject_code: String,
    pub subject_name: String,
    pub faculty_name: String,
    pub faculty_code: Option<String>,
    pub room_number: Option<String>,
    pub is_lab: bool,
}

pub fn parse_boolish(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

impl ImportRow {
    pub fn from_csv_row(idx: &FieldIndex, row: &CsvRow) -> Result<Self, ResolveError> {
        idx.require(row)?;
        let field = |f: &str| idx.get(row, f).unwrap_or_default().to_string();
        Ok(ImportRow {
            class_name: field("class"),
            day_token: field("day"),
            period_token: field("period"),
            subject_code: field("subject_code"),
            subject_name: field("subject_name"),
            faculty_name: field("faculty_name"),
            faculty_code: idx.get(row, "faculty_code").map(str::to_string),
            room_number: idx.get(row, "room_number").map(str::to_string),
            is_lab: idx.get(row, "is_lab").map(parse_boolish).unwrap_or(false),
        })
    }
}
