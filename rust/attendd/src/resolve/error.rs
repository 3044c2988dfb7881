use thiserror::Error;

/// Per-row failures raised while turning free-text import fields into
/// catalog identifiers. Every variant rejects exactly one row.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid day \"{token}\"")]
    InvalidDay { token: String },

    #[error("Invalid period number \"{value}\" (expected 1 to {max})")]
    InvalidPeriod { value: String, max: u8 },

    /// `available` lists every catalog name so the user can see what the
    /// label failed to match.
    #[error("Class \"{label}\" not found (available: {})", available.join(", "))]
    ClassNotFound {
        label: String,
        available: Vec<String>,
    },

    #[error("Missing required fields: {}", fields.join(", "))]
    MissingRequiredField { fields: Vec<String> },

    #[error("Department \"{label}\" not found")]
    DepartmentNotFound { label: String },

    #[error("Department \"{label}\" does not map to a known stream")]
    StreamNotFound { label: String },
}

impl ResolveError {
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::InvalidDay { .. } => "invalid_day",
            ResolveError::InvalidPeriod { .. } => "invalid_period",
            ResolveError::ClassNotFound { .. } => "class_not_found",
            ResolveError::MissingRequiredField { .. } => "missing_required_field",
            ResolveError::DepartmentNotFound { .. } => "department_not_found",
            ResolveError::StreamNotFound { .. } => "stream_not_found",
        }
    }
}
