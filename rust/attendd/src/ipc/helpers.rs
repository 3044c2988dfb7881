use crate::config::Config;
use crate::import::{BatchReport, ImportError, MAX_REPORTED_ERRORS};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::resolve::ResolveError;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use std::path::PathBuf;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        HandlerErr {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn query(e: rusqlite::Error) -> Self {
        Self::new("db_query_failed", e.to_string())
    }

    pub fn with_table(code: &'static str, e: rusqlite::Error, table: &str) -> Self {
        HandlerErr {
            code,
            message: e.to_string(),
            details: Some(json!({ "table": table })),
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<ResolveError> for HandlerErr {
    fn from(e: ResolveError) -> Self {
        let details = match &e {
            ResolveError::ClassNotFound { available, .. } => Some(json!({
                "kind": e.code(),
                "available": available,
            })),
            ResolveError::MissingRequiredField { fields } => Some(json!({
                "kind": e.code(),
                "fields": fields,
            })),
            _ => Some(json!({ "kind": e.code() })),
        };
        let code = match e {
            ResolveError::ClassNotFound { .. }
            | ResolveError::DepartmentNotFound { .. }
            | ResolveError::StreamNotFound { .. } => "not_found",
            _ => "bad_params",
        };
        HandlerErr {
            code,
            message: e.to_string(),
            details,
        }
    }
}

impl From<ImportError> for HandlerErr {
    fn from(e: ImportError) -> Self {
        match &e {
            ImportError::MissingColumns { fields } => HandlerErr {
                code: "parse_failed",
                message: e.to_string(),
                details: Some(json!({ "missingColumns": fields })),
            },
            ImportError::Table(_) => HandlerErr::new("parse_failed", e.to_string()),
        }
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn get_optional_bool(params: &serde_json::Value, key: &str) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// CSV and OCR payloads arrive inline as `text` or by path as `inPath`.
pub fn read_text_input(params: &serde_json::Value) -> Result<String, HandlerErr> {
    if let Some(text) = params.get("text").and_then(|v| v.as_str()) {
        return Ok(text.to_string());
    }
    let Some(path) = get_optional_str(params, "inPath").map(PathBuf::from) else {
        return Err(HandlerErr::bad_params("missing text or inPath"));
    };
    std::fs::read_to_string(&path).map_err(|e| HandlerErr {
        code: "io_failed",
        message: e.to_string(),
        details: Some(json!({ "path": path.to_string_lossy() })),
    })
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, HandlerErr> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| HandlerErr::bad_params(format!("date must be YYYY-MM-DD, got {raw:?}")))
}

pub fn row_exists(conn: &Connection, table: &str, id: &str) -> Result<bool, HandlerErr> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    conn.query_row(&sql, [id], |r| r.get::<_, i64>(0))
        .optional()
        .map(|v| v.is_some())
        .map_err(HandlerErr::query)
}

pub fn report_json(report: &BatchReport) -> serde_json::Value {
    let mut v = serde_json::to_value(report).unwrap_or_else(|_| json!({}));
    v["maxReportedErrors"] = json!(MAX_REPORTED_ERRORS);
    v
}

/// A handler body that needs an open workspace.
pub type DbOp =
    fn(&Connection, &Config, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>;

pub fn with_db(state: &AppState, req: &Request, f: DbOp) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &state.config, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}
