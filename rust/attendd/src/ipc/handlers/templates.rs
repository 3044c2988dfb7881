use crate::import::{
    STUDENTS_TEMPLATE, STUDENTS_TEMPLATE_FILE, TIMETABLE_TEMPLATE, TIMETABLE_TEMPLATE_FILE,
};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::get_optional_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn write_template(req: &Request, file_name: &str, text: &str) -> serde_json::Value {
    let Some(out_path) = get_optional_str(&req.params, "outPath").map(PathBuf::from) else {
        return ok(&req.id, json!({ "fileName": file_name, "text": text }));
    };
    if let Some(parent) = out_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": parent.to_string_lossy() })),
            );
        }
    }
    if let Err(e) = std::fs::write(&out_path, text) {
        return err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": out_path.to_string_lossy() })),
        );
    }
    ok(
        &req.id,
        json!({
            "fileName": file_name,
            "text": text,
            "outPath": out_path.to_string_lossy()
        }),
    )
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "templates.studentsCsv" => {
            Some(write_template(req, STUDENTS_TEMPLATE_FILE, STUDENTS_TEMPLATE))
        }
        "templates.timetableCsv" => {
            Some(write_template(req, TIMETABLE_TEMPLATE_FILE, TIMETABLE_TEMPLATE))
        }
        _ => None,
    }
}
