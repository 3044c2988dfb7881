mod digest;
mod grid;
mod model;
mod pdf;
mod status;

pub use digest::{render_digest, summarize_class, DayMark, ReporterRole, ShortReport};
pub use grid::{build_grid, load_grid_marks, load_grid_periods, DailyGrid};
pub use model::{build_report, load_records, AttendanceReport, ReportFilter};
pub use pdf::{render_attendance_pdf, render_daily_grid_pdf};
pub use status::{Approval, MarkStatus};
