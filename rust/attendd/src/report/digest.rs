//! The plain-text short report that coordinators paste into chat groups.

use super::status::{Approval, MarkStatus};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write;

/// One student mark for the report date. Callers pass marks ordered by
/// period so the earliest period decides a student's status.
#[derive(Debug, Clone)]
pub struct DayMark {
    pub student_id: String,
    pub status: MarkStatus,
    pub approval: Option<Approval>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub name: String,
    pub present: u32,
    pub total: u32,
    pub approved: u32,
    pub unapproved: u32,
    pub on_duty: u32,
    pub suspended: u32,
    pub intern: u32,
}

/// Who signs the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReporterRole {
    ProgramCoordinator,
    Dean,
}

impl ReporterRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "").as_str() {
            "programcoordinator" | "coordinator" => Some(ReporterRole::ProgramCoordinator),
            "dean" => Some(ReporterRole::Dean),
            _ => None,
        }
    }

    fn title(self) -> &'static str {
        match self {
            ReporterRole::ProgramCoordinator => "Program Coordinator",
            ReporterRole::Dean => "Dean",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortReport {
    pub stream_name: String,
    pub stream_code: String,
    pub date: NaiveDate,
    pub classes: Vec<ClassSummary>,
}

/// Counts each student once, using their first mark of the day. An absence
/// without an approval decision counts as unapproved.
pub fn summarize_class(
    name: &str,
    total: u32,
    marks: &[DayMark],
    suspended: u32,
    intern: u32,
) -> ClassSummary {
    let mut seen = HashSet::new();
    let mut s = ClassSummary {
        name: name.to_string(),
        total,
        suspended,
        intern,
        ..Default::default()
    };
    for m in marks {
        if !seen.insert(m.student_id.as_str()) {
            continue;
        }
        match (m.status, m.approval) {
            (MarkStatus::Present, _) => s.present += 1,
            (MarkStatus::Absent, Some(Approval::Approved)) => s.approved += 1,
            (MarkStatus::Absent, _) => s.unapproved += 1,
            (MarkStatus::OnDuty, _) => s.on_duty += 1,
        }
    }
    s
}

fn class_block(cls: &ClassSummary, stream_code: &str) -> String {
    let mut out = format!(
        "➕{}: {}  {}/{}\n",
        cls.name, stream_code, cls.present, cls.total
    );
    let extras = [
        ("Approved", cls.approved),
        ("Unapproved", cls.unapproved),
        ("OD", cls.on_duty),
        ("Suspend", cls.suspended),
        ("Intern", cls.intern),
    ];
    for (label, n) in extras {
        if n > 0 {
            let _ = writeln!(out, "📍{label}: {n:02}");
        }
    }
    out
}

fn signature(role: ReporterRole, stream_code: &str, reporter: &str) -> String {
    let reporter = reporter.trim();
    if reporter.is_empty() {
        format!("Reported by: {}, {}", role.title(), stream_code)
    } else {
        format!("Reported by: {}, {} - {}", role.title(), stream_code, reporter)
    }
}

pub fn render_digest(report: &ShortReport, role: ReporterRole, reporter: &str) -> String {
    let blocks: Vec<String> = report
        .classes
        .iter()
        .map(|c| class_block(c, &report.stream_code))
        .collect();
    format!(
        "☀️Stream: {}\n☀️Date: {}\n\n{}\n\n{}",
        report.stream_name,
        report.date.format("%d/%m/%Y"),
        blocks.join("\n"),
        signature(role, &report.stream_code, reporter)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(id: &str, status: MarkStatus, approval: Option<Approval>) -> DayMark {
        DayMark {
            student_id: id.to_string(),
            status,
            approval,
        }
    }

    #[test]
    fn first_mark_per_student_wins() {
        let marks = vec![
            mark("s1", MarkStatus::Present, None),
            mark("s2", MarkStatus::Absent, Some(Approval::Approved)),
            mark("s3", MarkStatus::Absent, None),
            mark("s4", MarkStatus::OnDuty, None),
            mark("s1", MarkStatus::Absent, None),
            mark("s2", MarkStatus::Present, None),
        ];
        let s = summarize_class("II CSE A", 60, &marks, 1, 0);
        assert_eq!(s.present, 1);
        assert_eq!(s.approved, 1);
        assert_eq!(s.unapproved, 1);
        assert_eq!(s.on_duty, 1);
        assert_eq!(s.total, 60);
        assert_eq!(s.suspended, 1);
    }

    fn one_class_report() -> ShortReport {
        ShortReport {
            stream_name: "Information Technology".to_string(),
            stream_code: "IT".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 11, 21).expect("date"),
            classes: vec![ClassSummary {
                name: "I IT".to_string(),
                present: 40,
                total: 42,
                on_duty: 2,
                ..Default::default()
            }],
        }
    }

    #[test]
    fn dean_digest_is_signed_with_the_stream_code() {
        let text = render_digest(&one_class_report(), ReporterRole::Dean, "");
        let expected = "☀️Stream: Information Technology\n\
☀️Date: 21/11/2025\n\
\n\
➕I IT: IT  40/42\n\
📍OD: 02\n\
\n\
\n\
Reported by: Dean, IT";
        assert_eq!(text, expected);
        assert!(render_digest(&one_class_report(), ReporterRole::Dean, "Dr. Iyer")
            .ends_with("Reported by: Dean, IT - Dr. Iyer"));
    }

    #[test]
    fn reporter_roles_parse_loosely() {
        assert_eq!(
            ReporterRole::parse("programCoordinator"),
            Some(ReporterRole::ProgramCoordinator)
        );
        assert_eq!(
            ReporterRole::parse("program_coordinator"),
            Some(ReporterRole::ProgramCoordinator)
        );
        assert_eq!(ReporterRole::parse(" Dean "), Some(ReporterRole::Dean));
        assert_eq!(ReporterRole::parse("principal"), None);
        let v = serde_json::to_value(ReporterRole::ProgramCoordinator).expect("json");
        assert_eq!(v, serde_json::json!("programCoordinator"));
    }

    #[test]
    fn digest_matches_template_exactly() {
        let report = ShortReport {
            stream_name: "Computer Science and Engineering".to_string(),
            stream_code: "CSE".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 7).expect("date"),
            classes: vec![
                ClassSummary {
                    name: "II CSE A".to_string(),
                    present: 55,
                    total: 60,
                    approved: 2,
                    unapproved: 3,
                    ..Default::default()
                },
                ClassSummary {
                    name: "III CSE A".to_string(),
                    present: 58,
                    total: 58,
                    intern: 12,
                    ..Default::default()
                },
            ],
        };
        let text = render_digest(&report, ReporterRole::ProgramCoordinator, "Dr. Meena");
        let expected = "☀️Stream: Computer Science and Engineering\n\
☀️Date: 07/03/2025\n\
\n\
➕II CSE A: CSE  55/60\n\
📍Approved: 02\n\
📍Unapproved: 03\n\
\n\
➕III CSE A: CSE  58/58\n\
📍Intern: 12\n\
\n\
\n\
Reported by: Program Coordinator, CSE - Dr. Meena";
        assert_eq!(text, expected);
    }

    #[test]
    fn class_without_extras_is_a_single_line() {
        let cls = ClassSummary {
            name: "I IT".to_string(),
            present: 40,
            total: 40,
            ..Default::default()
        };
        assert_eq!(class_block(&cls, "IT"), "➕I IT: IT  40/40\n");
    }
}
