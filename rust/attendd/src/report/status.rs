use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkStatus {
    Present,
    Absent,
    OnDuty,
}

impl MarkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkStatus::Present => "present",
            MarkStatus::Absent => "absent",
            MarkStatus::OnDuty => "on_duty",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "present" => Some(MarkStatus::Present),
            "absent" => Some(MarkStatus::Absent),
            "on_duty" => Some(MarkStatus::OnDuty),
            _ => None,
        }
    }
}

/// Only meaningful for absences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    Approved,
    Unapproved,
}

impl Approval {
    pub fn as_str(self) -> &'static str {
        match self {
            Approval::Approved => "approved",
            Approval::Unapproved => "unapproved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "approved" => Some(Approval::Approved),
            "unapproved" => Some(Approval::Unapproved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusStyle {
    pub label: &'static str,
    pub color: &'static str,
    pub rgb: (u8, u8, u8),
    pub bold: bool,
}

const GREEN: (u8, u8, u8) = (34, 197, 94);
const RED: (u8, u8, u8) = (239, 68, 68);
const ORANGE: (u8, u8, u8) = (249, 115, 22);
const BLUE: (u8, u8, u8) = (59, 130, 246);

pub fn status_style(status: MarkStatus, approval: Option<Approval>) -> StatusStyle {
    match (status, approval) {
        (MarkStatus::Present, _) => StatusStyle {
            label: "Present",
            color: "green",
            rgb: GREEN,
            bold: false,
        },
        (MarkStatus::OnDuty, _) => StatusStyle {
            label: "On Duty",
            color: "blue",
            rgb: BLUE,
            bold: false,
        },
        (MarkStatus::Absent, Some(Approval::Approved)) => StatusStyle {
            label: "Approved",
            color: "green",
            rgb: GREEN,
            bold: true,
        },
        (MarkStatus::Absent, Some(Approval::Unapproved)) => StatusStyle {
            label: "Unapproved",
            color: "orange",
            rgb: ORANGE,
            bold: true,
        },
        (MarkStatus::Absent, None) => StatusStyle {
            label: "Absent",
            color: "red",
            rgb: RED,
            bold: false,
        },
    }
}
