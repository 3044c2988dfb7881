use crate::db::TimetableEntry;
use serde::Serialize;

pub const NO_ROOM: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAllocation {
    pub subject_code: String,
    pub subject_name: String,
    pub faculty_name: String,
    pub room_number: String,
    pub hours_per_week: u32,
}

/// Folds a class timetable into one line per subject code, in order of first
/// appearance. Name, faculty and room come from that first entry. Every entry
/// counts one hour, even two entries for the same day and period.
pub fn aggregate(entries: &[TimetableEntry]) -> Vec<SubjectAllocation> {
    let mut out: Vec<SubjectAllocation> = Vec::new();
    for e in entries {
        if let Some(a) = out.iter_mut().find(|a| a.subject_code == e.subject_code) {
            a.hours_per_week += 1;
            continue;
        }
        out.push(SubjectAllocation {
            subject_code: e.subject_code.clone(),
            subject_name: e.subject_name.clone(),
            faculty_name: e.faculty_name.clone(),
            room_number: e
                .room_number
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| NO_ROOM.to_string()),
            hours_per_week: 1,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, faculty: &str, day: u8, period: u8, room: Option<&str>) -> TimetableEntry {
        TimetableEntry {
            id: format!("{code}-{day}-{period}"),
            class_id: "c1".to_string(),
            day_of_week: day,
            period_number: period,
            subject_code: code.to_string(),
            subject_name: format!("{code} name"),
            faculty_name: faculty.to_string(),
            faculty_code: None,
            room_number: room.map(str::to_string),
            is_lab: false,
        }
    }

    #[test]
    fn counts_hours_in_first_seen_order() {
        let entries = vec![
            entry("CS101", "Dr. Rao", 1, 1, Some("301")),
            entry("CS101", "Ms. Devi", 2, 3, Some("LAB2")),
            entry("MA101", "Mr. Kumar", 1, 2, None),
        ];
        let out = aggregate(&entries);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].subject_code, "CS101");
        assert_eq!(out[0].hours_per_week, 2);
        assert_eq!(out[0].faculty_name, "Dr. Rao");
        assert_eq!(out[0].room_number, "301");
        assert_eq!(out[1].subject_code, "MA101");
        assert_eq!(out[1].hours_per_week, 1);
        assert_eq!(out[1].room_number, NO_ROOM);
    }

    #[test]
    fn same_slot_twice_counts_twice() {
        let entries = vec![
            entry("PH101", "Dr. Iyer", 3, 4, None),
            entry("PH101", "Dr. Iyer", 3, 4, None),
        ];
        assert_eq!(aggregate(&entries)[0].hours_per_week, 2);
    }

    #[test]
    fn repeated_calls_agree() {
        let entries = vec![
            entry("EE201", "Dr. Nair", 1, 1, None),
            entry("CS101", "Dr. Rao", 1, 2, None),
            entry("EE201", "Dr. Nair", 2, 1, None),
        ];
        assert_eq!(aggregate(&entries), aggregate(&entries));
        assert!(aggregate(&[]).is_empty());
    }
}
