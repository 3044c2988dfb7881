//! Turns OCR text of a printed class timetable into import rows.
//!
//! The printout has a day-by-period grid that only names short subject
//! codes, and a "subject allocation" table further down that spells out each
//! subject and its faculty. The allocation table is read first so grid codes
//! can be expanded.

use super::fields::ImportRow;
use crate::resolve::day_label;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static SUBJECT_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        // 1 24BSC202 Discrete Mathematics Mrs.R.TamilSelvi(RT)
        Regex::new(
            r"(?i)^\d+\s+([A-Z0-9]+)\s+([A-Za-z\s&()]+?)\s+((?:Mrs?\.?|Dr\.?|Ms\.?)\s*[A-Za-z\s.]+\([A-Z]+\))",
        )
        .expect("subject pattern 1"),
        // CA(302) Computer Architecture Mrs.I.Roshini
        Regex::new(r"(?i)^([A-Z]{2,}\(\d+\))\s+([A-Za-z\s&]+?)\s+((?:Mrs?\.?|Dr\.?|Ms\.?)\s*[A-Za-z\s.]+)")
            .expect("subject pattern 2"),
        Regex::new(
            r"(?i)([A-Z0-9]{5,})\s+([A-Za-z\s&]+?)\s+((?:Mrs?\.?|Dr\.?|Ms\.?)\s*[A-Za-z\s.]+(?:\([A-Z]+\))?)",
        )
        .expect("subject pattern 3"),
    ]
});
static FACULTY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Z]+)\)").expect("faculty code regex"));
static LEADING_LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]+").expect("leading letters regex"));
static GRID_ROOM_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]{2,})\s*\((\d+)\)").expect("grid room code regex"));
static GRID_WORD_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2,}[A-Z0-9]*)\b").expect("grid word code regex"));

const DAYS: [&str; 6] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

const STOP_WORDS: &[&str] = &[
    "DAY", "MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY", "SATURDAY", "TEA", "LUNCH",
    "BREAK", "CLUB", "ACTIVITY", "CYCLE", "TEST", "NDA", "COURSE",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectInfo {
    pub subject_code: String,
    pub subject_name: String,
    pub faculty_name: String,
    pub faculty_code: Option<String>,
}

fn parse_subject_line(line: &str) -> Option<SubjectInfo> {
    let caps = SUBJECT_PATTERNS.iter().find_map(|p| p.captures(line))?;
    let code = caps[1].trim().to_string();
    let name = caps[2].trim().to_string();
    let faculty = caps[3].trim();
    let faculty_code = FACULTY_CODE.captures(faculty).map(|c| c[1].to_string());
    let faculty_name = FACULTY_CODE.replace(faculty, "").trim().to_string();
    Some(SubjectInfo {
        subject_code: code,
        subject_name: name,
        faculty_name,
        faculty_code,
    })
}

fn lookup_keys(info: &SubjectInfo) -> Vec<String> {
    let code = &info.subject_code;
    let mut keys = vec![
        code.to_uppercase(),
        code.replace(['(', ')'], "").to_uppercase(),
        code.split('(').next().unwrap_or_default().to_uppercase(),
    ];
    if let Some(m) = LEADING_LETTERS.find(code) {
        keys.push(m.as_str().to_uppercase());
    }
    if let Some(fc) = &info.faculty_code {
        keys.push(fc.to_uppercase());
    }
    keys.retain(|k| !k.is_empty());
    keys
}

/// Reads the subject allocation table into a code lookup. Later lines win
/// when two subjects share a key.
pub fn parse_subject_allocation(text: &str) -> HashMap<String, SubjectInfo> {
    let mut out = HashMap::new();
    let mut in_section = false;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();
        if lower.contains("subject")
            && (lower.contains("allocation") || lower.contains("name") || lower.contains("s.no"))
        {
            in_section = true;
            continue;
        }
        if lower.contains("total working") || lower.contains("class advisor") {
            in_section = false;
        }
        if !in_section {
            continue;
        }
        if let Some(info) = parse_subject_line(line) {
            for key in lookup_keys(&info) {
                out.insert(key, info.clone());
            }
        }
    }
    out
}

/// Subject codes on one grid line, in order of appearance, each once.
fn grid_codes(line: &str) -> Vec<String> {
    let mut hits: Vec<(usize, String)> = GRID_ROOM_CODE
        .captures_iter(line)
        .chain(GRID_WORD_CODE.captures_iter(line))
        .filter_map(|c| c.get(1).map(|m| (m.start(), m.as_str().to_uppercase())))
        .collect();
    hits.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    hits.into_iter()
        .map(|(_, code)| code)
        .filter(|code| !STOP_WORDS.contains(&code.as_str()))
        .filter(|code| seen.insert(code.clone()))
        .collect()
}

fn find_subject<'a>(
    code: &str,
    allocation: &'a HashMap<String, SubjectInfo>,
) -> Option<&'a SubjectInfo> {
    let prefix = |n: usize| code.chars().take(n).collect::<String>();
    allocation
        .get(code)
        .or_else(|| allocation.get(&prefix(3)))
        .or_else(|| allocation.get(&prefix(2)))
}

/// Parses the whole OCR dump into rows for `class_name`. Codes that match
/// nothing in the allocation table are dropped.
pub fn parse_timetable_text(text: &str, class_name: &str) -> Vec<ImportRow> {
    let allocation = parse_subject_allocation(text);
    let mut rows = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();
        let Some(day_idx) = DAYS.iter().position(|d| lower.contains(d)) else {
            continue;
        };
        let day = day_idx as u8 + 1;

        let mut period = 1;
        for code in grid_codes(line) {
            let Some(info) = find_subject(&code, &allocation) else {
                continue;
            };
            let is_lab =
                lower.contains("lab") || info.subject_name.to_lowercase().contains("laboratory");
            rows.push(ImportRow {
                class_name: class_name.to_string(),
                day_token: day_label(day).to_string(),
                period_token: period.to_string(),
                subject_code: info.subject_code.clone(),
                subject_name: info.subject_name.clone(),
                faculty_name: info.faculty_name.clone(),
                faculty_code: info.faculty_code.clone(),
                room_number: None,
                is_lab,
            });
            period += 1;
        }
    }
    rows
}
