use super::error::ResolveError;
use super::year::{expand_year_variants, normalize_label, year_token};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCatalogEntry {
    pub id: String,
    pub name: String,
    pub department_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStep {
    Exact,
    YearWordStripped,
    RomanDigitEquivalent,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassMatch<'a> {
    pub entry: &'a ClassCatalogEntry,
    pub step: MatchStep,
}

fn strip_year_words(norm: &str) -> String {
    norm.split(' ')
        .filter(|t| *t != "yr" && *t != "year")
        .collect::<Vec<_>>()
        .join(" ")
}

/// A label that names a year only matches a class naming the same year (or
/// no year at all).
fn year_compatible(label_year: Option<u8>, class_name: &str) -> bool {
    match (label_year, year_token(class_name)) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Resolves a free-text class label against the catalog.
///
/// Strategies run in order and the first hit wins:
/// 1. normalized exact match,
/// 2. exact match once "yr"/"year" words are dropped,
/// 3. roman/digit year equivalence.
///
/// There is no substring fallback: "III IT" must never land on "II IT".
pub fn resolve_class<'a>(
    label: &str,
    catalog: &'a [ClassCatalogEntry],
) -> Result<ClassMatch<'a>, ResolveError> {
    let norm = normalize_label(label);
    if !norm.is_empty() {
        let label_year = year_token(&norm);

        for entry in catalog {
            if normalize_label(&entry.name) == norm && year_compatible(label_year, &entry.name) {
                return Ok(ClassMatch {
                    entry,
                    step: MatchStep::Exact,
                });
            }
        }

        let stripped = strip_year_words(&norm);
        for entry in catalog {
            let candidate = strip_year_words(&normalize_label(&entry.name));
            if !candidate.is_empty()
                && candidate == stripped
                && year_compatible(label_year, &entry.name)
            {
                return Ok(ClassMatch {
                    entry,
                    step: MatchStep::YearWordStripped,
                });
            }
        }

        let lv = expand_year_variants(&stripped);
        let label_forms = [lv.with_digits.as_str(), lv.with_roman.as_str(), stripped.as_str()];
        for entry in catalog {
            let class_norm = strip_year_words(&normalize_label(&entry.name));
            if class_norm.is_empty() {
                continue;
            }
            let cv = expand_year_variants(&class_norm);
            let class_forms = [cv.with_digits.as_str(), cv.with_roman.as_str(), class_norm.as_str()];
            let hit = label_forms
                .iter()
                .any(|l| class_forms.iter().any(|c| l == c));
            if hit {
                return Ok(ClassMatch {
                    entry,
                    step: MatchStep::RomanDigitEquivalent,
                });
            }
        }
    }

    Err(ResolveError::ClassNotFound {
        label: label.trim().to_string(),
        available: catalog.iter().map(|c| c.name.clone()).collect(),
    })
}
