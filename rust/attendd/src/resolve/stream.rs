use super::error::ResolveError;
use serde::Serialize;

pub const DEFAULT_STREAM: &str = "cse";

/// Labels that belong to the CSE stream. Several sub-departments (AI/ML,
/// AI/DS, cyber security, IT) are administered as one stream.
const CSE_SYNONYMS: &[&str] = &[
    "cse",
    "cs",
    "computer science",
    "computer science and engineering",
    "aiml",
    "ai/ml",
    "ai&ml",
    "ai & ml",
    "ai ml",
    "aids",
    "ai/ds",
    "ai&ds",
    "ai & ds",
    "ai ds",
    "artificial intelligence",
    "cyber",
    "cybersecurity",
    "cyber security",
    "csbs",
    "it",
    "information technology",
];

// Short synonyms must match exactly; longer ones may appear inside a label.
const SYNONYM_CONTAINS_MIN_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stream {
    pub id: String,
    pub name: String,
    pub code: String,
}

/// What to do with a department label nothing recognises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFallback {
    Default(String),
    Reject,
}

impl Default for StreamFallback {
    fn default() -> Self {
        StreamFallback::Default(DEFAULT_STREAM.to_string())
    }
}

impl StreamFallback {
    /// Parses `default:<id>` or `reject`.
    pub fn parse(raw: &str) -> Option<Self> {
        let t = raw.trim().to_ascii_lowercase();
        if t == "reject" {
            return Some(StreamFallback::Reject);
        }
        let id = t.strip_prefix("default:")?.trim();
        if id.is_empty() {
            return None;
        }
        Some(StreamFallback::Default(id.to_string()))
    }
}

fn synonym_hit(label: &str) -> bool {
    CSE_SYNONYMS.iter().any(|s| {
        label == *s || (s.len() >= SYNONYM_CONTAINS_MIN_LEN && label.contains(s))
    })
}

/// Maps a department label onto a stream id.
///
/// Unlike class resolution this prefers availability: an unrecognised label
/// lands on the fallback stream unless the fallback is `Reject`.
pub fn map_department_to_stream(
    label: &str,
    known_streams: &[Stream],
    fallback: &StreamFallback,
) -> Result<String, ResolveError> {
    let norm = label.trim().to_lowercase();

    if !norm.is_empty() {
        if synonym_hit(&norm) {
            return Ok(DEFAULT_STREAM.to_string());
        }

        for s in known_streams {
            let name = s.name.trim().to_lowercase();
            let code = s.code.trim().to_lowercase();
            let hit = (!name.is_empty() && (name.contains(&norm) || norm.contains(&name)))
                || (!code.is_empty() && (code.contains(&norm) || norm.contains(&code)));
            if hit {
                return Ok(s.id.clone());
            }
        }
    }

    match fallback {
        StreamFallback::Default(id) => Ok(id.clone()),
        StreamFallback::Reject => Err(ResolveError::StreamNotFound {
            label: label.trim().to_string(),
        }),
    }
}
