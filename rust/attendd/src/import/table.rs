use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("no header row found")]
    Empty,
    #[error("unreadable CSV at line {line}: {message}")]
    Malformed { line: u64, message: String },
}

/// One data row. `line` is the 1-based physical line in the source text, so
/// the first data row after the header is line 2.
#[derive(Debug, Clone)]
pub struct CsvRow {
    pub line: usize,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
}

/// Lower-cases a header cell and maps every character outside
/// `[a-z0-9_]` to `_`.
pub fn normalize_header(h: &str) -> String {
    h.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}

/// Splits a single CSV line, honoring double-quoted fields.
pub fn split_csv_line(line: &str) -> Result<Vec<String>, csv::Error> {
    match reader(line).records().next() {
        Some(rec) => Ok(rec?.iter().map(|v| v.to_string()).collect()),
        None => Ok(Vec::new()),
    }
}

/// Parses CSV text with a header row. Blank rows and rows whose cells are
/// all empty are skipped. Records never span lines.
pub fn parse_csv_text(text: &str) -> Result<CsvTable, TableError> {
    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let values = split_csv_line(raw).map_err(|e| TableError::Malformed {
            line: line as u64,
            message: e.to_string(),
        })?;
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }
        if headers.is_none() {
            headers = Some(values.iter().map(|h| normalize_header(h)).collect());
            continue;
        }
        rows.push(CsvRow { line, values });
    }

    let headers = headers.ok_or(TableError::Empty)?;
    Ok(CsvTable { headers, rows })
}
