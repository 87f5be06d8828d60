//! Point ingest and normalization.
//!
//! This module turns raw `(flow, value)` rows (pasted text, CSV files, JSON
//! arrays) into `RawPoint`s for the validator.
//!
//! Design goals:
//! - **Never silently drop data that looks like a point.** A row with two
//!   fields is kept even if a field fails to parse; the text survives as
//!   `RawField::Unparsed` so validation can name the exact row.
//! - **Drop only rows that are not pairs** (fewer than two fields, blank lines).
//! - **Deterministic behavior**: `sequence` is the row's position in the input.
//! - **Separation of concerns**: no validation or fitting logic here.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{RawField, RawPair, RawPoint};
use crate::error::AppError;

/// Ingest output: normalized candidate points plus row accounting.
#[derive(Debug, Clone, Default)]
pub struct IngestedPoints {
    pub points: Vec<RawPoint>,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

impl IngestedPoints {
    fn from_points(points: Vec<RawPoint>, rows_read: usize) -> Self {
        let rows_dropped = rows_read.saturating_sub(points.len());
        Self {
            points,
            rows_read,
            rows_dropped,
        }
    }

    /// Normalize split rows; blank rows are not counted as read.
    fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        let rows_read = rows.iter().filter(|row| !is_blank_row(row.as_slice())).count();
        Self::from_points(normalize_rows(rows), rows_read)
    }
}

/// Normalize already-split rows. The first two fields are flow and value;
/// extra trailing fields are ignored. Fields are positional: an empty cell
/// stays in place and becomes `RawField::Unparsed("")`.
pub fn normalize_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Vec<RawPoint> {
    rows.iter()
        .enumerate()
        .filter_map(|(sequence, row)| {
            if row.len() < 2 || is_blank_row(row.as_slice()) {
                tracing::debug!(sequence, fields = row.len(), "dropping row that is not a pair");
                return None;
            }
            Some(RawPoint {
                flow: RawField::parse(row[0].as_ref()),
                value: RawField::parse(row[1].as_ref()),
                sequence,
            })
        })
        .collect()
}

/// Normalize typed pairs (e.g. from JSON). Text fields get a numeric re-parse.
pub fn normalize_pairs(pairs: impl IntoIterator<Item = RawPair>) -> Vec<RawPoint> {
    pairs
        .into_iter()
        .enumerate()
        .map(|(sequence, pair)| RawPoint {
            flow: pair.flow.normalize(),
            value: pair.value.normalize(),
            sequence,
        })
        .collect()
}

/// Parse pasted text: one point per line.
///
/// A line containing a comma, semicolon or tab is split on that delimiter and
/// keeps empty fields in place (`100,` is a row with an empty value). Other
/// lines are split on runs of spaces.
pub fn parse_paste(text: &str) -> IngestedPoints {
    let rows: Vec<Vec<&str>> = text.lines().map(split_paste_line).collect();
    IngestedPoints::from_rows(&rows)
}

fn split_paste_line(line: &str) -> Vec<&str> {
    match [',', ';', '\t'].into_iter().find(|&d| line.contains(d)) {
        Some(delim) => line.split(delim).map(str::trim).collect(),
        None => line.split_whitespace().collect(),
    }
}

fn is_blank_row<S: AsRef<str>>(row: &[S]) -> bool {
    row.iter().all(|field| field.as_ref().trim().is_empty())
}

/// Load points from a file. `.json` files hold an array of `{flow, value}`
/// objects; anything else is read as CSV. The path `-` reads paste text from stdin.
pub fn load_points(path: &Path) -> Result<IngestedPoints, AppError> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| AppError::new(2, format!("Failed to read points from stdin: {e}")))?;
        return Ok(parse_paste(&text));
    }

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        load_points_json(path)
    } else {
        load_points_csv(path)
    }
}

/// Load a JSON array of `{flow, value}` objects.
pub fn load_points_json(path: &Path) -> Result<IngestedPoints, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open points JSON '{}': {e}", path.display())))?;
    let pairs: Vec<RawPair> = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid points JSON '{}': {e}", path.display())))?;
    let rows_read = pairs.len();
    Ok(IngestedPoints::from_points(normalize_pairs(pairs), rows_read))
}

/// Load a two-column CSV. An optional header row (`flow,...`) is skipped.
pub fn load_points_csv(path: &Path) -> Result<IngestedPoints, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error: {e}")))?;
        if idx == 0 && is_header_row(&record) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect::<Vec<String>>());
    }

    Ok(IngestedPoints::from_rows(&rows))
}

fn is_header_row(record: &StringRecord) -> bool {
    let Some(first) = record.get(0) else {
        return false;
    };
    // Excel sometimes prefixes the first cell with a UTF-8 BOM.
    let first = first.trim().trim_start_matches('\u{feff}').to_ascii_lowercase();
    first.starts_with("flow") || first == "q"
}
