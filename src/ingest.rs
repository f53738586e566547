//! Raw table ingestion
//!
//! Reads CSV exports into a [`RawTable`] with normalized headers and provides
//! the typed extractors the pipeline stages consume. Headers are normalized to
//! lowercase with whitespace runs replaced by `_`, so `DATE (YYYY-MM-DD)`
//! becomes `date_(yyyy-mm-dd)` and `Exercise Name` becomes `exercise_name`.

use crate::error::ComputeError;
use crate::types::{CustomEntry, CustomSymptom, ExerciseSet};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Normalize a column header: trim, collapse whitespace runs to `_`, lowercase
pub fn normalize_column_name(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// A rectangular table of string cells with normalized headers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table from headers and rows; headers are normalized
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers: headers.iter().map(|h| normalize_column_name(h)).collect(),
            rows,
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ComputeError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(String::from).collect();
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(String::from).collect());
        }

        Ok(Self::new(headers, rows))
    }

    pub fn from_path(path: &Path) -> Result<Self, ComputeError> {
        let file = File::open(path).map_err(|e| {
            ComputeError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let table = Self::from_reader(file)?;
        debug!(path = %path.display(), rows = table.len(), "read table");
        Ok(table)
    }

    pub fn from_csv_str(content: &str) -> Result<Self, ComputeError> {
        Self::from_reader(content.as_bytes())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column, matched after normalizing `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_column_name(name);
        self.headers.iter().position(|h| *h == wanted)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, ComputeError> {
        self.column_index(name)
            .ok_or_else(|| ComputeError::MissingColumn(normalize_column_name(name)))
    }

    /// Cell text; short rows read as empty cells
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// All cells of one column
    pub fn column(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        (0..self.rows.len()).map(move |row| self.cell(row, col))
    }
}

/// Parse a numeric cell; empty, unparsable and NaN cells are missing
pub fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parse an integer cell, accepting integral floats such as `3.0`
pub fn parse_integer(cell: &str) -> Option<i64> {
    let trimmed = cell.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    parse_number(trimmed)
        .filter(|v| v.fract() == 0.0 && v.is_finite())
        .map(|v| v as i64)
}

/// Calendar date of a timestamp cell
///
/// Accepted forms:
/// - `2023-01-15 08:30:00 -0500` (Apple Health export)
/// - RFC 3339
/// - `2023-01-15 08:30:00` / `2023-01-15T08:30:00`
/// - `2023-01-15`
///
/// Offset-bearing timestamps keep the calendar date in their own offset.
pub fn parse_date(cell: &str) -> Result<NaiveDate, ComputeError> {
    let s = cell.trim();

    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| ComputeError::DateParseError(format!("'{}': {}", s, e)))
}

fn non_empty(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Strength log rows
pub fn strength_sets(table: &RawTable) -> Result<Vec<ExerciseSet>, ComputeError> {
    let date_col = table.require_column("date")?;
    let name_col = table.require_column("exercise_name")?;
    let order_col = table.column_index("set_order");
    let weight_col = table.require_column("weight")?;
    let reps_col = table.require_column("reps")?;

    let mut sets = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        sets.push(ExerciseSet {
            date: parse_date(table.cell(row, date_col))?,
            exercise_name: non_empty(table.cell(row, name_col)),
            set_order: order_col
                .and_then(|c| parse_integer(table.cell(row, c)))
                .and_then(|v| u32::try_from(v).ok()),
            weight: parse_number(table.cell(row, weight_col)),
            reps: parse_number(table.cell(row, reps_col)),
        });
    }
    Ok(sets)
}

/// Long-format custom symptom entries (`SYMPTOM`, `ENTRY`, `VALUE`)
///
/// Rows without a symptom id or entry counter cannot be placed and are skipped.
pub fn custom_entries(table: &RawTable) -> Result<Vec<CustomEntry>, ComputeError> {
    let symptom_col = table.require_column("symptom")?;
    let entry_col = table.require_column("entry")?;
    let value_col = table.require_column("value")?;

    let entries = (0..table.len())
        .filter_map(|row| {
            let symptom_id = parse_integer(table.cell(row, symptom_col))?;
            let entry = parse_integer(table.cell(row, entry_col))?;
            Some(CustomEntry {
                symptom_id,
                entry,
                value: parse_number(table.cell(row, value_col)),
            })
        })
        .collect();
    Ok(entries)
}

/// Custom symptom names (`ID`, `NAME`)
pub fn custom_symptoms(table: &RawTable) -> Result<Vec<CustomSymptom>, ComputeError> {
    let id_col = table.require_column("id")?;
    let name_col = table.require_column("name")?;

    let symptoms = (0..table.len())
        .filter_map(|row| {
            let id = parse_integer(table.cell(row, id_col))?;
            let name = non_empty(table.cell(row, name_col))?;
            Some(CustomSymptom { id, name })
        })
        .collect();
    Ok(symptoms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("DATE (YYYY-MM-DD)"), "date_(yyyy-mm-dd)");
        assert_eq!(normalize_column_name("Exercise  Name"), "exercise_name");
        assert_eq!(normalize_column_name("\u{feff}Date"), "date");
        assert_eq!(normalize_column_name("self-acceptance"), "self-acceptance");
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2023-01-15 08:30:00 -0500").unwrap(), d(2023, 1, 15));
        assert_eq!(parse_date("2023-01-15T23:30:00+02:00").unwrap(), d(2023, 1, 15));
        assert_eq!(parse_date("2023-01-15 08:30:00").unwrap(), d(2023, 1, 15));
        assert_eq!(parse_date("2023-01-15").unwrap(), d(2023, 1, 15));
        assert!(matches!(
            parse_date("15/01/2023"),
            Err(ComputeError::DateParseError(_))
        ));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 72.5 "), Some(72.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_integer("3.0"), Some(3));
        assert_eq!(parse_integer("3.5"), None);
    }

    #[test]
    fn test_flexible_rows_and_lookup() {
        let table = RawTable::from_csv_str("Date,Exercise Name,Weight\n2024-01-01,Squat\n").unwrap();
        assert_eq!(table.headers(), &["date", "exercise_name", "weight"]);
        let weight = table.column_index("Weight").unwrap();
        assert_eq!(table.cell(0, weight), "");
        assert!(table.column_index("reps").is_none());
        assert!(matches!(
            table.require_column("reps"),
            Err(ComputeError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_strength_sets() {
        let table = RawTable::from_csv_str(
            "Date,Exercise Name,Set Order,Weight,Reps\n\
             2024-01-01 08:00:00,Bench Press (Barbell),1,100,5\n\
             2024-01-01 08:00:00,,2,,\n",
        )
        .unwrap();
        let sets = strength_sets(&table).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].exercise_name.as_deref(), Some("Bench Press (Barbell)"));
        assert_eq!(sets[0].set_order, Some(1));
        assert_eq!(sets[0].weight, Some(100.0));
        assert_eq!(sets[1].exercise_name, None);
        assert_eq!(sets[1].reps, None);
    }

    #[test]
    fn test_custom_tables() {
        let entries = RawTable::from_csv_str("ID,SYMPTOM,ENTRY,VALUE\n1,7,100,3\n2,7,,2\n").unwrap();
        let entries = custom_entries(&entries).unwrap();
        assert_eq!(
            entries,
            vec![CustomEntry {
                symptom_id: 7,
                entry: 100,
                value: Some(3.0)
            }]
        );

        let symptoms = RawTable::from_csv_str("ID,NAME\n7,Mental Clarity\n").unwrap();
        let symptoms = custom_symptoms(&symptoms).unwrap();
        assert_eq!(symptoms[0].name, "Mental Clarity");
    }
}
