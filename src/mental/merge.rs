//! Mood log merge
//!
//! The tracker exports a wide fixed log keyed by calendar date and a long log
//! of custom symptoms keyed by its own day counter. Custom entries are rebased
//! so the most recent counter lands on `today`:
//!
//! `date = today - (max(entry) - entry)` days
//!
//! then pivoted wide (first non-null value per date and symptom) and
//! left-joined onto the fixed log.

use crate::error::ComputeError;
use crate::ingest::{parse_date, parse_number, RawTable};
use crate::types::{CustomEntry, CustomSymptom, MoodEntry, MoodLog};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Date column of the fixed log, after header normalization
pub const FIXED_DATE_COLUMN: &str = "date_(yyyy-mm-dd)";
pub const NOTE_COLUMN: &str = "note";

/// Wide custom factors: date → symptom name → value
pub type CustomPivot = BTreeMap<NaiveDate, BTreeMap<String, f64>>;

/// Rebase and pivot custom entries
///
/// Entries whose symptom id has no name are dropped, as are entries whose
/// counter lies too far from the latest one to land on a calendar date. Only
/// symptoms with at least one value become columns.
pub fn pivot_custom_entries(
    entries: &[CustomEntry],
    symptoms: &[CustomSymptom],
    today: NaiveDate,
) -> CustomPivot {
    let mut names: HashMap<i64, &str> = HashMap::new();
    for symptom in symptoms {
        names.entry(symptom.id).or_insert(symptom.name.as_str());
    }

    let mut pivot = CustomPivot::new();
    let Some(anchor) = entries.iter().map(|e| e.entry).max() else {
        return pivot;
    };

    let mut out_of_range = 0usize;
    for entry in entries {
        let (Some(name), Some(value)) = (names.get(&entry.symptom_id), entry.value) else {
            continue;
        };
        let Some(date) = rebase(anchor, entry.entry, today) else {
            out_of_range += 1;
            continue;
        };
        pivot
            .entry(date)
            .or_default()
            .entry((*name).to_string())
            .or_insert(value);
    }
    if out_of_range > 0 {
        warn!(rows = out_of_range, "custom entries with out-of-range day counters skipped");
    }
    pivot
}

fn rebase(anchor: i64, entry: i64, today: NaiveDate) -> Option<NaiveDate> {
    let gap = Duration::try_days(anchor.checked_sub(entry)?)?;
    today.checked_sub_signed(gap)
}

/// Merges the fixed and custom logs into one [`MoodLog`]
pub struct MoodMerger;

impl MoodMerger {
    pub fn merge(
        fixed: &RawTable,
        custom_entries: &[CustomEntry],
        custom_symptoms: &[CustomSymptom],
        today: NaiveDate,
    ) -> Result<MoodLog, ComputeError> {
        let date_col = fixed.require_column(FIXED_DATE_COLUMN)?;
        let note_col = fixed.column_index(NOTE_COLUMN);

        // Numeric columns of the fixed log become factors
        let factor_cols: Vec<(usize, String)> = fixed
            .headers()
            .iter()
            .enumerate()
            .filter(|(i, h)| *i != date_col && Some(*i) != note_col && h.as_str() != "date")
            .filter(|(i, _)| {
                fixed
                    .column(*i)
                    .all(|cell| cell.trim().is_empty() || parse_number(cell).is_some())
            })
            .map(|(i, h)| (i, h.clone()))
            .collect();

        let mut log = MoodLog::default();
        for (_, name) in &factor_cols {
            log.add_factor(name);
        }

        let pivot = pivot_custom_entries(custom_entries, custom_symptoms, today);
        let custom_names: BTreeSet<&String> = pivot.values().flat_map(|m| m.keys()).collect();
        for name in &custom_names {
            if log.has_factor(name) {
                debug!(factor = %name, "custom factor shadowed by fixed log column");
            }
            log.add_factor(name);
        }

        let mut by_date: BTreeMap<NaiveDate, MoodEntry> = BTreeMap::new();
        let mut duplicates = 0usize;
        let mut undated = 0usize;

        for row in 0..fixed.len() {
            let date_cell = fixed.cell(row, date_col);
            if date_cell.trim().is_empty() {
                undated += 1;
                continue;
            }
            let date = parse_date(date_cell)?;
            if by_date.contains_key(&date) {
                duplicates += 1;
                continue;
            }

            let mut entry = MoodEntry::new(date);
            if let Some(col) = note_col {
                entry.note = fixed.cell(row, col).to_string();
            }
            for (col, name) in &factor_cols {
                entry.set_factor(name, parse_number(fixed.cell(row, *col)));
            }
            if let Some(custom) = pivot.get(&date) {
                for (name, value) in custom {
                    entry.factors.entry(name.clone()).or_insert(*value);
                }
            }
            by_date.insert(date, entry);
        }

        if duplicates > 0 {
            warn!(rows = duplicates, "duplicate dates in fixed mood log, kept first");
        }
        if undated > 0 {
            warn!(rows = undated, "fixed mood log rows without a date skipped");
        }

        log.entries = by_date.into_values().collect();
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn custom(symptom_id: i64, entry: i64, value: Option<f64>) -> CustomEntry {
        CustomEntry {
            symptom_id,
            entry,
            value,
        }
    }

    fn symptoms() -> Vec<CustomSymptom> {
        vec![
            CustomSymptom {
                id: 1,
                name: "Mental Clarity".to_string(),
            },
            CustomSymptom {
                id: 2,
                name: "Fun".to_string(),
            },
        ]
    }

    #[test]
    fn test_custom_dates_rebased_on_today() {
        let today = d(2024, 3, 10);
        let entries = vec![
            custom(1, 500, Some(3.0)),
            custom(1, 498, Some(2.0)),
            custom(2, 498, Some(4.0)),
        ];
        let pivot = pivot_custom_entries(&entries, &symptoms(), today);

        assert_eq!(pivot.len(), 2);
        assert_eq!(pivot[&d(2024, 3, 10)]["Mental Clarity"], 3.0);
        assert_eq!(pivot[&d(2024, 3, 8)]["Mental Clarity"], 2.0);
        assert_eq!(pivot[&d(2024, 3, 8)]["Fun"], 4.0);
    }

    #[test]
    fn test_pivot_keeps_first_non_null() {
        let today = d(2024, 3, 10);
        let entries = vec![
            custom(1, 10, None),
            custom(1, 10, Some(2.0)),
            custom(1, 10, Some(4.0)),
            custom(9, 10, Some(1.0)),
        ];
        let pivot = pivot_custom_entries(&entries, &symptoms(), today);
        assert_eq!(pivot[&today].len(), 1);
        assert_eq!(pivot[&today]["Mental Clarity"], 2.0);
    }

    #[test]
    fn test_out_of_range_counter_is_skipped() {
        let today = d(2024, 3, 10);
        let entries = vec![
            custom(1, 1_700_000_000_000, Some(3.0)),
            custom(1, 0, Some(1.0)),
            custom(2, i64::MIN, Some(2.0)),
            custom(2, 1_699_999_999_999, Some(4.0)),
        ];
        let pivot = pivot_custom_entries(&entries, &symptoms(), today);

        assert_eq!(pivot.len(), 2);
        assert_eq!(pivot[&today]["Mental Clarity"], 3.0);
        assert_eq!(pivot[&d(2024, 3, 9)]["Fun"], 4.0);
    }

    #[test]
    fn test_left_join_onto_fixed_log() {
        let fixed = RawTable::from_csv_str(
            "ID,DATE (YYYY-MM-DD),ELEVATED,ANXIETY,NOTE,MOOD_LABEL\n\
             1,2024-03-09,3,1,good day,calm\n\
             2,2024-03-10,2,,,calm\n\
             3,2024-03-10,4,4,duplicate,calm\n",
        )
        .unwrap();
        let entries = vec![custom(1, 100, Some(3.0)), custom(1, 50, Some(1.0))];
        let log = MoodMerger::merge(&fixed, &entries, &symptoms(), d(2024, 3, 10)).unwrap();

        assert_eq!(
            log.factor_names,
            vec!["id", "elevated", "anxiety", "Mental Clarity"]
        );
        assert_eq!(log.entries.len(), 2);

        let first = &log.entries[0];
        assert_eq!(first.date, d(2024, 3, 9));
        assert_eq!(first.note, "good day");
        assert_eq!(first.factor("Mental Clarity"), None);

        let second = &log.entries[1];
        assert_eq!(second.factor("elevated"), Some(2.0));
        assert_eq!(second.factor("anxiety"), None);
        assert_eq!(second.factor("Mental Clarity"), Some(3.0));
        assert_eq!(second.note, "");
    }

    #[test]
    fn test_missing_date_column() {
        let fixed = RawTable::from_csv_str("ELEVATED\n3\n").unwrap();
        assert!(matches!(
            MoodMerger::merge(&fixed, &[], &[], d(2024, 1, 1)),
            Err(ComputeError::MissingColumn(_))
        ));
    }
}
