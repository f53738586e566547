//! Mood log cleaning
//!
//! - factor names normalized (lowercase, whitespace runs → `_`)
//! - `liberty` backfilled from the mean of positive and negative liberty
//! - bookkeeping columns dropped
//! - a factor's nulls after its first logged day become the neutral value

use crate::ingest::normalize_column_name;
use crate::types::MoodLog;
use std::collections::BTreeMap;
use tracing::debug;

/// Columns removed after the merge
pub const DROPPED_COLUMNS: [&str; 5] = [
    "id",
    "date_(yyyy-mm-dd)",
    "positive_liberty",
    "negative_liberty",
    "combined_liberty",
];

pub struct MoodCleaner;

impl MoodCleaner {
    pub fn clean(log: MoodLog, neutral_fill_value: f64) -> MoodLog {
        let mut log = Self::normalize_names(log);
        Self::combine_liberty(&mut log);
        for column in DROPPED_COLUMNS {
            log.remove_factor(column);
        }
        Self::fill_after_first_seen(&mut log, neutral_fill_value);
        log
    }

    /// Colliding names keep the value of the earlier column
    fn normalize_names(log: MoodLog) -> MoodLog {
        let renames: Vec<(String, String)> = log
            .factor_names
            .iter()
            .map(|name| (name.clone(), normalize_column_name(name)))
            .collect();

        let mut cleaned = MoodLog::default();
        for (_, normalized) in &renames {
            cleaned.add_factor(normalized);
        }

        cleaned.entries = log
            .entries
            .into_iter()
            .map(|mut entry| {
                let mut factors = BTreeMap::new();
                for (original, normalized) in &renames {
                    if let Some(value) = entry.factors.get(original) {
                        factors.entry(normalized.clone()).or_insert(*value);
                    }
                }
                entry.factors = factors;
                entry
            })
            .collect();
        cleaned
    }

    fn combine_liberty(log: &mut MoodLog) {
        if !(log.has_factor("positive_liberty") && log.has_factor("negative_liberty")) {
            return;
        }
        log.add_factor("liberty");

        let mut filled = 0usize;
        for entry in &mut log.entries {
            if entry.factor("liberty").is_some() {
                continue;
            }
            if let (Some(positive), Some(negative)) = (
                entry.factor("positive_liberty"),
                entry.factor("negative_liberty"),
            ) {
                entry.set_factor("liberty", Some((positive + negative) / 2.0));
                filled += 1;
            }
        }
        debug!(rows = filled, "liberty filled from positive/negative liberty");
    }

    fn fill_after_first_seen(log: &mut MoodLog, neutral_fill_value: f64) {
        for name in log.factor_names.clone() {
            let first_seen = log
                .entries
                .iter()
                .filter(|e| e.factor(&name).is_some())
                .map(|e| e.date)
                .min();
            let Some(first_seen) = first_seen else {
                continue;
            };
            for entry in &mut log.entries {
                if entry.date > first_seen && entry.factor(&name).is_none() {
                    entry.set_factor(&name, Some(neutral_fill_value));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MoodEntry;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn entry(date: NaiveDate, values: &[(&str, f64)]) -> MoodEntry {
        let mut entry = MoodEntry::new(date);
        for (name, value) in values {
            entry.set_factor(name, Some(*value));
        }
        entry
    }

    #[test]
    fn test_names_normalized_and_columns_dropped() {
        let log = MoodLog {
            factor_names: vec![
                "id".into(),
                "elevated".into(),
                "Mental  Clarity".into(),
                "Positive Liberty".into(),
            ],
            entries: vec![entry(
                d(2024, 1, 1),
                &[
                    ("id", 7.0),
                    ("elevated", 2.0),
                    ("Mental  Clarity", 3.0),
                    ("Positive Liberty", 4.0),
                ],
            )],
        };
        let cleaned = MoodCleaner::clean(log, 1.0);
        assert_eq!(cleaned.factor_names, vec!["elevated", "mental_clarity"]);
        assert_eq!(cleaned.entries[0].factor("mental_clarity"), Some(3.0));
        assert_eq!(cleaned.entries[0].factor("id"), None);
    }

    #[test]
    fn test_liberty_fills_only_missing() {
        let log = MoodLog {
            factor_names: vec![
                "liberty".into(),
                "positive_liberty".into(),
                "negative_liberty".into(),
            ],
            entries: vec![
                entry(
                    d(2024, 1, 1),
                    &[("liberty", 4.0), ("positive_liberty", 1.0), ("negative_liberty", 1.0)],
                ),
                entry(
                    d(2024, 1, 2),
                    &[("positive_liberty", 2.0), ("negative_liberty", 3.0)],
                ),
                entry(d(2024, 1, 3), &[("positive_liberty", 2.0)]),
            ],
        };
        let cleaned = MoodCleaner::clean(log, 1.0);
        assert_eq!(cleaned.factor_names, vec!["liberty"]);
        assert_eq!(cleaned.entries[0].factor("liberty"), Some(4.0));
        assert_eq!(cleaned.entries[1].factor("liberty"), Some(2.5));
        // no combined value, but liberty was seen before: neutral fill
        assert_eq!(cleaned.entries[2].factor("liberty"), Some(1.0));
    }

    #[test]
    fn test_neutral_fill_strictly_after_first_seen() {
        let log = MoodLog {
            factor_names: vec!["energy".into(), "never".into()],
            entries: vec![
                MoodEntry::new(d(2024, 1, 1)),
                entry(d(2024, 1, 2), &[("energy", 3.0)]),
                MoodEntry::new(d(2024, 1, 3)),
            ],
        };
        let cleaned = MoodCleaner::clean(log, 1.0);
        assert_eq!(cleaned.entries[0].factor("energy"), None);
        assert_eq!(cleaned.entries[1].factor("energy"), Some(3.0));
        assert_eq!(cleaned.entries[2].factor("energy"), Some(1.0));
        assert!(cleaned.entries.iter().all(|e| e.factor("never").is_none()));
    }

    #[test]
    fn test_colliding_names_keep_first() {
        let log = MoodLog {
            factor_names: vec!["energy".into(), "Energy".into()],
            entries: vec![
                entry(d(2024, 1, 1), &[("energy", 3.0), ("Energy", 1.0)]),
                entry(d(2024, 1, 2), &[("Energy", 2.0)]),
            ],
        };
        let cleaned = MoodCleaner::clean(log, 1.0);
        assert_eq!(cleaned.factor_names, vec!["energy"]);
        assert_eq!(cleaned.entries[0].factor("energy"), Some(3.0));
        assert_eq!(cleaned.entries[1].factor("energy"), Some(2.0));
    }
}
