//! Cardio workouts
//!
//! Extracts soccer and other cardio sessions from the workouts export and
//! totals their minutes per activity per day.

use crate::config::WorkoutConfig;
use crate::error::ComputeError;
use crate::ingest::{parse_date, parse_number, RawTable};
use crate::reconcile::{Aggregation, FillPolicy, Reconciler};
use crate::types::{MetricSeries, Observation, WorkoutRecord};
use chrono::NaiveDate;

/// Prefix Apple puts on every workout activity type
pub const WORKOUT_TYPE_PREFIX: &str = "HKWorkoutActivityType";

/// Activity name with the vendor prefix removed, matched case-insensitively
pub fn strip_activity_prefix(raw: &str) -> &str {
    let raw = raw.trim();
    let prefix_len = WORKOUT_TYPE_PREFIX.len();
    match raw.get(..prefix_len) {
        Some(head) if head.eq_ignore_ascii_case(WORKOUT_TYPE_PREFIX) => &raw[prefix_len..],
        _ => raw,
    }
}

/// Parse the workouts table
///
/// The activity column is `workoutactivitytype`, falling back to `type`.
pub fn workout_records(table: &RawTable) -> Result<Vec<WorkoutRecord>, ComputeError> {
    let activity_col = match table.column_index("workoutactivitytype") {
        Some(col) => col,
        None => table.require_column("type")?,
    };
    let start_col = table.require_column("startdate")?;
    let end_col = table.column_index("enddate");
    let duration_col = table.column_index("duration");

    let mut records = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let start = table.cell(row, start_col);
        if start.trim().is_empty() {
            continue;
        }
        let end_date = match end_col.map(|c| table.cell(row, c)) {
            Some(cell) if !cell.trim().is_empty() => Some(parse_date(cell)?),
            _ => None,
        };
        records.push(WorkoutRecord {
            activity: strip_activity_prefix(table.cell(row, activity_col)).to_string(),
            start_date: parse_date(start)?,
            end_date,
            duration_minutes: duration_col.and_then(|c| parse_number(table.cell(row, c))),
        });
    }
    Ok(records)
}

/// Sessions of the configured cardio activities
pub fn extract_cardio(records: &[WorkoutRecord], config: &WorkoutConfig) -> Vec<WorkoutRecord> {
    records
        .iter()
        .filter(|r| config.activities.iter().any(|a| *a == r.activity))
        .cloned()
        .collect()
}

/// Minutes per activity per day from the first session through `today`,
/// every configured activity on every day, zero when idle
pub fn daily_cardio_minutes(
    records: &[WorkoutRecord],
    config: &WorkoutConfig,
    today: NaiveDate,
) -> Result<MetricSeries, ComputeError> {
    let observations: Vec<Observation> = extract_cardio(records, config)
        .into_iter()
        .map(|r| Observation::new(r.start_date, r.activity, r.duration_minutes))
        .collect();

    Ok(Reconciler::through(today, Aggregation::Sum)
        .reconcile_metrics(&observations, &config.activities)?
        .filled(FillPolicy::Zero))
}
