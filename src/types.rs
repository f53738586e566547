//! Core types for the Vitals Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw observations, reconciled daily series, scored strength sets,
//! mood entries, and the tidy rows handed to the output sink.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single dated measurement of a named metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub metric: String,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, metric: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            date,
            metric: metric.into(),
            value,
        }
    }
}

/// One calendar day of a reconciled series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// A contiguous daily series: exactly one point per calendar day in
/// `[start, end]`, ordered by date.
///
/// Only the reconciler builds these, so the no-gap invariant holds for every
/// instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    pub(crate) name: String,
    pub(crate) points: Vec<DailyPoint>,
}

impl DailySeries {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[DailyPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Value on a given day; `None` when the day is outside the series or null
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        let start = self.start()?;
        let offset = (date - start).num_days();
        if offset < 0 {
            return None;
        }
        self.points.get(offset as usize).and_then(|p| p.value)
    }

    /// Apply a function to every non-null value
    pub fn map_values<F>(mut self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        for point in &mut self.points {
            point.value = point.value.map(&f);
        }
        self
    }
}

/// One (date, metric) cell of a Cartesian-expanded series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub date: NaiveDate,
    pub metric: String,
    pub value: Option<f64>,
}

/// Daily series crossed with a fixed list of metrics: every date in range
/// appears once per metric, date-major then metric in the requested order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub(crate) metrics: Vec<String>,
    pub(crate) points: Vec<MetricPoint>,
}

impl MetricSeries {
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn points(&self) -> &[MetricPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of non-null values for one metric
    pub fn total(&self, metric: &str) -> f64 {
        self.points
            .iter()
            .filter(|p| p.metric == metric)
            .filter_map(|p| p.value)
            .sum()
    }

    /// Number of distinct days covered
    pub fn days(&self) -> usize {
        if self.metrics.is_empty() {
            0
        } else {
            self.points.len() / self.metrics.len()
        }
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days in the range, zero if `end < start`
    pub fn num_days(&self) -> usize {
        let days = (self.end - self.start).num_days() + 1;
        days.max(0) as usize
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.num_days() as i64).map(move |offset| self.start + Duration::days(offset))
    }
}

/// Cleaned Apple Health quantity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Record type with the `HKQuantityTypeIdentifier` prefix removed (e.g. "BodyMass")
    pub record_type: String,
    /// Numeric value; `None` when the export value was not a number
    pub value: Option<f64>,
    /// Calendar date of the record's end timestamp
    pub date: NaiveDate,
    /// Device name extracted from the device descriptor
    pub device: Option<String>,
}

/// Workout row as exported by Apple Health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Activity type with the vendor prefix removed (e.g. "Running")
    pub activity: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Duration in minutes
    pub duration_minutes: Option<f64>,
}

/// A single logged strength-training set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    pub date: NaiveDate,
    pub exercise_name: Option<String>,
    pub set_order: Option<u32>,
    pub weight: Option<f64>,
    pub reps: Option<f64>,
}

/// A strength set with its derived one-rep-max metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSetScored {
    pub date: NaiveDate,
    pub exercise_name: String,
    pub set_order: Option<u32>,
    pub weight: Option<f64>,
    pub reps: Option<f64>,
    pub one_rep_max: f64,
    pub cummax_one_rep_max: f64,
    pub rolling_90d_max: f64,
}

/// Long-format custom symptom entry from the mood tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEntry {
    pub symptom_id: i64,
    /// Day counter in the tracker's own epoch
    pub entry: i64,
    pub value: Option<f64>,
}

/// Custom symptom id → display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSymptom {
    pub id: i64,
    pub name: String,
}

/// One day of the merged mood log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub date: NaiveDate,
    pub note: String,
    /// Factor values; a missing key is a null value
    pub factors: BTreeMap<String, f64>,
}

impl MoodEntry {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            note: String::new(),
            factors: BTreeMap::new(),
        }
    }

    pub fn factor(&self, name: &str) -> Option<f64> {
        self.factors.get(name).copied()
    }

    pub fn set_factor(&mut self, name: &str, value: Option<f64>) {
        match value {
            Some(v) => {
                self.factors.insert(name.to_string(), v);
            }
            None => {
                self.factors.remove(name);
            }
        }
    }
}

/// The merged mood log: ordered factor columns plus one entry per date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoodLog {
    pub factor_names: Vec<String>,
    pub entries: Vec<MoodEntry>,
}

impl MoodLog {
    pub fn has_factor(&self, name: &str) -> bool {
        self.factor_names.iter().any(|f| f == name)
    }

    pub fn add_factor(&mut self, name: &str) {
        if !self.has_factor(name) {
            self.factor_names.push(name.to_string());
        }
    }

    pub fn remove_factor(&mut self, name: &str) {
        self.factor_names.retain(|f| f != name);
        for entry in &mut self.entries {
            entry.factors.remove(name);
        }
    }
}

/// Final mental-health output row, one per (date, category)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyMetricRow {
    pub date: NaiveDate,
    pub metric: String,
    pub value: Option<f64>,
    pub value_partial: Option<f64>,
    pub note: String,
}

/// `weight_data` output row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRow {
    pub date: NaiveDate,
    pub body_mass: Option<f64>,
}

/// `volume_data` output row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRow {
    pub date: NaiveDate,
    pub one_rep_max: f64,
}

/// `exercise_classifications` output row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseClassification {
    pub exercise_name: String,
    pub muscle_groups: String,
    pub anterior_posterior: String,
    pub push_pull_legs: String,
}
