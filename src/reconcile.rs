//! Date-series reconciliation
//!
//! Turns sparse, irregular observations into a contiguous daily series:
//! - One point per calendar day over the observed span, or up to a fixed end date
//! - Optional Cartesian expansion of dates × metric names before the join
//! - Explicit fill policies applied by the caller afterwards
//!
//! Duplicate observations for the same day (and metric) are reduced with the
//! reconciler's [`Aggregation`] so every day appears exactly once.

use crate::error::ComputeError;
use crate::types::{DailyPoint, DailySeries, DateRange, MetricPoint, MetricSeries, Observation};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// How duplicate observations on one day are reduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    First,
    Min,
    Max,
    Sum,
    Mean,
}

impl Aggregation {
    fn reduce(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let reduced = match self {
            Aggregation::First => values[0],
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
        };
        Some(reduced)
    }
}

/// How null days are filled once a series is materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Leave nulls as they are
    Leave,
    /// Replace every null with 0
    Zero,
    /// Carry the last known value forward; leading nulls stay null
    ForwardFill,
    /// Linear interpolation between known points; the trailing gap carries the
    /// last known value and leading nulls stay null
    Interpolate,
}

/// Where a reconciled series ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesEnd {
    /// The last observed date
    LastObserved,
    /// A fixed date (typically "today"); never earlier than the last observation
    Through(NaiveDate),
}

/// Reconciler for building gap-free daily series
#[derive(Debug, Clone)]
pub struct Reconciler {
    start: Option<NaiveDate>,
    end: SeriesEnd,
    aggregation: Aggregation,
}

impl Reconciler {
    /// Reconcile over `[first observed, today]`
    pub fn through(today: NaiveDate, aggregation: Aggregation) -> Self {
        Self {
            start: None,
            end: SeriesEnd::Through(today),
            aggregation,
        }
    }

    /// Reconcile over `[first observed, last observed]`
    pub fn observed_span(aggregation: Aggregation) -> Self {
        Self {
            start: None,
            end: SeriesEnd::LastObserved,
            aggregation,
        }
    }

    /// Override the start date (defaults to the first observed date)
    pub fn starting_at(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    fn range_for(&self, observations: &[Observation]) -> Option<DateRange> {
        let first = observations.iter().map(|o| o.date).min()?;
        let last = observations.iter().map(|o| o.date).max()?;
        let start = self.start.unwrap_or(first);
        let end = match self.end {
            SeriesEnd::LastObserved => last,
            SeriesEnd::Through(date) => date.max(last),
        };
        Some(DateRange::new(start, end))
    }

    /// Build one point per day, left-joining the observations on date.
    ///
    /// Values on days without observations are null; apply a [`FillPolicy`]
    /// afterwards with [`DailySeries::filled`].
    pub fn reconcile(
        &self,
        name: &str,
        observations: &[Observation],
    ) -> Result<DailySeries, ComputeError> {
        let range = self
            .range_for(observations)
            .ok_or_else(|| ComputeError::EmptyInput(name.to_string()))?;

        let mut by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for obs in observations {
            let values = by_date.entry(obs.date).or_default();
            if let Some(v) = obs.value {
                values.push(v);
            }
        }

        let points = range
            .iter_days()
            .map(|date| DailyPoint {
                date,
                value: by_date
                    .get(&date)
                    .and_then(|values| self.aggregation.reduce(values)),
            })
            .collect();

        Ok(DailySeries {
            name: name.to_string(),
            points,
        })
    }

    /// Build the Cartesian product of every day in range and every metric,
    /// left-joining the observations on (date, metric).
    ///
    /// Observations for metrics outside `metrics` are ignored.
    pub fn reconcile_metrics(
        &self,
        observations: &[Observation],
        metrics: &[String],
    ) -> Result<MetricSeries, ComputeError> {
        if metrics.is_empty() {
            return Err(ComputeError::Config(
                "metric list for reconciliation is empty".to_string(),
            ));
        }
        let range = self
            .range_for(observations)
            .ok_or_else(|| ComputeError::EmptyInput(metrics.join(", ")))?;

        let mut by_key: HashMap<(NaiveDate, &str), Vec<f64>> = HashMap::new();
        for obs in observations {
            let values = by_key.entry((obs.date, obs.metric.as_str())).or_default();
            if let Some(v) = obs.value {
                values.push(v);
            }
        }

        let mut points = Vec::with_capacity(range.num_days() * metrics.len());
        for date in range.iter_days() {
            for metric in metrics {
                let value = by_key
                    .get(&(date, metric.as_str()))
                    .and_then(|values| self.aggregation.reduce(values));
                points.push(MetricPoint {
                    date,
                    metric: metric.clone(),
                    value,
                });
            }
        }

        Ok(MetricSeries {
            metrics: metrics.to_vec(),
            points,
        })
    }
}

impl DailySeries {
    /// Return the series with nulls filled according to `policy`
    pub fn filled(mut self, policy: FillPolicy) -> Self {
        let mut values: Vec<Option<f64>> = self.points.iter().map(|p| p.value).collect();
        fill_values(&mut values, policy);
        for (point, value) in self.points.iter_mut().zip(values) {
            point.value = value;
        }
        self
    }
}

impl MetricSeries {
    /// Return the series with nulls filled per metric according to `policy`
    pub fn filled(mut self, policy: FillPolicy) -> Self {
        let stride = self.metrics.len();
        for offset in 0..stride {
            let mut values: Vec<Option<f64>> = self
                .points
                .iter()
                .skip(offset)
                .step_by(stride)
                .map(|p| p.value)
                .collect();
            fill_values(&mut values, policy);
            for (point, value) in self
                .points
                .iter_mut()
                .skip(offset)
                .step_by(stride)
                .zip(values)
            {
                point.value = value;
            }
        }
        self
    }
}

fn fill_values(values: &mut [Option<f64>], policy: FillPolicy) {
    match policy {
        FillPolicy::Leave => {}
        FillPolicy::Zero => {
            for v in values.iter_mut() {
                v.get_or_insert(0.0);
            }
        }
        FillPolicy::ForwardFill => {
            let mut last = None;
            for v in values.iter_mut() {
                match v {
                    Some(current) => last = Some(*current),
                    None => *v = last,
                }
            }
        }
        FillPolicy::Interpolate => interpolate(values),
    }
}

/// Positional linear interpolation
fn interpolate(values: &mut [Option<f64>]) {
    let known: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|x| (i, x)))
        .collect();

    for pair in known.windows(2) {
        let (left_idx, left) = pair[0];
        let (right_idx, right) = pair[1];
        let span = (right_idx - left_idx) as f64;
        for idx in (left_idx + 1)..right_idx {
            let step = (idx - left_idx) as f64;
            values[idx] = Some(left + (right - left) * step / span);
        }
    }

    if let Some(&(last_idx, last)) = known.last() {
        for v in values.iter_mut().skip(last_idx + 1) {
            *v = Some(last);
        }
    }
}
