//! Daily training volume
//!
//! Sums the one-rep max of every scored set per day over the span of
//! training days, with rest days filled as zero.

use crate::error::ComputeError;
use crate::reconcile::{Aggregation, FillPolicy, Reconciler};
use crate::types::{DailySeries, ExerciseSetScored, Observation, VolumeRow};
use tracing::info;

pub const VOLUME_METRIC: &str = "one_rep_max";

pub struct VolumeAggregator;

impl VolumeAggregator {
    /// Fails with [`ComputeError::EmptyInput`] when there are no scored sets
    pub fn aggregate(scored: &[ExerciseSetScored]) -> Result<DailySeries, ComputeError> {
        let observations: Vec<Observation> = scored
            .iter()
            .map(|set| Observation::new(set.date, VOLUME_METRIC, Some(set.one_rep_max)))
            .collect();

        let series = Reconciler::observed_span(Aggregation::Sum)
            .reconcile(VOLUME_METRIC, &observations)?
            .filled(FillPolicy::Zero);

        info!(days = series.len(), "volume aggregated");
        Ok(series)
    }

    /// Output rows for a zero-filled volume series
    pub fn rows(series: &DailySeries) -> Vec<VolumeRow> {
        series
            .points()
            .iter()
            .map(|p| VolumeRow {
                date: p.date,
                one_rep_max: p.value.unwrap_or(0.0),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn scored(date: NaiveDate, one_rep_max: f64) -> ExerciseSetScored {
        ExerciseSetScored {
            date,
            exercise_name: "Squat".to_string(),
            set_order: Some(1),
            weight: None,
            reps: None,
            one_rep_max,
            cummax_one_rep_max: one_rep_max,
            rolling_90d_max: one_rep_max,
        }
    }

    #[test]
    fn test_sums_per_day_and_zero_fills() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d4 = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let series =
            VolumeAggregator::aggregate(&[scored(d1, 100.0), scored(d1, 50.0), scored(d4, 80.0)])
                .unwrap();
        let rows = VolumeAggregator::rows(&series);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].one_rep_max, 150.0);
        assert_eq!(rows[1].one_rep_max, 0.0);
        assert_eq!(rows[2].one_rep_max, 0.0);
        assert_eq!(rows[3].one_rep_max, 80.0);
        assert_eq!(rows[3].date, d4);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(
            VolumeAggregator::aggregate(&[]),
            Err(ComputeError::EmptyInput(_))
        ));
    }
}
