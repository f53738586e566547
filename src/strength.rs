//! Strength metric engine
//!
//! Estimates a one-rep max for every logged set, then tracks per exercise:
//! - `cummax_one_rep_max`: running max of the daily best up to each date
//! - `rolling_90d_max`: max of the daily best over the trailing window
//!   `[d - (window - 1), d]`, calendar-day bounded
//!
//! Sets with an undefined or non-positive 1RM, or without an exercise name,
//! are dropped from the output.

use crate::config::StrengthConfig;
use crate::types::{DailySeries, ExerciseSet, ExerciseSetScored};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Epley estimate: `load * (1 + reps / 30)`
pub fn epley(load: f64, reps: f64) -> f64 {
    load * (1.0 + reps / 30.0)
}

/// Running metrics for one (exercise, date)
#[derive(Debug, Clone, Copy, PartialEq)]
struct DayMetrics {
    cummax: f64,
    rolling_max: f64,
}

pub struct StrengthEngine {
    unweighted: HashSet<String>,
    barbell_marker: String,
    bar_weight: f64,
    window_days: i64,
}

impl StrengthEngine {
    pub fn new(config: &StrengthConfig) -> Self {
        Self {
            unweighted: config.unweighted_exercises.iter().cloned().collect(),
            barbell_marker: config.barbell_marker.clone(),
            bar_weight: config.bar_weight,
            window_days: i64::from(config.rolling_window_days.max(1)),
        }
    }

    pub fn is_unweighted(&self, exercise_name: &str) -> bool {
        self.unweighted.contains(exercise_name)
    }

    pub fn is_barbell(&self, exercise_name: &str) -> bool {
        !self.barbell_marker.is_empty() && exercise_name.contains(self.barbell_marker.as_str())
    }

    /// 1RM of a single set.
    ///
    /// Bodyweight exercises use the day's body mass as the load; barbell
    /// variants add the bar. `None` when the load or reps are missing, the body
    /// mass for a bodyweight exercise is unknown, or the result is not finite.
    pub fn one_rep_max(&self, set: &ExerciseSet, body_mass: Option<f64>) -> Option<f64> {
        let name = set.exercise_name.as_deref()?;
        let reps = set.reps?;

        let load = if self.is_unweighted(name) {
            body_mass?
        } else {
            let weight = set.weight?;
            if self.is_barbell(name) {
                weight + self.bar_weight
            } else {
                weight
            }
        };

        let estimate = epley(load, reps);
        estimate.is_finite().then_some(estimate)
    }

    /// Score every set against the daily body-mass series
    ///
    /// Output is ordered by (date, exercise name, set order). An empty input
    /// gives an empty output.
    pub fn compute(&self, sets: &[ExerciseSet], body_mass: &DailySeries) -> Vec<ExerciseSetScored> {
        if sets.is_empty() {
            return Vec::new();
        }

        let estimates: Vec<Option<f64>> = sets
            .iter()
            .map(|set| self.one_rep_max(set, body_mass.value_on(set.date)))
            .collect();

        // Daily best per exercise
        let mut daily_max: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for (set, estimate) in sets.iter().zip(&estimates) {
            if let (Some(name), Some(value)) = (set.exercise_name.as_deref(), estimate) {
                daily_max
                    .entry(name)
                    .or_default()
                    .entry(set.date)
                    .and_modify(|best| *best = best.max(*value))
                    .or_insert(*value);
            }
        }

        let mut metrics: HashMap<(&str, NaiveDate), DayMetrics> = HashMap::new();
        for (name, days) in &daily_max {
            for (date, day_metrics) in self.scan(days) {
                metrics.insert((*name, date), day_metrics);
            }
        }

        let mut undefined = 0usize;
        let mut non_positive = 0usize;
        let mut unnamed = 0usize;
        let mut scored = Vec::with_capacity(sets.len());

        for (set, estimate) in sets.iter().zip(estimates) {
            let Some(name) = set.exercise_name.as_deref() else {
                unnamed += 1;
                continue;
            };
            let Some(one_rep_max) = estimate else {
                undefined += 1;
                continue;
            };
            if one_rep_max <= 0.0 {
                non_positive += 1;
                continue;
            }
            let Some(day) = metrics.get(&(name, set.date)) else {
                continue;
            };
            scored.push(ExerciseSetScored {
                date: set.date,
                exercise_name: name.to_string(),
                set_order: set.set_order,
                weight: set.weight,
                reps: set.reps,
                one_rep_max,
                cummax_one_rep_max: day.cummax,
                rolling_90d_max: day.rolling_max,
            });
        }

        scored.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.exercise_name.cmp(&b.exercise_name))
                .then_with(|| a.set_order.cmp(&b.set_order))
        });

        if undefined > 0 {
            warn!(sets = undefined, "sets dropped with undefined 1RM");
        }
        if unnamed > 0 || non_positive > 0 {
            debug!(unnamed, non_positive, "sets filtered");
        }
        info!(
            sets = scored.len(),
            exercises = daily_max.len(),
            "strength metrics computed"
        );
        scored
    }

    /// Cumulative and rolling max over one exercise's daily bests
    fn scan(&self, days: &BTreeMap<NaiveDate, f64>) -> Vec<(NaiveDate, DayMetrics)> {
        let mut out = Vec::with_capacity(days.len());
        let mut cummax = f64::NEG_INFINITY;
        // Monotonic deque: values decreasing front to back
        let mut window: VecDeque<(NaiveDate, f64)> = VecDeque::new();

        for (&date, &value) in days {
            cummax = cummax.max(value);

            while window.back().map_or(false, |&(_, v)| v <= value) {
                window.pop_back();
            }
            window.push_back((date, value));

            let oldest = date - Duration::days(self.window_days - 1);
            while window.front().map_or(false, |&(d, _)| d < oldest) {
                window.pop_front();
            }

            let rolling_max = window.front().map_or(value, |&(_, v)| v);
            out.push((
                date,
                DayMetrics {
                    cummax,
                    rolling_max,
                },
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::reconcile::{Aggregation, Reconciler};
    use crate::types::Observation;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn engine() -> StrengthEngine {
        StrengthEngine::new(&PipelineConfig::builtin().unwrap().strength)
    }

    fn set(date: NaiveDate, name: &str, order: u32, weight: Option<f64>, reps: f64) -> ExerciseSet {
        ExerciseSet {
            date,
            exercise_name: Some(name.to_string()),
            set_order: Some(order),
            weight,
            reps: Some(reps),
        }
    }

    fn body_mass(date: NaiveDate, value: f64) -> DailySeries {
        Reconciler::observed_span(Aggregation::Min)
            .reconcile("body_mass", &[Observation::new(date, "body_mass", Some(value))])
            .unwrap()
    }

    #[test]
    fn test_one_rep_max_formula() {
        let engine = engine();
        let plain = set(d(2024, 1, 1), "Leg Press", 1, Some(100.0), 5.0);
        let value = engine.one_rep_max(&plain, None).unwrap();
        assert!((value - 116.667).abs() < 1e-3);

        let barbell = set(d(2024, 1, 1), "Bench Press (Barbell)", 1, Some(100.0), 5.0);
        let value = engine.one_rep_max(&barbell, None).unwrap();
        assert!((value - 168.0).abs() < 1e-9);
    }

    #[test]
    fn test_unweighted_uses_body_mass() {
        let engine = engine();
        let chin_up = set(d(2024, 1, 1), "Chin Up", 1, None, 6.0);
        let value = engine.one_rep_max(&chin_up, Some(180.0)).unwrap();
        assert!((value - 216.0).abs() < 1e-9);

        // no body mass: undefined, never zero
        assert_eq!(engine.one_rep_max(&chin_up, None), None);
    }

    #[test]
    fn test_missing_body_mass_drops_set() {
        let engine = engine();
        let day = d(2024, 1, 1);
        let sets = vec![
            set(day, "Chin Up", 1, None, 6.0),
            set(day, "Leg Press", 1, Some(100.0), 5.0),
        ];
        let scored = engine.compute(&sets, &body_mass(d(2024, 2, 1), 180.0));
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].exercise_name, "Leg Press");
    }

    #[test]
    fn test_missing_weight_or_reps_is_undefined() {
        let engine = engine();
        let day = d(2024, 1, 1);
        let no_weight = set(day, "Leg Press", 1, None, 5.0);
        assert_eq!(engine.one_rep_max(&no_weight, Some(180.0)), None);

        let mut no_reps = set(day, "Leg Press", 2, Some(100.0), 5.0);
        no_reps.reps = None;
        assert_eq!(engine.one_rep_max(&no_reps, Some(180.0)), None);

        let mut chin_up_no_reps = set(day, "Chin Up", 1, None, 6.0);
        chin_up_no_reps.reps = None;
        assert_eq!(engine.one_rep_max(&chin_up_no_reps, Some(180.0)), None);

        let sets = vec![
            no_weight,
            no_reps,
            set(day, "Leg Press", 3, Some(-20.0), 5.0),
            set(day, "Chin Up", 1, None, 6.0),
        ];
        let scored = engine.compute(&sets, &body_mass(day, 180.0));
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].exercise_name, "Chin Up");
        assert!((scored[0].one_rep_max - 216.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        let engine = engine();
        assert!(engine.compute(&[], &body_mass(d(2024, 1, 1), 180.0)).is_empty());
    }

    #[test]
    fn test_filters_unnamed_and_zero() {
        let engine = engine();
        let day = d(2024, 1, 1);
        let mut unnamed = set(day, "x", 1, Some(100.0), 5.0);
        unnamed.exercise_name = None;
        let sets = vec![
            unnamed,
            set(day, "Leg Press", 2, Some(0.0), 5.0),
            set(day, "Leg Press", 3, Some(50.0), 0.0),
        ];
        let scored = engine.compute(&sets, &body_mass(day, 180.0));
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].set_order, Some(3));
        assert!((scored[0].one_rep_max - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_cummax_monotonic_and_sorted() {
        let engine = engine();
        let sets = vec![
            set(d(2024, 1, 3), "Squat", 1, Some(80.0), 5.0),
            set(d(2024, 1, 1), "Squat", 1, Some(100.0), 5.0),
            set(d(2024, 1, 2), "Curl", 1, Some(20.0), 10.0),
            set(d(2024, 1, 5), "Squat", 1, Some(120.0), 5.0),
            set(d(2024, 1, 1), "Squat", 2, Some(90.0), 5.0),
        ];
        let scored = engine.compute(&sets, &body_mass(d(2024, 1, 1), 180.0));

        let keys: Vec<_> = scored
            .iter()
            .map(|s| (s.date, s.exercise_name.as_str(), s.set_order))
            .collect();
        assert_eq!(
            keys,
            vec![
                (d(2024, 1, 1), "Squat", Some(1)),
                (d(2024, 1, 1), "Squat", Some(2)),
                (d(2024, 1, 2), "Curl", Some(1)),
                (d(2024, 1, 3), "Squat", Some(1)),
                (d(2024, 1, 5), "Squat", Some(1)),
            ]
        );

        let squats: Vec<_> = scored.iter().filter(|s| s.exercise_name == "Squat").collect();
        for pair in squats.windows(2) {
            assert!(pair[1].cummax_one_rep_max >= pair[0].cummax_one_rep_max);
        }
        // both sets on the first day carry the day's best
        assert_eq!(squats[0].cummax_one_rep_max, squats[1].cummax_one_rep_max);
        assert!((squats[2].cummax_one_rep_max - epley(100.0, 5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_window_bounds() {
        let engine = engine();
        let start = d(2024, 1, 1);
        let sets = vec![
            set(start, "Deadlift", 1, Some(200.0), 1.0),
            set(start + Duration::days(89), "Deadlift", 1, Some(100.0), 1.0),
            set(start + Duration::days(90), "Deadlift", 1, Some(150.0), 1.0),
            set(start + Duration::days(120), "Deadlift", 1, Some(120.0), 1.0),
        ];
        let scored = engine.compute(&sets, &body_mass(start, 180.0));

        // day 89 still sees day 0; day 90 does not
        assert!((scored[1].rolling_90d_max - epley(200.0, 1.0)).abs() < 1e-9);
        assert!((scored[2].rolling_90d_max - epley(150.0, 1.0)).abs() < 1e-9);
        assert!((scored[3].rolling_90d_max - epley(150.0, 1.0)).abs() < 1e-9);
        assert!((scored[3].cummax_one_rep_max - epley(200.0, 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_matches_brute_force() {
        let engine = engine();
        let start = d(2023, 1, 1);
        let weights = [100.0, 140.0, 90.0, 130.0, 160.0, 80.0, 120.0, 110.0];
        let offsets = [0, 30, 60, 95, 100, 150, 200, 260];
        let sets: Vec<_> = offsets
            .iter()
            .zip(weights)
            .map(|(&o, w)| set(start + Duration::days(o), "Row", 1, Some(w), 5.0))
            .collect();
        let scored = engine.compute(&sets, &body_mass(start, 180.0));

        for row in &scored {
            let expected = scored
                .iter()
                .filter(|s| s.date <= row.date && s.date >= row.date - Duration::days(89))
                .map(|s| s.one_rep_max)
                .fold(f64::NEG_INFINITY, f64::max);
            assert!((row.rolling_90d_max - expected).abs() < 1e-9);
        }
    }
}
