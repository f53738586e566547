//! Score calculation
//!
//! Each category is scored twice per day: once requiring every factor
//! (full cutoff) and once tolerating half of them missing (partial cutoff).
//! A day is undefined when it falls in an excluded range, misses the cutoff,
//! or carries only placeholder values.

use crate::config::MentalHealthConfig;
use crate::error::ComputeError;
use crate::mental::definitions::ScoreDefinition;
use crate::types::{DateRange, MoodEntry, MoodLog};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Name of the derived anxiety/depression factor
pub const INTERACTION_FACTOR: &str = "anxiety_depression_interaction";

/// `0.5 * sqrt(anxiety^p + depressed^p)`; zero or missing inputs are undefined
pub fn anxiety_depression_interaction(
    anxiety: Option<f64>,
    depressed: Option<f64>,
    exponent: f64,
) -> Option<f64> {
    let term = |x: Option<f64>| x.filter(|v| *v != 0.0).map(|v| v.powf(exponent));
    match (term(anxiety), term(depressed)) {
        (Some(a), Some(d)) => {
            let value = 0.5 * (a + d).sqrt();
            value.is_finite().then_some(value)
        }
        _ => None,
    }
}

/// Full and partial scores for one day, one slot per category
#[derive(Debug, Clone, PartialEq)]
pub struct DailyScores {
    pub date: NaiveDate,
    pub note: String,
    pub full: Vec<Option<f64>>,
    pub partial: Vec<Option<f64>>,
}

/// Validated scoring engine
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    categories: Vec<ScoreDefinition>,
    excluded_ranges: Vec<DateRange>,
    zero_baseline: HashSet<String>,
    full_cutoff: f64,
    partial_cutoff: f64,
    interaction_exponent: f64,
}

impl ScoringEngine {
    /// Build the engine, rejecting malformed definitions up front
    pub fn new(config: &MentalHealthConfig) -> Result<Self, ComputeError> {
        for (label, cutoff) in [
            ("full_cutoff", config.full_cutoff),
            ("partial_cutoff", config.partial_cutoff),
        ] {
            if !(cutoff > 0.0 && cutoff <= 1.0) {
                return Err(ComputeError::InvalidDefinition(format!(
                    "{} must be in (0, 1], got {}",
                    label, cutoff
                )));
            }
        }
        if !config.interaction_exponent.is_finite() {
            return Err(ComputeError::InvalidDefinition(
                "interaction_exponent must be finite".to_string(),
            ));
        }
        if config.categories.is_empty() {
            return Err(ComputeError::InvalidDefinition(
                "no score categories defined".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for definition in &config.categories {
            if !names.insert(definition.name.as_str()) {
                return Err(ComputeError::InvalidDefinition(format!(
                    "duplicate category '{}'",
                    definition.name
                )));
            }
            definition.validate()?;
        }

        Ok(Self {
            categories: config.categories.clone(),
            excluded_ranges: config.excluded_ranges.clone(),
            zero_baseline: config.zero_baseline_factors.iter().cloned().collect(),
            full_cutoff: config.full_cutoff,
            partial_cutoff: config.partial_cutoff,
            interaction_exponent: config.interaction_exponent,
        })
    }

    pub fn categories(&self) -> &[ScoreDefinition] {
        &self.categories
    }

    /// Add the derived interaction factor to every entry
    pub fn add_interaction(&self, log: &mut MoodLog) {
        log.add_factor(INTERACTION_FACTOR);
        for entry in &mut log.entries {
            let value = anxiety_depression_interaction(
                entry.factor("anxiety"),
                entry.factor("depressed"),
                self.interaction_exponent,
            );
            entry.set_factor(INTERACTION_FACTOR, value);
        }
    }

    pub fn is_excluded(&self, date: NaiveDate) -> bool {
        self.excluded_ranges.iter().any(|range| range.contains(date))
    }

    /// Placeholder row: every zero-baseline factor of the definition is 0 and
    /// every other factor is 1
    pub fn is_degenerate(&self, definition: &ScoreDefinition, entry: &MoodEntry) -> bool {
        definition.factors.iter().all(|factor| {
            let expected = if self.zero_baseline.contains(&factor.name) {
                0.0
            } else {
                1.0
            };
            entry.factor(&factor.name) == Some(expected)
        })
    }

    /// Score one day against one definition; `None` when the day is invalid
    pub fn calculate_score(
        &self,
        definition: &ScoreDefinition,
        entry: &MoodEntry,
        cutoff: f64,
    ) -> Option<f64> {
        if self.is_excluded(entry.date) {
            return None;
        }

        let total = definition.factors.len();
        let available = definition
            .factors
            .iter()
            .filter(|f| entry.factor(&f.name).is_some())
            .count();
        if total == 0 || (available as f64 / total as f64) < cutoff {
            return None;
        }

        if self.is_degenerate(definition, entry) {
            return None;
        }

        let mut raw = 0.0;
        for factor in &definition.factors {
            if let Some(value) = entry.factor(&factor.name) {
                raw += factor.contribution(value);
            }
        }

        if definition.rescale {
            let (min_possible, max_possible) = definition.raw_bounds();
            Some((raw - min_possible) / (max_possible - min_possible) * 200.0 - 100.0)
        } else {
            Some(raw)
        }
    }

    /// Full and partial scores for every entry and category
    pub fn score_log(&self, log: &MoodLog) -> Vec<DailyScores> {
        log.entries
            .iter()
            .map(|entry| DailyScores {
                date: entry.date,
                note: entry.note.clone(),
                full: self
                    .categories
                    .iter()
                    .map(|c| self.calculate_score(c, entry, self.full_cutoff))
                    .collect(),
                partial: self
                    .categories
                    .iter()
                    .map(|c| self.calculate_score(c, entry, self.partial_cutoff))
                    .collect(),
            })
            .collect()
    }
}
