//! Mental health pipeline orchestration
//!
//! Merge → Clean → Annotate → Interaction → Score → Tidy

use crate::config::MentalHealthConfig;
use crate::error::ComputeError;
use crate::ingest::RawTable;
use crate::mental::annotate::annotate_exceptional_days;
use crate::mental::clean::MoodCleaner;
use crate::mental::definitions::ExceptionalDay;
use crate::mental::merge::MoodMerger;
use crate::mental::score::ScoringEngine;
use crate::mental::tidy::tidy_scores;
use crate::types::{CustomEntry, CustomSymptom, TidyMetricRow};
use chrono::NaiveDate;
use tracing::{debug, info};

/// Borrowed inputs of one mental health run
#[derive(Debug, Clone, Copy)]
pub struct MoodInputs<'a> {
    pub fixed_log: &'a RawTable,
    pub custom_entries: &'a [CustomEntry],
    pub custom_symptoms: &'a [CustomSymptom],
}

/// Runs the mood stages with a validated scoring engine
#[derive(Debug, Clone)]
pub struct MentalHealthProcessor {
    engine: ScoringEngine,
    neutral_fill_value: f64,
    exceptional_days: Vec<ExceptionalDay>,
}

impl MentalHealthProcessor {
    /// Fails when any score definition is malformed
    pub fn new(config: &MentalHealthConfig) -> Result<Self, ComputeError> {
        Ok(Self {
            engine: ScoringEngine::new(config)?,
            neutral_fill_value: config.neutral_fill_value,
            exceptional_days: config.exceptional_days.clone(),
        })
    }

    pub fn process(
        &self,
        inputs: MoodInputs<'_>,
        today: NaiveDate,
    ) -> Result<Vec<TidyMetricRow>, ComputeError> {
        // Stage 1: Merge fixed and custom logs
        let merged = MoodMerger::merge(
            inputs.fixed_log,
            inputs.custom_entries,
            inputs.custom_symptoms,
            today,
        )?;
        debug!(
            days = merged.entries.len(),
            factors = merged.factor_names.len(),
            "mood logs merged"
        );

        // Stage 2: Clean
        let mut log = MoodCleaner::clean(merged, self.neutral_fill_value);

        // Stage 3: Exceptional days
        let overrides = annotate_exceptional_days(&mut log, &self.exceptional_days);
        debug!(overrides, "exceptional days annotated");

        // Stage 4: Derived interaction factor
        self.engine.add_interaction(&mut log);

        // Stage 5: Score every category at both cutoffs
        let scores = self.engine.score_log(&log);

        // Stage 6: Tidy reshape
        let rows = tidy_scores(self.engine.categories(), &scores);
        info!(
            days = scores.len(),
            rows = rows.len(),
            scored = rows.iter().filter(|r| r.value.is_some()).count(),
            "mental health scored"
        );
        Ok(rows)
    }
}
