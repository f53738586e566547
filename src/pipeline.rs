//! Pipeline orchestration
//!
//! This module provides the public API for Vitals Flux. It runs every stage
//! over one set of input tables and hands the finished tables to a sink:
//!
//! health records → body mass ─┐
//! strength log ───────────────┴→ strength metrics → volume
//! mood logs → mental health scores
//! classifier output → exercise classifications (optional)
//!
//! Nothing is written unless every stage succeeds.

use crate::classification::{assignments_from_table, classify};
use crate::config::{PathsConfig, PipelineConfig};
use crate::error::ComputeError;
use crate::health::{body_mass_series, clean_health_records, weight_rows};
use crate::ingest::{custom_entries, custom_symptoms, strength_sets, RawTable};
use crate::mental::{MentalHealthProcessor, MoodInputs};
use crate::sink::{encode_csv, EncodedTable, TableSink};
use crate::strength::StrengthEngine;
use crate::types::{ExerciseClassification, ExerciseSetScored, TidyMetricRow, VolumeRow, WeightRow};
use crate::volume::VolumeAggregator;
use chrono::NaiveDate;
use tracing::{info, info_span, warn};
use uuid::Uuid;

pub const WEIGHT_TABLE: &str = "weight_data";
pub const WEIGHTLIFTING_TABLE: &str = "weightlifting_data";
pub const MENTAL_HEALTH_TABLE: &str = "mental_health_data";
pub const VOLUME_TABLE: &str = "volume_data";
pub const CLASSIFICATION_TABLE: &str = "exercise_classifications";

/// Raw input tables of one run
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub health_records: RawTable,
    pub strength_log: RawTable,
    pub mood_log: RawTable,
    pub custom_entries: RawTable,
    pub custom_symptoms: RawTable,
    pub exercise_muscle_groups: Option<RawTable>,
}

impl PipelineInputs {
    /// Read every input CSV from the configured directory
    ///
    /// The classifier table is optional and skipped when its file is absent.
    pub fn load(paths: &PathsConfig) -> Result<Self, ComputeError> {
        let exercise_muscle_groups = match &paths.exercise_muscle_groups {
            Some(file) => {
                let path = paths.input(file);
                if path.exists() {
                    Some(RawTable::from_path(&path)?)
                } else {
                    warn!(path = %path.display(), "classifier output not found, skipping classification");
                    None
                }
            }
            None => None,
        };

        Ok(Self {
            health_records: RawTable::from_path(&paths.input(&paths.health_records))?,
            strength_log: RawTable::from_path(&paths.input(&paths.strength_log))?,
            mood_log: RawTable::from_path(&paths.input(&paths.mood_log))?,
            custom_entries: RawTable::from_path(&paths.input(&paths.custom_entries))?,
            custom_symptoms: RawTable::from_path(&paths.input(&paths.custom_symptoms))?,
            exercise_muscle_groups,
        })
    }
}

/// Finished output tables
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutputs {
    pub weight_data: Vec<WeightRow>,
    pub weightlifting_data: Vec<ExerciseSetScored>,
    pub mental_health_data: Vec<TidyMetricRow>,
    pub volume_data: Vec<VolumeRow>,
    pub exercise_classifications: Option<Vec<ExerciseClassification>>,
}

impl PipelineOutputs {
    /// Encode every table to CSV, in a fixed order
    pub fn encode(&self) -> Result<Vec<EncodedTable>, ComputeError> {
        let mut tables = vec![
            encode_csv(WEIGHT_TABLE, &self.weight_data)?,
            encode_csv(WEIGHTLIFTING_TABLE, &self.weightlifting_data)?,
            encode_csv(MENTAL_HEALTH_TABLE, &self.mental_health_data)?,
            encode_csv(VOLUME_TABLE, &self.volume_data)?,
        ];
        if let Some(classifications) = &self.exercise_classifications {
            tables.push(encode_csv(CLASSIFICATION_TABLE, classifications)?);
        }
        Ok(tables)
    }

    /// Encode everything first, then write
    pub fn write_to(&self, sink: &mut dyn TableSink) -> Result<(), ComputeError> {
        let tables = self.encode()?;
        sink.write_all(&tables)
    }
}

/// Validated pipeline, reusable across runs
pub struct HealthPipeline {
    config: PipelineConfig,
    strength: StrengthEngine,
    mental: MentalHealthProcessor,
}

impl HealthPipeline {
    /// Fails fast on an invalid configuration
    pub fn new(config: PipelineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            strength: StrengthEngine::new(&config.strength),
            mental: MentalHealthProcessor::new(&config.mental_health)?,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage; `today` closes the body-mass series and anchors the
    /// custom mood entries
    pub fn run(
        &self,
        inputs: &PipelineInputs,
        today: NaiveDate,
    ) -> Result<PipelineOutputs, ComputeError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", run_id = %run_id, today = %today);
        let _guard = span.enter();

        // Stage 1: Body mass
        let records = clean_health_records(&inputs.health_records)?;
        let body_mass = body_mass_series(&records, &self.config.weight, today)?;

        // Stage 2: Strength metrics
        let sets = strength_sets(&inputs.strength_log)?;
        let scored = self.strength.compute(&sets, &body_mass);

        // Stage 3: Volume
        let volume = VolumeAggregator::aggregate(&scored)?;

        // Stage 4: Mental health
        let entries = custom_entries(&inputs.custom_entries)?;
        let symptoms = custom_symptoms(&inputs.custom_symptoms)?;
        let mental_health_data = self.mental.process(
            MoodInputs {
                fixed_log: &inputs.mood_log,
                custom_entries: &entries,
                custom_symptoms: &symptoms,
            },
            today,
        )?;

        // Stage 5: Exercise classification
        let exercise_classifications = match &inputs.exercise_muscle_groups {
            Some(table) => {
                let assignments = assignments_from_table(table)?;
                Some(classify(
                    &assignments,
                    &self.config.classification.muscle_groups,
                ))
            }
            None => None,
        };

        let outputs = PipelineOutputs {
            weight_data: weight_rows(&body_mass),
            weightlifting_data: scored,
            mental_health_data,
            volume_data: VolumeAggregator::rows(&volume),
            exercise_classifications,
        };
        info!(
            weight_days = outputs.weight_data.len(),
            sets = outputs.weightlifting_data.len(),
            mental_rows = outputs.mental_health_data.len(),
            volume_days = outputs.volume_data.len(),
            "pipeline complete"
        );
        Ok(outputs)
    }
}

/// Load inputs from the configured directory, run, and write to `sink`
pub fn run_pipeline(
    config: PipelineConfig,
    today: NaiveDate,
    sink: &mut dyn TableSink,
) -> Result<PipelineOutputs, ComputeError> {
    let pipeline = HealthPipeline::new(config)?;
    let inputs = PipelineInputs::load(&pipeline.config().paths)?;
    let outputs = pipeline.run(&inputs, today)?;
    outputs.write_to(sink)?;
    Ok(outputs)
}
