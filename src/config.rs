//! Pipeline configuration
//!
//! Every literal table the pipeline depends on (unweighted exercises, bar
//! weight, exceptional days, score categories, excluded date ranges, cardio
//! activities, muscle-group reference) lives in `config/defaults.toml`, which
//! is embedded in the binary. A user file is merged over the defaults:
//! - tables merge key by key
//! - arrays and scalars replace the default value
//!
//! Entrypoints:
//! - [`PipelineConfig::builtin`] for the embedded defaults
//! - [`PipelineConfig::from_toml_str`] / [`PipelineConfig::from_path`] for overrides

use crate::classification::MuscleGroupRef;
use crate::error::ComputeError;
use crate::mental::definitions::{ExceptionalDay, ScoreDefinition};
use crate::mental::score::ScoringEngine;
use crate::reconcile::FillPolicy;
use crate::types::DateRange;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Embedded default configuration
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/defaults.toml");

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub weight: WeightConfig,
    pub strength: StrengthConfig,
    pub workouts: WorkoutConfig,
    pub mental_health: MentalHealthConfig,
    pub classification: ClassificationConfig,
}

/// Input and output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub health_records: String,
    pub workouts: String,
    pub strength_log: String,
    pub mood_log: String,
    pub custom_entries: String,
    pub custom_symptoms: String,
    /// Classifier output; skipped when absent or the file does not exist
    pub exercise_muscle_groups: Option<String>,
}

impl PathsConfig {
    pub fn input(&self, file: &str) -> PathBuf {
        self.input_dir.join(file)
    }
}

/// Body-mass series settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightConfig {
    /// Health record type holding body mass
    pub record_type: String,
    /// Multiplier from the export unit to pounds
    pub kg_to_lb: f64,
    /// Gap-fill policy for days without a weigh-in
    pub fill: FillPolicy,
}

/// Strength metric settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrengthConfig {
    /// Exercises whose load is the lifter's body mass
    pub unweighted_exercises: Vec<String>,
    /// Substring marking barbell variants
    pub barbell_marker: String,
    /// Load added to barbell variants for the bar itself (lb)
    pub bar_weight: f64,
    pub rolling_window_days: u32,
}

/// Cardio workout extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkoutConfig {
    pub activities: Vec<String>,
}

/// Mental health scoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MentalHealthConfig {
    pub full_cutoff: f64,
    pub partial_cutoff: f64,
    /// Value assumed for a factor on days after it was first logged
    pub neutral_fill_value: f64,
    pub interaction_exponent: f64,
    /// Fixed-log factors whose placeholder value is 0 (all other factors use 1)
    pub zero_baseline_factors: Vec<String>,
    pub excluded_ranges: Vec<DateRange>,
    pub exceptional_days: Vec<ExceptionalDay>,
    pub categories: Vec<ScoreDefinition>,
}

/// Exercise classification reference data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassificationConfig {
    pub muscle_groups: Vec<MuscleGroupRef>,
}

impl PipelineConfig {
    /// The embedded defaults
    pub fn builtin() -> Result<Self, ComputeError> {
        let config: PipelineConfig = toml::from_str(DEFAULT_CONFIG_TOML)?;
        Ok(config)
    }

    /// Parse a user config and merge it over the defaults
    pub fn from_toml_str(overrides: &str) -> Result<Self, ComputeError> {
        let mut base: toml::Table = toml::from_str(DEFAULT_CONFIG_TOML)?;
        let overlay: toml::Table = toml::from_str(overrides)?;
        merge_tables(&mut base, overlay);
        let config: PipelineConfig = toml::Value::Table(base).try_into()?;
        Ok(config)
    }

    /// Load a user config file and merge it over the defaults
    pub fn from_path(path: &Path) -> Result<Self, ComputeError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check every setting that would otherwise surface mid-run
    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(self.weight.kg_to_lb.is_finite() && self.weight.kg_to_lb > 0.0) {
            return Err(ComputeError::Config(format!(
                "weight.kg_to_lb must be positive, got {}",
                self.weight.kg_to_lb
            )));
        }
        if self.strength.rolling_window_days == 0 {
            return Err(ComputeError::Config(
                "strength.rolling_window_days must be at least 1".to_string(),
            ));
        }
        if !self.strength.bar_weight.is_finite() {
            return Err(ComputeError::Config(
                "strength.bar_weight must be finite".to_string(),
            ));
        }
        for range in &self.mental_health.excluded_ranges {
            if range.end < range.start {
                return Err(ComputeError::Config(format!(
                    "excluded range {} .. {} ends before it starts",
                    range.start, range.end
                )));
            }
        }
        ScoringEngine::new(&self.mental_health)?;
        Ok(())
    }

    /// Render the effective configuration
    pub fn to_toml_string(&self) -> Result<String, ComputeError> {
        toml::to_string_pretty(self).map_err(|e| ComputeError::Config(e.to_string()))
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mental::definitions::Transform;

    #[test]
    fn test_builtin_config_parses() {
        let config = PipelineConfig::builtin().unwrap();
        assert_eq!(config.strength.bar_weight, 44.0);
        assert_eq!(config.strength.rolling_window_days, 90);
        assert_eq!(config.strength.unweighted_exercises.len(), 15);
        assert_eq!(config.weight.fill, FillPolicy::Interpolate);
        assert_eq!(config.mental_health.excluded_ranges.len(), 2);
        assert_eq!(config.mental_health.exceptional_days.len(), 89);
        assert_eq!(config.classification.muscle_groups.len(), 20);

        let names: Vec<_> = config
            .mental_health
            .categories
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "mental_health",
                "subjective_well_being",
                "life_satisfaction",
                "work_satisfaction"
            ]
        );
        assert!(!config.mental_health.categories[0].rescale);
        assert_eq!(
            config.mental_health.categories[0].factors[0].transform,
            Transform::Power(2.8675)
        );
    }

    #[test]
    fn test_builtin_config_is_valid() {
        let config = PipelineConfig::builtin().unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_override_merges_over_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [paths]
            output_dir = "/tmp/dashboard"

            [strength]
            bar_weight = 45.0
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.output_dir, PathBuf::from("/tmp/dashboard"));
        assert_eq!(config.paths.input_dir, PathBuf::from("./raw"));
        assert_eq!(config.strength.bar_weight, 45.0);
        assert_eq!(config.strength.barbell_marker, "(Barbell)");
    }

    #[test]
    fn test_override_arrays_replace() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [workouts]
            activities = ["Soccer"]
            "#,
        )
        .unwrap();
        assert_eq!(config.workouts.activities, vec!["Soccer".to_string()]);
    }

    #[test]
    fn test_zero_weight_fails_validation() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [[mental_health.categories]]
            name = "broken"
            rescale = true
            factors = [
                { name = "energy", min = 1.0, max = 4.0, weight = 0.0, transform = "identity" },
            ]
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ComputeError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = PipelineConfig::from_toml_str(
            r#"
            [strength]
            bar_wieght = 45.0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_round_trip_rendering() {
        let config = PipelineConfig::builtin().unwrap();
        let rendered = config.to_toml_string().unwrap();
        let reparsed = PipelineConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed.mental_health.categories.len(), 4);
        assert_eq!(reparsed.strength.unweighted_exercises.len(), 15);
    }
}
