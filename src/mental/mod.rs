//! Mental health scoring module
//!
//! Turns the mood tracker's fixed daily log and long-format custom symptom log
//! into daily category scores.
//!
//! Pipeline: Fixed + custom logs → Merge → Clean → Annotate → Score → Tidy rows

pub mod annotate;
pub mod clean;
pub mod definitions;
pub mod merge;
pub mod pipeline;
pub mod score;
pub mod tidy;

pub use definitions::{ExceptionalDay, FactorSpec, ScoreDefinition, Transform};
pub use pipeline::{MentalHealthProcessor, MoodInputs};
pub use score::{DailyScores, ScoringEngine};
