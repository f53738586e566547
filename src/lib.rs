//! Vitals Flux - Batch compute engine for personal health dashboards
//!
//! Flux turns raw exports (Apple Health records and workouts, a strength
//! training log, a mood tracker's fixed and custom logs) into tidy daily tables
//! through a deterministic pipeline: ingestion → date reconciliation → strength
//! metrics → volume aggregation → mental health scoring → CSV output.
//!
//! ## Modules
//!
//! - **Reconciler**: sparse observations → contiguous daily series with fill policies
//! - **Strength**: per-set one-rep max, cumulative max and rolling 90-day max
//! - **Volume**: daily summed one-rep max with zero-filled rest days
//! - **Mental Module**: mood log merge, cleaning, annotation and category scoring

pub mod classification;
pub mod config;
pub mod error;
pub mod health;
pub mod ingest;
pub mod mental;
pub mod pipeline;
pub mod reconcile;
pub mod sink;
pub mod strength;
pub mod types;
pub mod volume;
pub mod workouts;

pub use config::PipelineConfig;
pub use error::ComputeError;
pub use pipeline::{run_pipeline, HealthPipeline, PipelineInputs, PipelineOutputs};
pub use reconcile::{Aggregation, FillPolicy, Reconciler};
pub use sink::{CsvDirSink, MemorySink, TableSink};
pub use strength::StrengthEngine;
pub use volume::VolumeAggregator;

// Mental health exports
pub use mental::{MentalHealthProcessor, ScoreDefinition, ScoringEngine};

/// Flux version
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "vitals-flux";
