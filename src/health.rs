//! Apple Health quantity records
//!
//! Cleans the health-records export and derives the daily body-mass series
//! used as the load of bodyweight exercises.

use crate::config::WeightConfig;
use crate::error::ComputeError;
use crate::ingest::{parse_date, parse_number, RawTable};
use crate::reconcile::{Aggregation, Reconciler};
use crate::types::{DailySeries, HealthRecord, Observation, WeightRow};
use chrono::NaiveDate;
use tracing::{debug, info};

/// Prefix Apple puts on every quantity type
pub const QUANTITY_TYPE_PREFIX: &str = "HKQuantityTypeIdentifier";

pub const BODY_MASS_SERIES: &str = "body_mass";

/// Device name from a descriptor such as
/// `<<HKDevice: 0x...>, name:iPhone, manufacturer:Apple Inc., ...>`
pub fn extract_device_name(descriptor: &str) -> Option<String> {
    let start = descriptor.find("name:")? + "name:".len();
    let rest = &descriptor[start..];
    let end = rest.find(',')?;
    Some(rest[..end].to_string())
}

/// Clean every row of the health-records table
///
/// Rows without an end date are skipped; a malformed end date is an error.
pub fn clean_health_records(table: &RawTable) -> Result<Vec<HealthRecord>, ComputeError> {
    let type_col = table.require_column("type")?;
    let value_col = table.require_column("value")?;
    let end_col = table.require_column("enddate")?;
    let device_col = table.column_index("device");

    let mut records = Vec::with_capacity(table.len());
    let mut undated = 0usize;
    for row in 0..table.len() {
        let end = table.cell(row, end_col);
        if end.trim().is_empty() {
            undated += 1;
            continue;
        }
        records.push(HealthRecord {
            record_type: table.cell(row, type_col).replace(QUANTITY_TYPE_PREFIX, ""),
            value: parse_number(table.cell(row, value_col)),
            date: parse_date(end)?,
            device: device_col.and_then(|c| extract_device_name(table.cell(row, c))),
        });
    }
    if undated > 0 {
        debug!(rows = undated, "health records without an end date skipped");
    }
    Ok(records)
}

/// Daily body mass in pounds from the first weigh-in through `today`
///
/// Days with several weigh-ins keep the lowest; gaps follow the configured
/// fill policy. Fails with [`ComputeError::EmptyInput`] when there is no
/// body-mass record.
pub fn body_mass_series(
    records: &[HealthRecord],
    config: &WeightConfig,
    today: NaiveDate,
) -> Result<DailySeries, ComputeError> {
    let observations: Vec<Observation> = records
        .iter()
        .filter(|r| r.record_type == config.record_type)
        .map(|r| Observation::new(r.date, BODY_MASS_SERIES, r.value))
        .collect();

    let factor = config.kg_to_lb;
    let series = Reconciler::through(today, Aggregation::Min)
        .reconcile(BODY_MASS_SERIES, &observations)?
        .filled(config.fill)
        .map_values(|kg| kg * factor);

    info!(
        series = series.name(),
        weigh_ins = observations.len(),
        days = series.len(),
        "body mass series built"
    );
    Ok(series)
}

/// `weight_data` output rows
pub fn weight_rows(series: &DailySeries) -> Vec<WeightRow> {
    series
        .points()
        .iter()
        .map(|p| WeightRow {
            date: p.date,
            body_mass: p.value,
        })
        .collect()
}
