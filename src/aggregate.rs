//! Aggregation of raw transaction records into zero-padded demand series.
//!
//! Raw event rows are group-summed by series key and calendar bucket, then
//! padded onto one master grid spanning the global date range so that every
//! series has identical length and alignment. Downstream profiling and
//! cross-validation rely on that shape.

use crate::config::PipelineConfig;
use crate::core::calendar::{align_to_period, date_range};
use crate::core::DemandSeries;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// One raw transaction-level input row.
///
/// `dimensions` maps column name to value (e.g. `company -> "acme"`);
/// `quantity` defaults to one unit per record when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub timestamp: DateTime<Utc>,
    pub dimensions: BTreeMap<String, String>,
    pub quantity: Option<f64>,
}

impl RawRecord {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            dimensions: BTreeMap::new(),
            quantity: None,
        }
    }

    pub fn with_dimension(mut self, column: &str, value: &str) -> Self {
        self.dimensions.insert(column.to_string(), value.to_string());
        self
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

/// Build the series key from grouping-column values, joined with `_`.
/// Identical dimension tuples always produce the identical key.
fn series_key(record: &RawRecord, grouping: &[&str]) -> String {
    grouping
        .iter()
        .map(|col| record.dimensions.get(*col).map(String::as_str).unwrap_or(""))
        .collect::<Vec<_>>()
        .join("_")
}

/// Validate that every grouping column exists on every record.
/// Returns the precise sorted list of missing columns on failure.
fn check_schema(records: &[RawRecord], grouping: &[&str]) -> Result<()> {
    let mut missing: BTreeSet<&str> = BTreeSet::new();
    for record in records {
        for col in grouping {
            if !record.dimensions.contains_key(*col) {
                missing.insert(col);
            }
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ForecastError::Schema {
            missing: missing.into_iter().map(str::to_string).collect(),
        })
    }
}

/// Aggregate raw records into one zero-padded [`DemandSeries`] per series key.
///
/// The output is deterministic: series are sorted by `unique_id` and every
/// series spans the same calendar, so identical input yields identical output.
pub fn aggregate(records: &[RawRecord], config: &PipelineConfig) -> Result<Vec<DemandSeries>> {
    if records.is_empty() {
        return Err(ForecastError::EmptyData);
    }

    let grouping = config.aggregation_level.grouping_columns();
    check_schema(records, grouping)?;

    // Drop records after the configured cutoff before bucketing.
    let records: Vec<&RawRecord> = match config.history_cutoff {
        Some(cutoff) => records.iter().filter(|r| r.timestamp <= cutoff).collect(),
        None => records.iter().collect(),
    };
    if records.is_empty() {
        return Err(ForecastError::EmptyData);
    }

    // Group-sum by (series key, bucket anchor).
    let mut sums: BTreeMap<String, BTreeMap<DateTime<Utc>, f64>> = BTreeMap::new();
    let mut dimensions: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for record in records {
        let key = series_key(record, grouping);
        let bucket = align_to_period(record.timestamp, config.granularity);
        let quantity = record.quantity.unwrap_or(1.0);
        *sums.entry(key.clone()).or_default().entry(bucket).or_insert(0.0) += quantity;

        dimensions.entry(key).or_insert_with(|| {
            grouping
                .iter()
                .filter_map(|col| {
                    record
                        .dimensions
                        .get(*col)
                        .map(|v| (col.to_string(), v.clone()))
                })
                .collect()
        });
    }

    // Shared master calendar over the global min/max bucket.
    let global_min = sums
        .values()
        .filter_map(|buckets| buckets.keys().next())
        .min()
        .copied()
        .ok_or(ForecastError::EmptyData)?;
    let global_max = sums
        .values()
        .filter_map(|buckets| buckets.keys().next_back())
        .max()
        .copied()
        .ok_or(ForecastError::EmptyData)?;
    let calendar = date_range(global_min, global_max, config.granularity)?;

    // Zero-pad every series onto the shared calendar.
    let mut series = Vec::with_capacity(sums.len());
    for (unique_id, buckets) in sums {
        let values: Vec<f64> = calendar
            .iter()
            .map(|ts| buckets.get(ts).copied().unwrap_or(0.0))
            .collect();
        let dims = dimensions.remove(&unique_id).unwrap_or_default();
        series.push(DemandSeries::new(unique_id, calendar.clone(), values, dims)?);
    }
    Ok(series)
}
