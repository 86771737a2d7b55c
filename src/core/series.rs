//! Demand series: one forecastable quantity on the shared calendar.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A single zero-padded demand series identified by its `unique_id`.
///
/// Timestamps are bucket anchors on the shared master calendar, strictly
/// increasing; values are non-negative unit counts (zero for padded periods).
/// The dimension map carries the static attributes the series was grouped by.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandSeries {
    unique_id: String,
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    dimensions: BTreeMap<String, String>,
}

impl DemandSeries {
    pub fn new(
        unique_id: String,
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<f64>,
        dimensions: BTreeMap<String, String>,
    ) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "series {unique_id}: {} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        for pair in timestamps.windows(2) {
            if pair[1] <= pair[0] {
                return Err(ForecastError::Timestamp(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }
        Ok(Self {
            unique_id,
            timestamps,
            values,
            dimensions,
        })
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn dimensions(&self) -> &BTreeMap<String, String> {
        &self.dimensions
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Sub-series over `[start, end)`, keeping identity and dimensions.
    pub fn slice(&self, start: usize, end: usize) -> Result<DemandSeries> {
        if start > end || end > self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "invalid slice {start}..{end} of series with {} points",
                self.len()
            )));
        }
        Ok(DemandSeries {
            unique_id: self.unique_id.clone(),
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            dimensions: self.dimensions.clone(),
        })
    }
}
