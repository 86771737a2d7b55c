//! Croston's method with the Syntetos-Boyle approximation (SBA).
//!
//! Intermittent demand is modeled as two smoothed processes: the non-zero
//! demand sizes and the intervals between them. The SBA correction scales the
//! ratio by (1 - alpha/2) to remove Croston's positive bias. The forecast is
//! a flat demand rate.

use crate::core::{DemandSeries, Forecast};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;

const ALPHA: f64 = 0.1;

/// Croston SBA model for intermittent demand.
#[derive(Debug, Clone, Default)]
pub struct CrostonSba {
    rate: Option<f64>,
}

impl CrostonSba {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Forecaster for CrostonSba {
    fn fit(&mut self, series: &DemandSeries) -> Result<()> {
        let values = series.values();
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        // Demand sizes and inter-demand intervals.
        let mut sizes = Vec::new();
        let mut intervals = Vec::new();
        let mut since_last = 0usize;
        for &y in values {
            since_last += 1;
            if y > 0.0 {
                sizes.push(y);
                intervals.push(since_last as f64);
                since_last = 0;
            }
        }

        if sizes.len() < 2 {
            return Err(ForecastError::Computation(format!(
                "croston needs at least 2 demand occurrences, got {}",
                sizes.len()
            )));
        }

        let mut size_level = sizes[0];
        let mut interval_level = intervals[0];
        for (&z, &q) in sizes[1..].iter().zip(intervals[1..].iter()) {
            size_level = ALPHA * z + (1.0 - ALPHA) * size_level;
            interval_level = ALPHA * q + (1.0 - ALPHA) * interval_level;
        }

        if interval_level <= 0.0 || !size_level.is_finite() || !interval_level.is_finite() {
            return Err(ForecastError::Computation(
                "degenerate croston smoothing state".to_string(),
            ));
        }

        self.rate = Some((1.0 - ALPHA / 2.0) * size_level / interval_level);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let rate = self.rate.ok_or(ForecastError::FitRequired)?;
        Ok(Forecast::from_values(vec![rate; horizon]))
    }

    fn name(&self) -> &str {
        "CrostonSBA"
    }
}
