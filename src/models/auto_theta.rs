//! Theta method with automatic smoothing selection.
//!
//! Standard two-theta-line decomposition with theta = 2: the long-run drift
//! comes from a linear fit over the history and the short-run level from
//! simple exponential smoothing of the theta line, with alpha chosen by
//! in-sample one-step error.

use crate::core::{DemandSeries, Forecast};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::utils::stats::linear_fit;

const THETA: f64 = 2.0;
const ALPHA_GRID: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];

/// Automatic theta model.
#[derive(Debug, Clone, Default)]
pub struct AutoTheta {
    fitted: Option<FittedTheta>,
}

#[derive(Debug, Clone, Copy)]
struct FittedTheta {
    level: f64,
    slope: f64,
    alpha: f64,
}

impl AutoTheta {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Forecaster for AutoTheta {
    fn fit(&mut self, series: &DemandSeries) -> Result<()> {
        let values = series.values();
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if values.len() < 3 {
            return Err(ForecastError::InsufficientData {
                needed: 3,
                got: values.len(),
            });
        }

        let (intercept, slope) = linear_fit(values);
        if !intercept.is_finite() || !slope.is_finite() {
            return Err(ForecastError::Computation(
                "degenerate linear fit".to_string(),
            ));
        }

        // Theta line: amplify curvature around the linear trend by theta.
        let theta_line: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(i, &y)| {
                let trend = intercept + slope * i as f64;
                trend + THETA * (y - trend)
            })
            .collect();

        // SES over the theta line, alpha picked by one-step SSE.
        let mut best = (f64::INFINITY, ALPHA_GRID[0], theta_line[0]);
        for &alpha in &ALPHA_GRID {
            let mut level = theta_line[0];
            let mut sse = 0.0;
            for &y in &theta_line[1..] {
                let err = y - level;
                sse += err * err;
                level = alpha * y + (1.0 - alpha) * level;
            }
            if sse < best.0 {
                best = (sse, alpha, level);
            }
        }

        self.fitted = Some(FittedTheta {
            level: best.2,
            slope,
            alpha: best.1,
        });
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let fitted = self.fitted.ok_or(ForecastError::FitRequired)?;
        // Average of the two theta lines: SES level plus the damped drift term
        // (1 - 1/theta) * b * (1/alpha + h - 1).
        let drift_scale = 1.0 - 1.0 / THETA;
        let values = (1..=horizon)
            .map(|h| {
                fitted.level
                    + drift_scale * fitted.slope * (1.0 / fitted.alpha + (h as f64 - 1.0))
            })
            .collect();
        Ok(Forecast::from_values(values))
    }

    fn name(&self) -> &str {
        "AutoTheta"
    }
}
