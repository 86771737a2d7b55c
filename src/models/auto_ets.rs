//! Automatic exponential smoothing.
//!
//! Searches a small grid over level-only (SES) and level-plus-trend (Holt)
//! configurations and keeps the one with the lowest penalized one-step
//! in-sample error. Deliberately robust: it fits on any non-empty history,
//! which is why it doubles as the short-history and error fallback baseline.

use crate::core::{DemandSeries, Forecast};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;

const ALPHA_GRID: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];
const BETA_GRID: [f64; 3] = [0.05, 0.1, 0.2];

#[derive(Debug, Clone, Copy)]
struct FittedState {
    level: f64,
    trend: f64,
}

/// Automatic exponential smoothing model.
#[derive(Debug, Clone, Default)]
pub struct AutoEts {
    state: Option<FittedState>,
}

impl AutoEts {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-step SSE and final state for an SES pass.
    fn run_ses(values: &[f64], alpha: f64) -> (f64, FittedState) {
        let mut level = values[0];
        let mut sse = 0.0;
        for &y in &values[1..] {
            let err = y - level;
            sse += err * err;
            level = alpha * y + (1.0 - alpha) * level;
        }
        (sse, FittedState { level, trend: 0.0 })
    }

    /// One-step SSE and final state for an additive Holt pass.
    fn run_holt(values: &[f64], alpha: f64, beta: f64) -> (f64, FittedState) {
        let mut level = values[0];
        let mut trend = values[1] - values[0];
        let mut sse = 0.0;
        for &y in &values[1..] {
            let forecast = level + trend;
            let err = y - forecast;
            sse += err * err;
            let prev_level = level;
            level = alpha * y + (1.0 - alpha) * forecast;
            trend = beta * (level - prev_level) + (1.0 - beta) * trend;
        }
        (sse, FittedState { level, trend })
    }
}

impl Forecaster for AutoEts {
    fn fit(&mut self, series: &DemandSeries) -> Result<()> {
        let values = series.values();
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if values.len() == 1 {
            self.state = Some(FittedState {
                level: values[0],
                trend: 0.0,
            });
            return Ok(());
        }

        // AIC-style selection: penalize the trended variant for its extra
        // parameter so it only wins when the trend genuinely helps.
        let n = (values.len() - 1) as f64;
        let score = |sse: f64, params: f64| {
            let avg = (sse / n).max(f64::MIN_POSITIVE);
            n * avg.ln() + 2.0 * params
        };

        let mut best_score = f64::INFINITY;
        let mut best_state = None;
        for &alpha in &ALPHA_GRID {
            let (sse, state) = Self::run_ses(values, alpha);
            let s = score(sse, 1.0);
            if s < best_score {
                best_score = s;
                best_state = Some(state);
            }
        }
        if values.len() >= 4 {
            for &alpha in &ALPHA_GRID {
                for &beta in &BETA_GRID {
                    let (sse, state) = Self::run_holt(values, alpha, beta);
                    let s = score(sse, 2.0);
                    if s < best_score {
                        best_score = s;
                        best_state = Some(state);
                    }
                }
            }
        }

        let state = best_state.ok_or_else(|| {
            ForecastError::Computation("exponential smoothing grid produced no fit".to_string())
        })?;
        if !state.level.is_finite() || !state.trend.is_finite() {
            return Err(ForecastError::Computation(
                "non-finite smoothing state".to_string(),
            ));
        }
        self.state = Some(state);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let state = self.state.ok_or(ForecastError::FitRequired)?;
        let values = (1..=horizon)
            .map(|h| state.level + state.trend * h as f64)
            .collect();
        Ok(Forecast::from_values(values))
    }

    fn name(&self) -> &str {
        "AutoETS"
    }
}
