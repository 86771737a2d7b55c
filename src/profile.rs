//! Per-series statistical profiling.
//!
//! The profile is the "personality" of a series: volume, variability, and how
//! much of its variance is explained by trend and seasonality. Candidate
//! selection reads nothing else. Profiles are recomputed every run from the
//! current history and never persisted.

use crate::core::DemandSeries;
use crate::utils::stats::{mean, population_variance, sample_variance};

/// Demand-classification cutoff on CV²: strictly above is intermittent.
pub const INTERMITTENCY_THRESHOLD: f64 = 1.3;

/// Statistical descriptors for one series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesProfile {
    pub unique_id: String,
    pub total_demand: f64,
    /// Number of periods of zero-padded history.
    pub history_length: usize,
    /// Sample variance over squared mean; 0 when the mean is 0.
    pub cv_squared: f64,
    pub is_intermittent: bool,
    /// Share of variance explained by the trend component, in [0, 1].
    pub trend_strength: f64,
    /// Share of variance explained by the seasonal component, in [0, 1].
    pub seasonality_strength: f64,
}

/// Strict-greater intermittency test, kept separate so the boundary is
/// testable in isolation.
pub fn is_intermittent(cv_squared: f64) -> bool {
    cv_squared > INTERMITTENCY_THRESHOLD
}

/// Compute the profile for one zero-padded series.
///
/// Trend and seasonality strengths require at least two full seasonal cycles;
/// below that, or when decomposition produces non-finite values, both default
/// to 0 (insufficient signal, never an error).
pub fn profile_series(series: &DemandSeries, seasonal_period: usize) -> SeriesProfile {
    let values = series.values();
    let total_demand: f64 = values.iter().sum();
    let history_length = values.len();

    let mean_demand = if values.is_empty() { 0.0 } else { mean(values) };
    let cv_squared = if mean_demand > 0.0 {
        sample_variance(values) / (mean_demand * mean_demand)
    } else {
        0.0
    };

    let (trend_strength, seasonality_strength) =
        if seasonal_period >= 2 && history_length >= 2 * seasonal_period {
            match decompose_additive(values, seasonal_period) {
                Some(parts) => (parts.trend_strength(), parts.seasonal_strength()),
                None => (0.0, 0.0),
            }
        } else {
            (0.0, 0.0)
        };

    SeriesProfile {
        unique_id: series.unique_id().to_string(),
        total_demand,
        history_length,
        cv_squared,
        is_intermittent: is_intermittent(cv_squared),
        trend_strength,
        seasonality_strength,
    }
}

/// Classical additive decomposition: y = trend + seasonal + residual.
///
/// Trend is a centered moving average (the 2xm variant for even periods);
/// seasonal indices are period-position means of the detrended series,
/// centered to sum to zero. Edge positions where the moving average is
/// undefined carry NaN and are skipped by the strength computations.
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
}

impl Decomposition {
    /// `max(0, 1 - Var(resid) / Var(resid + component))`, clamped because the
    /// ratio can exceed 1 on pathological series; zero-variance denominators
    /// and non-finite inputs also yield 0.
    fn strength(&self, component: &[f64]) -> f64 {
        let mut resid = Vec::new();
        let mut combined = Vec::new();
        for (r, c) in self.residual.iter().zip(component.iter()) {
            if r.is_finite() && c.is_finite() {
                resid.push(*r);
                combined.push(*r + *c);
            }
        }
        if resid.is_empty() {
            return 0.0;
        }
        let var_resid = population_variance(&resid);
        let var_combined = population_variance(&combined);
        if !var_resid.is_finite() || !var_combined.is_finite() || var_combined <= 0.0 {
            return 0.0;
        }
        (1.0 - var_resid / var_combined).max(0.0)
    }

    pub fn trend_strength(&self) -> f64 {
        self.strength(&self.trend)
    }

    pub fn seasonal_strength(&self) -> f64 {
        self.strength(&self.seasonal)
    }
}

/// Decompose a series; `None` when the input is too short or degenerate.
pub fn decompose_additive(values: &[f64], period: usize) -> Option<Decomposition> {
    let n = values.len();
    if period < 2 || n < 2 * period {
        return None;
    }
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let trend = centered_moving_average(values, period);

    // Seasonal indices: mean detrended value per period position.
    let mut position_sums = vec![0.0; period];
    let mut position_counts = vec![0usize; period];
    for i in 0..n {
        if trend[i].is_finite() {
            position_sums[i % period] += values[i] - trend[i];
            position_counts[i % period] += 1;
        }
    }
    let mut indices = vec![0.0; period];
    for p in 0..period {
        if position_counts[p] == 0 {
            return None;
        }
        indices[p] = position_sums[p] / position_counts[p] as f64;
    }
    // Center so the seasonal component carries no level.
    let index_mean = mean(&indices);
    for idx in &mut indices {
        *idx -= index_mean;
    }

    let seasonal: Vec<f64> = (0..n).map(|i| indices[i % period]).collect();
    let residual: Vec<f64> = (0..n)
        .map(|i| {
            if trend[i].is_finite() {
                values[i] - trend[i] - seasonal[i]
            } else {
                f64::NAN
            }
        })
        .collect();

    Some(Decomposition {
        trend,
        seasonal,
        residual,
    })
}

/// Centered moving average of window `period`; for even periods the ends of
/// the window get half weight (2xm moving average). NaN where undefined.
fn centered_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut trend = vec![f64::NAN; n];
    let half = period / 2;

    if period % 2 == 1 {
        for i in half..n.saturating_sub(half) {
            let window = &values[i - half..=i + half];
            trend[i] = window.iter().sum::<f64>() / period as f64;
        }
    } else {
        for i in half..n.saturating_sub(half) {
            let lo = i - half;
            let hi = i + half;
            let mut sum = 0.5 * values[lo] + 0.5 * values[hi];
            sum += values[lo + 1..hi].iter().sum::<f64>();
            trend[i] = sum / period as f64;
        }
    }
    trend
}
