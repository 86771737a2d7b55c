//! Automatic autoregression on differenced data.
//!
//! Fits AR(p) for p in 1..=3 on first differences via ordinary least squares
//! and keeps the order with the best AIC. Forecasts are produced recursively
//! on the differenced scale and integrated back to levels.

use crate::core::{DemandSeries, Forecast};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::utils::stats::mean;

const MAX_ORDER: usize = 3;

/// Automatic AR model over first differences.
#[derive(Debug, Clone, Default)]
pub struct AutoAr {
    fitted: Option<FittedAr>,
}

#[derive(Debug, Clone)]
struct FittedAr {
    intercept: f64,
    /// Coefficients for lags 1..=p of the differenced series.
    coefficients: Vec<f64>,
    /// Most recent differences, newest last.
    recent_diffs: Vec<f64>,
    last_level: f64,
}

impl AutoAr {
    pub fn new() -> Self {
        Self::default()
    }

    /// OLS fit of AR(p) on `diffs`; `None` when the normal equations are
    /// singular or too few rows remain.
    fn fit_order(diffs: &[f64], p: usize) -> Option<(f64, Vec<f64>, f64)> {
        let n = diffs.len();
        if n < p + 2 {
            return None;
        }
        let rows = n - p;
        let dim = p + 1;

        // Normal equations X'X beta = X'y with an intercept column.
        let mut xtx = vec![vec![0.0; dim]; dim];
        let mut xty = vec![0.0; dim];
        for t in p..n {
            let y = diffs[t];
            let mut x = Vec::with_capacity(dim);
            x.push(1.0);
            for lag in 1..=p {
                x.push(diffs[t - lag]);
            }
            for i in 0..dim {
                xty[i] += x[i] * y;
                for j in 0..dim {
                    xtx[i][j] += x[i] * x[j];
                }
            }
        }

        let beta = solve_linear(&mut xtx, &mut xty)?;

        let mut sse = 0.0;
        for t in p..n {
            let mut pred = beta[0];
            for lag in 1..=p {
                pred += beta[lag] * diffs[t - lag];
            }
            let err = diffs[t] - pred;
            sse += err * err;
        }
        let avg = (sse / rows as f64).max(f64::MIN_POSITIVE);
        let aic = rows as f64 * avg.ln() + 2.0 * dim as f64;
        Some((beta[0], beta[1..].to_vec(), aic))
    }
}

/// Gaussian elimination with partial pivoting; `None` for singular systems.
fn solve_linear(a: &mut [Vec<f64>], b: &mut [f64]) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in row + 1..n {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

impl Forecaster for AutoAr {
    fn fit(&mut self, series: &DemandSeries) -> Result<()> {
        let values = series.values();
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if values.len() < 5 {
            return Err(ForecastError::InsufficientData {
                needed: 5,
                got: values.len(),
            });
        }

        let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

        let mut best: Option<(f64, f64, Vec<f64>)> = None;
        for p in 1..=MAX_ORDER {
            if let Some((intercept, coefficients, aic)) = Self::fit_order(&diffs, p) {
                if best.as_ref().map_or(true, |(best_aic, _, _)| aic < *best_aic) {
                    best = Some((aic, intercept, coefficients));
                }
            }
        }

        let (_, intercept, coefficients) = match best {
            Some(found) => found,
            // Singular systems happen on flat or near-flat differences; fall
            // back to the mean difference as drift.
            None => (0.0, mean(&diffs), Vec::new()),
        };

        let keep = coefficients.len().max(1);
        let recent_diffs = diffs[diffs.len().saturating_sub(keep)..].to_vec();

        self.fitted = Some(FittedAr {
            intercept,
            coefficients,
            recent_diffs,
            last_level: *values.last().unwrap_or(&0.0),
        });
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let fitted = self.fitted.as_ref().ok_or(ForecastError::FitRequired)?;
        let p = fitted.coefficients.len();
        let mut history = fitted.recent_diffs.clone();
        let mut level = fitted.last_level;
        let mut values = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let mut diff = fitted.intercept;
            for (lag, coef) in fitted.coefficients.iter().enumerate() {
                if let Some(&d) = history.get(history.len().wrapping_sub(lag + 1)) {
                    diff += coef * d;
                }
            }
            level += diff;
            values.push(level);
            if p > 0 {
                history.push(diff);
            }
        }
        Ok(Forecast::from_values(values))
    }

    fn name(&self) -> &str {
        "AutoAR"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::test_support::series_from_values;
    use approx::assert_relative_eq;

    #[test]
    fn ar_linear_trend_continues() {
        // Constant differences of 3: the drift fallback or AR fit must both
        // continue the line exactly.
        let values: Vec<f64> = (0..20).map(|i| 10.0 + 3.0 * i as f64).collect();
        let series = series_from_values("line", values);
        let mut model = AutoAr::new();
        model.fit(&series).unwrap();

        let forecast = model.predict(3).unwrap();
        assert_relative_eq!(forecast.values()[0], 70.0, epsilon = 1e-6);
        assert_relative_eq!(forecast.values()[2], 76.0, epsilon = 1e-6);
    }

    #[test]
    fn ar_constant_series_stays_constant() {
        let series = series_from_values("flat", vec![8.0; 16]);
        let mut model = AutoAr::new();
        model.fit(&series).unwrap();
        for &v in model.predict(4).unwrap().values() {
            assert_relative_eq!(v, 8.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn ar_requires_minimum_history() {
        let series = series_from_values("tiny", vec![1.0, 2.0, 3.0, 4.0]);
        let mut model = AutoAr::new();
        assert!(matches!(
            model.fit(&series),
            Err(ForecastError::InsufficientData { needed: 5, got: 4 })
        ));
    }

    #[test]
    fn solve_linear_rejects_singular_system() {
        let mut a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        let mut b = vec![1.0, 2.0];
        assert!(solve_linear(&mut a, &mut b).is_none());
    }

    #[test]
    fn solve_linear_small_system() {
        let mut a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let mut b = vec![5.0, 10.0];
        let x = solve_linear(&mut a, &mut b).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-9);
    }
}
