//! Gradient-boosted regression stumps over lagged differences.
//!
//! A small deterministic gradient boosting machine: the series is first
//! differenced, lag features are built, and depth-one regression trees are
//! fitted to the residuals round by round. Multi-step forecasts feed
//! predictions back in as lags and are integrated to levels at the end.

use crate::core::{DemandSeries, Forecast};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::utils::stats::mean;

const LAGS: [usize; 3] = [1, 2, 3];
const ROUNDS: usize = 50;
const LEARNING_RATE: f64 = 0.1;
/// A split must leave at least this many rows on each side.
const MIN_LEAF: usize = 2;

#[derive(Debug, Clone, Copy)]
struct Stump {
    feature: usize,
    threshold: f64,
    left_value: f64,
    right_value: f64,
}

impl Stump {
    fn predict(&self, row: &[f64]) -> f64 {
        if row[self.feature] <= self.threshold {
            self.left_value
        } else {
            self.right_value
        }
    }
}

/// Boosted-stump model.
#[derive(Debug, Clone, Default)]
pub struct GradientBoost {
    fitted: Option<FittedBoost>,
}

#[derive(Debug, Clone)]
struct FittedBoost {
    base: f64,
    stumps: Vec<Stump>,
    /// Most recent differences, newest last, at least `max(LAGS)` of them.
    recent_diffs: Vec<f64>,
    last_level: f64,
}

impl GradientBoost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Best SSE-reducing stump for the current residuals, if any valid split
    /// exists.
    fn fit_stump(rows: &[Vec<f64>], residuals: &[f64]) -> Option<Stump> {
        let n_features = LAGS.len();
        let mut best: Option<(f64, Stump)> = None;

        for feature in 0..n_features {
            let mut order: Vec<usize> = (0..rows.len()).collect();
            order.sort_by(|&i, &j| {
                rows[i][feature]
                    .partial_cmp(&rows[j][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            for split in MIN_LEAF..=rows.len().saturating_sub(MIN_LEAF) {
                let lo = rows[order[split - 1]][feature];
                let hi = rows[order[split]][feature];
                if lo == hi {
                    continue;
                }
                let threshold = 0.5 * (lo + hi);

                let (mut left_sum, mut right_sum) = (0.0, 0.0);
                for (rank, &idx) in order.iter().enumerate() {
                    if rank < split {
                        left_sum += residuals[idx];
                    } else {
                        right_sum += residuals[idx];
                    }
                }
                let left_value = left_sum / split as f64;
                let right_value = right_sum / (rows.len() - split) as f64;

                let mut sse = 0.0;
                for (rank, &idx) in order.iter().enumerate() {
                    let fit = if rank < split { left_value } else { right_value };
                    let err = residuals[idx] - fit;
                    sse += err * err;
                }

                if best.as_ref().map_or(true, |(best_sse, _)| sse < *best_sse) {
                    best = Some((
                        sse,
                        Stump {
                            feature,
                            threshold,
                            left_value,
                            right_value,
                        },
                    ));
                }
            }
        }
        best.map(|(_, stump)| stump)
    }
}

impl Forecaster for GradientBoost {
    fn fit(&mut self, series: &DemandSeries) -> Result<()> {
        let values = series.values();
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        let max_lag = *LAGS.iter().max().unwrap_or(&1);
        // Need enough diffs for lag rows plus splittable training data.
        let needed = max_lag + 2 * MIN_LEAF + 1;
        if values.len() < needed + 1 {
            return Err(ForecastError::InsufficientData {
                needed: needed + 1,
                got: values.len(),
            });
        }

        let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for t in max_lag..diffs.len() {
            rows.push(LAGS.iter().map(|&lag| diffs[t - lag]).collect::<Vec<f64>>());
            targets.push(diffs[t]);
        }

        let base = mean(&targets);
        let mut residuals: Vec<f64> = targets.iter().map(|y| y - base).collect();
        let mut stumps = Vec::new();
        for _ in 0..ROUNDS {
            let stump = match Self::fit_stump(&rows, &residuals) {
                Some(s) => s,
                None => break, // no informative split left
            };
            for (row, residual) in rows.iter().zip(residuals.iter_mut()) {
                *residual -= LEARNING_RATE * stump.predict(row);
            }
            stumps.push(stump);
        }

        self.fitted = Some(FittedBoost {
            base,
            stumps,
            recent_diffs: diffs[diffs.len() - max_lag..].to_vec(),
            last_level: *values.last().unwrap_or(&0.0),
        });
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let fitted = self.fitted.as_ref().ok_or(ForecastError::FitRequired)?;
        let mut history = fitted.recent_diffs.clone();
        let mut level = fitted.last_level;
        let mut values = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let row: Vec<f64> = LAGS
                .iter()
                .map(|&lag| history[history.len() - lag])
                .collect();
            let mut diff = fitted.base;
            for stump in &fitted.stumps {
                diff += LEARNING_RATE * stump.predict(&row);
            }
            level += diff;
            values.push(level);
            history.push(diff);
        }
        Ok(Forecast::from_values(values))
    }

    fn name(&self) -> &str {
        "GradientBoost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::test_support::series_from_values;
    use approx::assert_relative_eq;

    #[test]
    fn boost_constant_series_stays_constant() {
        let series = series_from_values("flat", vec![6.0; 20]);
        let mut model = GradientBoost::new();
        model.fit(&series).unwrap();
        for &v in model.predict(3).unwrap().values() {
            assert_relative_eq!(v, 6.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn boost_linear_trend_continues() {
        // Constant differences: base prediction alone continues the line.
        let values: Vec<f64> = (0..24).map(|i| 4.0 + 2.0 * i as f64).collect();
        let series = series_from_values("line", values);
        let mut model = GradientBoost::new();
        model.fit(&series).unwrap();

        let forecast = model.predict(3).unwrap();
        assert_relative_eq!(forecast.values()[0], 52.0, epsilon = 1e-6);
        assert_relative_eq!(forecast.values()[2], 56.0, epsilon = 1e-6);
    }

    #[test]
    fn boost_requires_minimum_history() {
        let series = series_from_values("tiny", vec![1.0; 6]);
        let mut model = GradientBoost::new();
        assert!(matches!(
            model.fit(&series),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn boost_learns_alternating_pattern() {
        // Alternating +10/-10 differences are perfectly predictable from lag 1.
        let values: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 10.0 } else { 20.0 })
            .collect();
        let series = series_from_values("zigzag", values);
        let mut model = GradientBoost::new();
        model.fit(&series).unwrap();

        // Last observation is 20 (index 29 odd); next should head down.
        let forecast = model.predict(2).unwrap();
        assert!(
            forecast.values()[0] < 17.0,
            "expected downswing, got {}",
            forecast.values()[0]
        );
    }
}
