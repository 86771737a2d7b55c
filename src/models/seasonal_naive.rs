//! Seasonal naive baseline.
//!
//! Repeats the last observed seasonal cycle. When the history is shorter than
//! one full cycle it degrades to last-value naive instead of failing; this
//! model is the safety candidate and must fit on any non-empty history.

use crate::core::{DemandSeries, Forecast};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;

/// Seasonal naive model.
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    seasonal_period: usize,
    last_cycle: Option<Vec<f64>>,
}

impl SeasonalNaive {
    pub fn new(seasonal_period: usize) -> Self {
        Self {
            seasonal_period,
            last_cycle: None,
        }
    }
}

impl Forecaster for SeasonalNaive {
    fn fit(&mut self, series: &DemandSeries) -> Result<()> {
        let values = series.values();
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        let cycle = if self.seasonal_period >= 1 && values.len() >= self.seasonal_period {
            values[values.len() - self.seasonal_period..].to_vec()
        } else {
            // Short history: repeat the last observation.
            vec![*values.last().unwrap_or(&0.0)]
        };
        self.last_cycle = Some(cycle);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let cycle = self.last_cycle.as_ref().ok_or(ForecastError::FitRequired)?;
        let values = (0..horizon).map(|h| cycle[h % cycle.len()]).collect();
        Ok(Forecast::from_values(values))
    }

    fn name(&self) -> &str {
        "SeasonalNaive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::test_support::series_from_values;

    #[test]
    fn seasonal_naive_repeats_last_cycle() {
        let pattern = [10.0, 20.0, 30.0, 40.0];
        let values: Vec<f64> = (0..12).map(|i| pattern[i % 4]).collect();
        let series = series_from_values("seasonal", values);

        let mut model = SeasonalNaive::new(4);
        model.fit(&series).unwrap();
        let forecast = model.predict(6).unwrap();
        assert_eq!(
            forecast.values(),
            &[10.0, 20.0, 30.0, 40.0, 10.0, 20.0]
        );
    }

    #[test]
    fn seasonal_naive_short_history_repeats_last_value() {
        let series = series_from_values("short", vec![3.0, 7.0, 5.0]);
        let mut model = SeasonalNaive::new(12);
        model.fit(&series).unwrap();
        assert_eq!(model.predict(3).unwrap().values(), &[5.0, 5.0, 5.0]);
    }

    #[test]
    fn seasonal_naive_fits_single_point() {
        let series = series_from_values("one", vec![2.0]);
        let mut model = SeasonalNaive::new(12);
        model.fit(&series).unwrap();
        assert_eq!(model.predict(2).unwrap().values(), &[2.0, 2.0]);
    }

    #[test]
    fn seasonal_naive_rejects_empty() {
        let series = series_from_values("empty", vec![]);
        assert!(matches!(
            SeasonalNaive::new(12).fit(&series),
            Err(ForecastError::EmptyData)
        ));
    }
}
