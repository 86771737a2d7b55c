//! Rolling-origin cross-validation.
//!
//! Each candidate is refitted on an expanding window and asked for a one-step
//! forecast at each of the last [`CV_WINDOWS`] origins. Candidates are scored
//! on exactly the same windows; a candidate that fails any window is dropped
//! entirely so mean errors are always computed over identical window sets.

use crate::config::CV_WINDOWS;
use crate::core::DemandSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ModelFactory, ModelKind};
use chrono::{DateTime, Utc};

/// One backtest observation: a model's one-step prediction at one origin.
#[derive(Debug, Clone, PartialEq)]
pub struct CvRecord {
    pub unique_id: String,
    /// Timestamp of the predicted period.
    pub timestamp: DateTime<Utc>,
    /// Last timestamp the model saw when fitting.
    pub cutoff: DateTime<Utc>,
    pub model: ModelKind,
    pub actual: f64,
    pub predicted: f64,
}

/// One candidate dropped from the backtest, with the error that dropped it.
#[derive(Debug, Clone)]
pub struct CandidateFailure {
    pub model: ModelKind,
    pub error: ForecastError,
}

/// Outcome of backtesting one series: surviving records plus dropped
/// candidates. Empty records with non-empty failures means every candidate
/// failed.
#[derive(Debug, Clone, Default)]
pub struct CvOutcome {
    pub records: Vec<CvRecord>,
    pub failures: Vec<CandidateFailure>,
}

/// Backtest `candidates` on the last [`CV_WINDOWS`] one-step origins.
///
/// A candidate that fails to fit or predict on any window is logged, dropped
/// entirely, and reported in [`CvOutcome::failures`]; the caller inspects
/// those for failures that should affect the rest of the batch.
pub fn cross_validate(
    series: &DemandSeries,
    candidates: &[ModelKind],
    factory: &ModelFactory,
) -> Result<CvOutcome> {
    let n = series.len();
    if n <= CV_WINDOWS {
        return Err(ForecastError::InsufficientData {
            needed: CV_WINDOWS + 1,
            got: n,
        });
    }

    let mut outcome = CvOutcome::default();
    'candidates: for &kind in candidates {
        let mut candidate_records = Vec::with_capacity(CV_WINDOWS);
        for window in 0..CV_WINDOWS {
            let origin = n - CV_WINDOWS + window;
            let train = series.slice(0, origin)?;

            let prediction = factory
                .build(kind)
                .ok_or_else(|| {
                    ForecastError::InvalidParameter(format!("{kind} is not available"))
                })
                .and_then(|mut model| {
                    model.fit(&train)?;
                    model.predict(1)
                });

            let predicted = match prediction {
                Ok(forecast) if forecast.horizon() == 1 => forecast.values()[0],
                Ok(forecast) => {
                    log::warn!(
                        "{}: {kind} returned {} values for one-step window, dropping candidate",
                        series.unique_id(),
                        forecast.horizon()
                    );
                    outcome.failures.push(CandidateFailure {
                        model: kind,
                        error: ForecastError::Computation(format!(
                            "expected 1 value, got {}",
                            forecast.horizon()
                        )),
                    });
                    continue 'candidates;
                }
                Err(err) => {
                    log::warn!(
                        "{}: {kind} failed backtest window {window} ({err}), dropping candidate",
                        series.unique_id()
                    );
                    outcome.failures.push(CandidateFailure { model: kind, error: err });
                    continue 'candidates;
                }
            };

            candidate_records.push(CvRecord {
                unique_id: series.unique_id().to_string(),
                timestamp: series.timestamps()[origin],
                cutoff: series.timestamps()[origin - 1],
                model: kind,
                actual: series.values()[origin],
                predicted,
            });
        }
        outcome.records.extend(candidate_records);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Granularity;
    use crate::core::series::test_support::series_from_values;
    use approx::assert_relative_eq;

    fn factory() -> ModelFactory {
        ModelFactory::new(Granularity::Monthly)
    }

    #[test]
    fn cv_produces_one_record_per_window_per_candidate() {
        let values: Vec<f64> = (0..12).map(|i| 10.0 + i as f64).collect();
        let series = series_from_values("acme_truck", values);
        let candidates = [ModelKind::AutoEts, ModelKind::SeasonalNaive];

        let outcome = cross_validate(&series, &candidates, &factory()).unwrap();
        assert_eq!(outcome.records.len(), 2 * CV_WINDOWS);
        assert!(outcome.failures.is_empty());

        let ets: Vec<&CvRecord> = outcome
            .records
            .iter()
            .filter(|r| r.model == ModelKind::AutoEts)
            .collect();
        assert_eq!(ets.len(), CV_WINDOWS);
        // Origins are the last three periods, in order.
        assert_eq!(ets[0].actual, 19.0);
        assert_eq!(ets[1].actual, 20.0);
        assert_eq!(ets[2].actual, 21.0);
        for r in &ets {
            assert_eq!(r.unique_id, "acme_truck");
            assert!(r.cutoff < r.timestamp);
        }
    }

    #[test]
    fn cv_never_leaks_future_values() {
        // A spike in the last period must not affect the window predicting it:
        // the naive candidate fitted up to the cutoff can only repeat history.
        let mut values = vec![5.0; 11];
        values.push(500.0);
        let series = series_from_values("spiky", values);

        let outcome =
            cross_validate(&series, &[ModelKind::SeasonalNaive], &factory()).unwrap();
        let last = outcome.records.last().unwrap();
        assert_eq!(last.actual, 500.0);
        assert_relative_eq!(last.predicted, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn cv_drops_failing_candidate_but_keeps_others() {
        // Six smooth points: croston needs two demand occurrences per training
        // window but ETS is fine, so only ETS records survive.
        let series = series_from_values("mixed", vec![1.0, 0.0, 0.0, 0.0, 0.0, 2.0]);
        let candidates = [ModelKind::CrostonSba, ModelKind::AutoEts];

        let outcome = cross_validate(&series, &candidates, &factory()).unwrap();
        assert!(outcome.records.iter().all(|r| r.model == ModelKind::AutoEts));
        assert_eq!(outcome.records.len(), CV_WINDOWS);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].model, ModelKind::CrostonSba);
    }

    #[test]
    fn cv_requires_more_history_than_windows() {
        let series = series_from_values("tiny", vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            cross_validate(&series, &[ModelKind::AutoEts], &factory()),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn cv_empty_when_all_candidates_fail() {
        // All-zero history: croston has no demand occurrences anywhere.
        let series = series_from_values("zeros", vec![0.0; 10]);
        let outcome =
            cross_validate(&series, &[ModelKind::CrostonSba], &factory()).unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.failures.len(), 1);
    }
}
