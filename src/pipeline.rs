//! Pipeline orchestrator.
//!
//! Drives aggregation, profiling, candidate selection, backtesting, champion
//! selection and the final forecast for every series, in parallel over a
//! bounded worker pool. Series are fully independent: each task carries its
//! own state and the run-level metadata is merged in one pass after the join.
//! A series failure degrades that series to the error-fallback baseline and
//! never aborts the batch.

use crate::aggregate::{aggregate, RawRecord};
use crate::champion::select_champion;
use crate::config::PipelineConfig;
use crate::core::calendar::future_periods;
use crate::core::{DemandSeries, Forecast};
use crate::cv::{cross_validate, CvRecord};
use crate::error::{ForecastError, Result};
use crate::models::{HostedContext, ModelFactory, ModelKind};
use crate::profile::profile_series;
use crate::select::{select_candidates, SelectionDecision};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Baseline model used for short-history and error fallbacks.
const FALLBACK_MODEL: ModelKind = ModelKind::AutoEts;

/// One row of the final output table.
///
/// Historical rows carry `actual` and no model; forecast rows carry
/// `predicted` and the champion label. Absence is `None`, never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub unique_id: String,
    pub timestamp: DateTime<Utc>,
    pub actual: Option<f64>,
    pub predicted: Option<f64>,
    /// Champion label, e.g. `"AutoTheta"` or `"AutoETS (error fallback)"`.
    pub model: Option<String>,
    pub dimensions: BTreeMap<String, String>,
}

impl ForecastRow {
    pub fn is_forecast(&self) -> bool {
        self.model.is_some()
    }
}

/// One series that could not produce any forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedSeries {
    pub unique_id: String,
    pub reason: String,
}

/// Run-level counters, merged after all worker tasks join.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineMetadata {
    pub total_series: usize,
    /// Champion label to number of series it won, fallback labels included.
    pub model_wins: BTreeMap<String, usize>,
    pub failed_series: Vec<FailedSeries>,
}

/// Complete result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Historical and forecast rows, deduplicated by (series, timestamp) with
    /// forecast rows winning, sorted by series then timestamp.
    pub rows: Vec<ForecastRow>,
    /// Backtest table, exposed for diagnostics.
    pub cv_records: Vec<CvRecord>,
    pub metadata: PipelineMetadata,
}

/// Per-series result produced by one worker task.
enum SeriesOutcome {
    Done {
        label: String,
        rows: Vec<ForecastRow>,
        cv_records: Vec<CvRecord>,
    },
    Failed(FailedSeries),
}

/// The forecasting pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    hosted: Option<HostedContext>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            hosted: None,
        }
    }

    /// Attach a hosted service context. The hosted candidate is offered only
    /// when this is present and the configured credential passes the format
    /// check.
    pub fn with_hosted(mut self, context: HostedContext) -> Self {
        self.hosted = Some(context);
        self
    }

    /// Run the full pipeline over raw records.
    pub fn run(&self, records: &[RawRecord]) -> Result<PipelineOutput> {
        let series = aggregate(records, &self.config)?;
        log::info!(
            "aggregated {} records into {} series",
            records.len(),
            series.len()
        );

        let mut factory = ModelFactory::new(self.config.granularity);
        if self.config.hosted_enabled() {
            if let Some(context) = &self.hosted {
                factory = factory.with_hosted(context.clone());
            }
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_count())
            .build()
            .map_err(|e| ForecastError::Computation(format!("worker pool: {e}")))?;

        let started = Instant::now();
        let hosted_down = AtomicBool::new(false);
        let outcomes: Vec<SeriesOutcome> = pool.install(|| {
            series
                .par_iter()
                .map(|s| self.run_series(s, &factory, &hosted_down, started))
                .collect()
        });

        Ok(self.assemble(&series, outcomes))
    }

    /// Profile, select, backtest and forecast one series. Never panics; any
    /// failure path ends in either the error-fallback label or a
    /// [`SeriesOutcome::Failed`].
    fn run_series(
        &self,
        series: &DemandSeries,
        factory: &ModelFactory,
        hosted_down: &AtomicBool,
        started: Instant,
    ) -> SeriesOutcome {
        if let Some(budget) = self.config.batch_timeout {
            if started.elapsed() > budget {
                log::warn!("{}: batch deadline exceeded before start", series.unique_id());
                return SeriesOutcome::Failed(FailedSeries {
                    unique_id: series.unique_id().to_string(),
                    reason: "batch deadline exceeded".to_string(),
                });
            }
        }

        let profile = profile_series(series, factory.seasonal_period());
        let hosted_available = factory.hosted_available() && !hosted_down.load(Ordering::Relaxed);
        let decision = select_candidates(&profile, hosted_available);

        let (attempt, cv_records) = match &decision {
            SelectionDecision::Forced(kind) => {
                let label = kind.name().to_string();
                (self.fit_predict(*kind, series, factory).map(|f| (label, f)), Vec::new())
            }
            SelectionDecision::Fallback(kind) => {
                log::debug!(
                    "{}: history {} too short, using fallback",
                    series.unique_id(),
                    profile.history_length
                );
                let label = format!("{} (fallback)", kind.name());
                (self.fit_predict(*kind, series, factory).map(|f| (label, f)), Vec::new())
            }
            SelectionDecision::Evaluate(candidates) => {
                self.evaluate(series, candidates, factory, hosted_down)
            }
        };

        let (label, forecast) = match attempt {
            Ok(done) => done,
            Err(err) => {
                log::warn!(
                    "{}: champion path failed ({err}), using error fallback",
                    series.unique_id()
                );
                self.note_hosted_failure(&err, hosted_down);
                match self.fit_predict(FALLBACK_MODEL, series, factory) {
                    Ok(forecast) => {
                        (format!("{} (error fallback)", FALLBACK_MODEL.name()), forecast)
                    }
                    Err(fallback_err) => {
                        log::error!(
                            "{}: error fallback also failed ({fallback_err})",
                            series.unique_id()
                        );
                        return SeriesOutcome::Failed(FailedSeries {
                            unique_id: series.unique_id().to_string(),
                            reason: fallback_err.to_string(),
                        });
                    }
                }
            }
        };

        SeriesOutcome::Done {
            rows: self.build_rows(series, &label, &forecast),
            label,
            cv_records,
        }
    }

    /// The backtested route: cross-validate, pick the champion, refit it on
    /// full history.
    fn evaluate(
        &self,
        series: &DemandSeries,
        candidates: &[ModelKind],
        factory: &ModelFactory,
        hosted_down: &AtomicBool,
    ) -> (Result<(String, Forecast)>, Vec<CvRecord>) {
        let outcome = match cross_validate(series, candidates, factory) {
            Ok(outcome) => outcome,
            Err(err) => return (Err(err), Vec::new()),
        };
        for failure in &outcome.failures {
            self.note_hosted_failure(&failure.error, hosted_down);
        }

        let champion = match select_champion(&outcome.records, candidates) {
            Some(champion) => champion,
            None => {
                return (
                    Err(ForecastError::Computation(
                        "every candidate failed the backtest".to_string(),
                    )),
                    outcome.records,
                )
            }
        };
        log::debug!(
            "{}: champion {} ({:?} {:.4})",
            series.unique_id(),
            champion.model,
            champion.metric,
            champion.score
        );

        let result = self
            .fit_predict(champion.model, series, factory)
            .map(|forecast| (champion.model.name().to_string(), forecast));
        (result, outcome.records)
    }

    /// Fit `kind` on the full history and predict the configured horizon,
    /// clamped to non-negative values.
    fn fit_predict(
        &self,
        kind: ModelKind,
        series: &DemandSeries,
        factory: &ModelFactory,
    ) -> Result<Forecast> {
        let mut model = factory
            .build(kind)
            .ok_or_else(|| ForecastError::InvalidParameter(format!("{kind} is not available")))?;
        model.fit(series)?;
        let forecast = model.predict(self.config.horizon)?;
        if forecast.horizon() != self.config.horizon {
            return Err(ForecastError::Computation(format!(
                "{kind} returned {} values for horizon {}",
                forecast.horizon(),
                self.config.horizon
            )));
        }
        Ok(forecast.clamped_non_negative())
    }

    /// Disable the hosted candidate batch-wide after an auth or quota error;
    /// retrying it on other series would fail the same way.
    fn note_hosted_failure(&self, err: &ForecastError, hosted_down: &AtomicBool) {
        if let Some(kind) = err.api_kind() {
            if kind.is_batch_fatal() && !hosted_down.swap(true, Ordering::Relaxed) {
                log::error!("hosted api disabled for the rest of the batch: {err}");
            }
        }
    }

    /// Historical rows followed by forecast rows on the extended calendar.
    fn build_rows(
        &self,
        series: &DemandSeries,
        label: &str,
        forecast: &Forecast,
    ) -> Vec<ForecastRow> {
        let mut rows = Vec::with_capacity(series.len() + forecast.horizon());
        for (&timestamp, &actual) in series.timestamps().iter().zip(series.values()) {
            rows.push(ForecastRow {
                unique_id: series.unique_id().to_string(),
                timestamp,
                actual: Some(actual),
                predicted: None,
                model: None,
                dimensions: series.dimensions().clone(),
            });
        }

        let future = match series.last_timestamp() {
            Some(last) => future_periods(last, self.config.granularity, forecast.horizon()),
            None => Vec::new(),
        };
        for (&timestamp, &predicted) in future.iter().zip(forecast.values()) {
            rows.push(ForecastRow {
                unique_id: series.unique_id().to_string(),
                timestamp,
                actual: None,
                predicted: Some(predicted),
                model: Some(label.to_string()),
                dimensions: series.dimensions().clone(),
            });
        }
        rows
    }

    /// Merge per-task outcomes into the final table and metadata. Rows are
    /// deduplicated by (series, timestamp); when a forecast row and a
    /// historical row collide the forecast row wins.
    fn assemble(&self, series: &[DemandSeries], outcomes: Vec<SeriesOutcome>) -> PipelineOutput {
        let mut metadata = PipelineMetadata {
            total_series: series.len(),
            ..Default::default()
        };
        let mut deduped: BTreeMap<(String, DateTime<Utc>), ForecastRow> = BTreeMap::new();
        let mut cv_records = Vec::new();

        for outcome in outcomes {
            match outcome {
                SeriesOutcome::Done {
                    label,
                    rows,
                    cv_records: records,
                } => {
                    *metadata.model_wins.entry(label).or_insert(0) += 1;
                    cv_records.extend(records);
                    for row in rows {
                        let key = (row.unique_id.clone(), row.timestamp);
                        match deduped.entry(key) {
                            std::collections::btree_map::Entry::Vacant(slot) => {
                                slot.insert(row);
                            }
                            std::collections::btree_map::Entry::Occupied(mut slot) => {
                                if row.is_forecast() {
                                    slot.insert(row);
                                }
                            }
                        }
                    }
                }
                SeriesOutcome::Failed(failed) => {
                    metadata.failed_series.push(failed);
                }
            }
        }
        metadata.failed_series.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));

        PipelineOutput {
            rows: deduped.into_values().collect(),
            cv_records,
            metadata,
        }
    }
}
