//! Hosted forecasting service candidate.
//!
//! The remote model is driven through the [`HostedClient`] trait so the
//! pipeline stays transport-agnostic and tests can inject fakes. Calls are
//! rate-limited through a shared [`Throttle`] and retried with backoff for
//! transient failures; authentication and quota errors are never retried.

use crate::config::Granularity;
use crate::core::{DemandSeries, Forecast, HolidayCalendar};
use crate::error::{ApiErrorKind, ForecastError, Result};
use crate::models::Forecaster;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const MAX_RETRIES: u32 = 2;
const BACKOFF_BASE: Duration = Duration::from_millis(200);

/// Request payload sent to the hosted service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedRequest {
    pub unique_id: String,
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
    /// One flag per history timestamp marking holiday periods.
    pub holiday_flags: Vec<bool>,
    pub horizon: usize,
    /// Frequency code of the history grid ("MS" or "W-MON").
    pub frequency: String,
}

/// Response payload from the hosted service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedResponse {
    pub values: Vec<f64>,
}

/// Transport abstraction over the hosted forecasting API.
pub trait HostedClient: Send + Sync {
    fn forecast(&self, request: &HostedRequest) -> Result<HostedResponse>;
}

/// Minimum-interval gate shared by all workers calling the hosted service.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Block until at least `min_interval` has passed since the previous
    /// admitted call, then record this one.
    pub fn wait(&self) {
        loop {
            let sleep_for = {
                let mut last = match self.last_call.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                match *last {
                    Some(prev) => {
                        let elapsed = prev.elapsed();
                        if elapsed >= self.min_interval {
                            *last = Some(Instant::now());
                            return;
                        }
                        self.min_interval - elapsed
                    }
                    None => {
                        *last = Some(Instant::now());
                        return;
                    }
                }
            };
            std::thread::sleep(sleep_for);
        }
    }
}

/// Shared state for hosted calls: client, throttle and holiday calendar.
#[derive(Clone)]
pub struct HostedContext {
    pub client: Arc<dyn HostedClient>,
    pub throttle: Arc<Throttle>,
    pub holidays: Arc<HolidayCalendar>,
}

impl std::fmt::Debug for HostedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedContext").finish_non_exhaustive()
    }
}

/// Forecaster adapter over the hosted service.
pub struct HostedModel {
    context: HostedContext,
    granularity: Granularity,
    history: Option<HistorySnapshot>,
}

struct HistorySnapshot {
    unique_id: String,
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl HostedModel {
    pub fn new(context: HostedContext, granularity: Granularity) -> Self {
        Self {
            context,
            granularity,
            history: None,
        }
    }

    fn call_with_retry(&self, request: &HostedRequest) -> Result<HostedResponse> {
        let mut attempt = 0u32;
        loop {
            self.context.throttle.wait();
            match self.context.client.forecast(request) {
                Ok(response) => return Ok(response),
                Err(err) => {
                    let retryable = err
                        .api_kind()
                        .map(ApiErrorKind::is_retryable)
                        .unwrap_or(false);
                    if !retryable || attempt >= MAX_RETRIES {
                        return Err(err);
                    }
                    let backoff = BACKOFF_BASE * 2u32.pow(attempt);
                    log::warn!(
                        "hosted call for {} failed ({err}), retrying in {backoff:?}",
                        request.unique_id
                    );
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
            }
        }
    }
}

impl Forecaster for HostedModel {
    fn fit(&mut self, series: &DemandSeries) -> Result<()> {
        if series.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        self.history = Some(HistorySnapshot {
            unique_id: series.unique_id().to_string(),
            timestamps: series.timestamps().to_vec(),
            values: series.values().to_vec(),
        });
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let history = self.history.as_ref().ok_or(ForecastError::FitRequired)?;
        let request = HostedRequest {
            unique_id: history.unique_id.clone(),
            timestamps: history.timestamps.clone(),
            values: history.values.clone(),
            holiday_flags: self.context.holidays.flags_for(&history.timestamps),
            horizon,
            frequency: self.granularity.frequency_code().to_string(),
        };

        let response = self.call_with_retry(&request)?;
        if response.values.len() != horizon {
            return Err(ForecastError::Api {
                kind: ApiErrorKind::Other,
                message: format!(
                    "hosted service returned {} values for horizon {horizon}",
                    response.values.len()
                ),
            });
        }
        Ok(Forecast::from_values(response.values))
    }

    fn name(&self) -> &str {
        "Hosted"
    }
}
