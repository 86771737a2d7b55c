//! # fleet-forecast
//!
//! Per-route fleet demand forecasting with automatic model selection.
//!
//! Aggregates raw transaction records into zero-padded demand series,
//! profiles each series, shortlists candidate models from the profile,
//! backtests them with rolling-origin cross-validation, and refits the
//! champion for the final forecast. Series degrade independently: a failure
//! anywhere falls back to a robust baseline instead of aborting the batch.

#![allow(clippy::needless_range_loop)]

pub mod aggregate;
pub mod champion;
pub mod config;
pub mod core;
pub mod cv;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod profile;
pub mod select;
pub mod utils;

pub use error::{ApiErrorKind, ForecastError, Result};

pub mod prelude {
    pub use crate::aggregate::RawRecord;
    pub use crate::config::{AggregationLevel, Granularity, PipelineConfig};
    pub use crate::core::{DemandSeries, Forecast, HolidayCalendar};
    pub use crate::error::{ApiErrorKind, ForecastError, Result};
    pub use crate::models::{Forecaster, HostedClient, HostedContext, ModelKind, Throttle};
    pub use crate::pipeline::{ForecastRow, Pipeline, PipelineMetadata, PipelineOutput};
    pub use crate::profile::SeriesProfile;
}
