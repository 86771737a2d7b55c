//! Forecaster trait defining the common interface for all candidate models.

use crate::core::{DemandSeries, Forecast};
use crate::error::Result;

/// Common interface for all forecasting models.
///
/// Object-safe so candidates can be driven uniformly as `Box<dyn Forecaster>`
/// through fitting, cross-validation and final prediction.
pub trait Forecaster {
    /// Fit the model to the series history.
    fn fit(&mut self, series: &DemandSeries) -> Result<()>;

    /// Generate point predictions for the specified horizon.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// Display name of the model (also the champion label).
    fn name(&self) -> &str;
}

/// Type alias for boxed forecaster trait objects.
pub type BoxedForecaster = Box<dyn Forecaster + Send>;
