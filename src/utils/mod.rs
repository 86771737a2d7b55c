//! Shared statistical helpers.

pub mod metrics;
pub mod stats;

pub use metrics::{mae, mape, rmse};
pub use stats::{mean, population_variance, sample_variance};
