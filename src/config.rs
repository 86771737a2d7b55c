//! Pipeline configuration.
//!
//! Everything the orchestrator needs is carried explicitly here; there is no
//! ambient session state. Configs deserialize from TOML for batch runs and
//! build programmatically for tests.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Number of rolling-origin validation windows used for backtesting.
pub const CV_WINDOWS: usize = 3;

/// Minimum history length (in periods) for full candidate evaluation.
/// Shorter series go straight to the fallback baseline.
pub const MIN_HISTORY_FOR_EVALUATION: usize = 6;

/// Calendar frequency of the aggregated series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Monthly,
    Weekly,
}

impl Granularity {
    /// Seasonal period implied by the frequency.
    pub fn seasonal_period(self) -> usize {
        match self {
            Granularity::Monthly => 12,
            Granularity::Weekly => 52,
        }
    }

    /// Frequency code used in hosted API requests
    /// (month-start / week-start-Monday anchors).
    pub fn frequency_code(self) -> &'static str {
        match self {
            Granularity::Monthly => "MS",
            Granularity::Weekly => "W-MON",
        }
    }
}

/// Spatial aggregation level: which dimension columns define one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationLevel {
    Company,
    Region,
    Province,
    #[default]
    City,
}

impl AggregationLevel {
    /// Dimension columns that form the series key, in key order.
    pub fn grouping_columns(self) -> &'static [&'static str] {
        match self {
            AggregationLevel::Company => &["company", "fleet_type"],
            AggregationLevel::Region => &["company", "origin", "region", "fleet_type"],
            AggregationLevel::Province => &["company", "origin", "province", "fleet_type"],
            AggregationLevel::City => &["company", "origin", "destination", "fleet_type"],
        }
    }
}

/// Configuration consumed by the forecasting pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Calendar frequency (drives the seasonal period, 12 vs 52).
    pub granularity: Granularity,
    /// Which dimensions define a series.
    pub aggregation_level: AggregationLevel,
    /// Number of future periods to forecast.
    pub horizon: usize,
    /// Hosted API credential; the hosted candidate is offered only when this
    /// passes [`credential_is_valid`].
    pub api_credential: Option<String>,
    /// Ignore raw records after this timestamp.
    pub history_cutoff: Option<DateTime<Utc>>,
    /// Worker pool size. Defaults to the available parallelism, capped at
    /// [`HOSTED_WORKER_CAP`] when the hosted candidate is in play.
    pub max_workers: Option<usize>,
    /// Wall-clock budget for the whole batch. Series whose task has not
    /// started by the deadline are marked failed rather than silently dropped.
    #[serde(with = "humantime_opt")]
    pub batch_timeout: Option<Duration>,
}

/// Worker cap applied when the hosted API candidate is enabled, so concurrent
/// series tasks do not stampede the rate limit.
pub const HOSTED_WORKER_CAP: usize = 4;

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Monthly,
            aggregation_level: AggregationLevel::City,
            horizon: 3,
            api_credential: None,
            history_cutoff: None,
            max_workers: None,
            batch_timeout: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(s)
            .map_err(|e| ForecastError::InvalidParameter(format!("config parse: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate invariants not expressible in the type system.
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be positive".to_string(),
            ));
        }
        if self.max_workers == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "max_workers must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the hosted candidate may be offered at all.
    pub fn hosted_enabled(&self) -> bool {
        self.api_credential
            .as_deref()
            .is_some_and(credential_is_valid)
    }

    /// Effective worker pool size.
    pub fn worker_count(&self) -> usize {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let requested = self.max_workers.unwrap_or(available).max(1);
        if self.hosted_enabled() {
            requested.min(HOSTED_WORKER_CAP)
        } else {
            requested
        }
    }
}

/// Syntactic credential check. This gates whether the hosted candidate is
/// offered; actual validity is determined by the service on first call.
pub fn credential_is_valid(credential: &str) -> bool {
    let Some(rest) = credential.strip_prefix("fk_") else {
        return false;
    };
    rest.len() >= 8 && rest.chars().all(|c| c.is_ascii_alphanumeric())
}

mod humantime_opt {
    //! Deserialize an optional duration given as whole seconds.
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granularity_drives_seasonal_period() {
        assert_eq!(Granularity::Monthly.seasonal_period(), 12);
        assert_eq!(Granularity::Weekly.seasonal_period(), 52);
        assert_eq!(Granularity::Monthly.frequency_code(), "MS");
        assert_eq!(Granularity::Weekly.frequency_code(), "W-MON");
    }

    #[test]
    fn grouping_columns_per_level() {
        assert_eq!(
            AggregationLevel::Company.grouping_columns(),
            &["company", "fleet_type"]
        );
        assert_eq!(
            AggregationLevel::City.grouping_columns(),
            &["company", "origin", "destination", "fleet_type"]
        );
    }

    #[test]
    fn credential_format_check() {
        assert!(credential_is_valid("fk_a1b2c3d4e5"));
        assert!(!credential_is_valid(""));
        assert!(!credential_is_valid("fk_short"));
        assert!(!credential_is_valid("nope_a1b2c3d4e5"));
        assert!(!credential_is_valid("fk_has spaces!"));
    }

    #[test]
    fn hosted_gate_uses_credential() {
        let mut config = PipelineConfig::default();
        assert!(!config.hosted_enabled());

        config.api_credential = Some("fk_a1b2c3d4e5".to_string());
        assert!(config.hosted_enabled());

        config.api_credential = Some("bad".to_string());
        assert!(!config.hosted_enabled());
    }

    #[test]
    fn worker_count_capped_when_hosted() {
        let config = PipelineConfig {
            api_credential: Some("fk_a1b2c3d4e5".to_string()),
            max_workers: Some(32),
            ..Default::default()
        };
        assert_eq!(config.worker_count(), HOSTED_WORKER_CAP);

        let config = PipelineConfig {
            max_workers: Some(32),
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 32);
    }

    #[test]
    fn config_parses_from_toml() {
        let config = PipelineConfig::from_toml(
            r#"
            granularity = "weekly"
            aggregation_level = "region"
            horizon = 6
            api_credential = "fk_a1b2c3d4e5"
            batch_timeout = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.granularity, Granularity::Weekly);
        assert_eq!(config.aggregation_level, AggregationLevel::Region);
        assert_eq!(config.horizon, 6);
        assert_eq!(config.batch_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn config_rejects_zero_horizon() {
        let result = PipelineConfig::from_toml("horizon = 0");
        assert!(matches!(
            result,
            Err(ForecastError::InvalidParameter(_))
        ));
    }
}
