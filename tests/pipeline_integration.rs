//! End-to-end tests for the forecasting pipeline.
//!
//! These drive the full aggregation -> profiling -> selection -> backtest ->
//! champion -> forecast path on synthetic record sets, including the hosted
//! candidate behind a fake client.

use chrono::{DateTime, TimeZone, Utc};
use fleet_forecast::aggregate::RawRecord;
use fleet_forecast::config::{AggregationLevel, Granularity, PipelineConfig};
use fleet_forecast::error::{ApiErrorKind, ForecastError};
use fleet_forecast::models::{
    HostedClient, HostedContext, HostedRequest, HostedResponse, Throttle,
};
use fleet_forecast::pipeline::{ForecastRow, Pipeline};
use fleet_forecast::Result;
use fleet_forecast::core::HolidayCalendar;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn monthly_records(company: &str, fleet: &str, values: &[f64]) -> Vec<RawRecord> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let year = 2022 + (i / 12) as i32;
            let month = (i % 12) as u32 + 1;
            RawRecord::new(Utc.with_ymd_and_hms(year, month, 10, 9, 0, 0).unwrap())
                .with_dimension("company", company)
                .with_dimension("fleet_type", fleet)
                .with_quantity(v)
        })
        .collect()
}

fn base_config() -> PipelineConfig {
    PipelineConfig {
        aggregation_level: AggregationLevel::Company,
        granularity: Granularity::Monthly,
        horizon: 3,
        max_workers: Some(2),
        ..Default::default()
    }
}

fn forecast_rows<'a>(rows: &'a [ForecastRow], id: &str) -> Vec<&'a ForecastRow> {
    rows.iter()
        .filter(|r| r.unique_id == id && r.is_forecast())
        .collect()
}

#[test]
fn pipeline_runs_are_deterministic() {
    init_logs();
    let mut records = monthly_records("acme", "truck", &[12.0; 24]);
    records.extend(monthly_records("blue", "van", &[3.0, 0.0, 7.0, 1.0, 0.0, 9.0, 2.0, 5.0]));

    let first = Pipeline::new(base_config()).run(&records).unwrap();
    let second = Pipeline::new(base_config()).run(&records).unwrap();

    assert_eq!(first.rows, second.rows);
    assert_eq!(first.metadata, second.metadata);
}

#[test]
fn missing_dimension_columns_fail_the_run() {
    let records = vec![RawRecord::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .with_dimension("company", "acme")
        .with_quantity(1.0)];

    match Pipeline::new(base_config()).run(&records) {
        Err(ForecastError::Schema { missing }) => {
            assert_eq!(missing, vec!["fleet_type"]);
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn weekly_forecasts_continue_on_mondays() {
    // 10 consecutive weeks starting Monday 2024-01-01.
    let records: Vec<RawRecord> = (0..10)
        .map(|i| {
            RawRecord::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(7 * i + 2),
            )
            .with_dimension("company", "acme")
            .with_dimension("fleet_type", "truck")
            .with_quantity(5.0)
        })
        .collect();
    let config = PipelineConfig {
        granularity: Granularity::Weekly,
        ..base_config()
    };

    let output = Pipeline::new(config).run(&records).unwrap();
    let forecasts = forecast_rows(&output.rows, "acme_truck");
    assert_eq!(forecasts.len(), 3);
    // History ends Monday 2024-03-04; forecasts start the Monday after.
    assert_eq!(
        forecasts[0].timestamp,
        Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()
    );
    for row in &forecasts {
        assert_eq!(row.timestamp.format("%u").to_string(), "1", "not a Monday");
    }
}

#[test]
fn all_zero_fleet_forecasts_zero_everywhere() {
    let mut records = monthly_records("acme", "truck", &[0.0; 18]);
    records.extend(monthly_records("blue", "van", &[6.0; 18]));

    let output = Pipeline::new(base_config()).run(&records).unwrap();
    for row in forecast_rows(&output.rows, "acme_truck") {
        assert_eq!(row.predicted, Some(0.0));
    }
    assert!(output.metadata.failed_series.is_empty());
}

/// Fake hosted service that knows the full series and answers the next true
/// value for every one-step request, making it unbeatable in the backtest.
struct OracleClient {
    truth: Vec<f64>,
    calls: AtomicUsize,
}

impl HostedClient for OracleClient {
    fn forecast(&self, request: &HostedRequest) -> Result<HostedResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let start = request.values.len();
        let values = (start..start + request.horizon)
            .map(|i| self.truth.get(i).copied().unwrap_or(0.0))
            .collect();
        Ok(HostedResponse { values })
    }
}

fn hosted_context(client: Arc<dyn HostedClient>) -> HostedContext {
    HostedContext {
        client,
        throttle: Arc::new(Throttle::new(Duration::ZERO)),
        holidays: Arc::new(HolidayCalendar::new()),
    }
}

#[test]
fn hosted_oracle_wins_the_backtest() {
    // Irregular but smooth enough to avoid the intermittent route; no local
    // model predicts it exactly, the oracle does.
    let values: Vec<f64> = (0..24)
        .map(|i| 40.0 + 9.0 * ((i * i) % 7) as f64)
        .collect();
    let records = monthly_records("acme", "truck", &values);
    let client = Arc::new(OracleClient {
        truth: values.clone(),
        calls: AtomicUsize::new(0),
    });
    let config = PipelineConfig {
        api_credential: Some("fk_a1b2c3d4e5".to_string()),
        ..base_config()
    };

    let output = Pipeline::new(config)
        .with_hosted(hosted_context(client))
        .run(&records)
        .unwrap();

    assert_eq!(output.metadata.model_wins.get("Hosted"), Some(&1));
    let forecasts = forecast_rows(&output.rows, "acme_truck");
    assert_eq!(forecasts.len(), 3);
}

#[test]
fn invalid_credential_never_calls_the_service() {
    let records = monthly_records("acme", "truck", &[10.0; 24]);
    let client = Arc::new(OracleClient {
        truth: vec![10.0; 27],
        calls: AtomicUsize::new(0),
    });
    let config = PipelineConfig {
        api_credential: Some("not-a-credential".to_string()),
        ..base_config()
    };

    let output = Pipeline::new(config)
        .with_hosted(hosted_context(client.clone()))
        .run(&records)
        .unwrap();

    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    assert!(!output.metadata.model_wins.contains_key("Hosted"));
}

/// Fake hosted service whose credential is rejected server-side.
struct RejectingClient {
    calls: AtomicUsize,
}

impl HostedClient for RejectingClient {
    fn forecast(&self, _request: &HostedRequest) -> Result<HostedResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ForecastError::Api {
            kind: ApiErrorKind::Auth,
            message: "credential rejected".to_string(),
        })
    }
}

#[test]
fn auth_failure_disables_hosted_for_the_batch() {
    init_logs();
    // Many series; after the first auth rejection no further series may call
    // the service. Single worker keeps the order deterministic.
    let mut records = Vec::new();
    for (company, base) in [("acme", 10.0), ("blue", 20.0), ("cargo", 30.0), ("dart", 40.0)] {
        let values: Vec<f64> = (0..24).map(|i| base + (i % 5) as f64).collect();
        records.extend(monthly_records(company, "truck", &values));
    }
    let client = Arc::new(RejectingClient {
        calls: AtomicUsize::new(0),
    });
    let config = PipelineConfig {
        api_credential: Some("fk_a1b2c3d4e5".to_string()),
        max_workers: Some(1),
        ..base_config()
    };

    let output = Pipeline::new(config)
        .with_hosted(hosted_context(client.clone()))
        .run(&records)
        .unwrap();

    // One rejected call from the first series' backtest, then the batch-wide
    // disable kicks in.
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    assert!(!output.metadata.model_wins.contains_key("Hosted"));
    // Every series still completes locally.
    assert_eq!(output.metadata.model_wins.values().sum::<usize>(), 4);
    assert!(output.metadata.failed_series.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn every_series_gets_exactly_horizon_forecast_rows(
        values in prop::collection::vec(0.0..500.0f64, 8..40),
        horizon in 1usize..6,
    ) {
        let records = monthly_records("acme", "truck", &values);
        let config = PipelineConfig { horizon, ..base_config() };

        let output = Pipeline::new(config).run(&records).unwrap();
        let forecasts = forecast_rows(&output.rows, "acme_truck");

        prop_assert_eq!(forecasts.len(), horizon);
        for row in &forecasts {
            let v = row.predicted.unwrap();
            prop_assert!(v >= 0.0 && v.is_finite());
            prop_assert!(row.actual.is_none());
            prop_assert!(row.model.is_some());
        }
        // Historical rows are untouched and complete.
        let history: Vec<&ForecastRow> = output
            .rows
            .iter()
            .filter(|r| !r.is_forecast())
            .collect();
        prop_assert_eq!(history.len(), values.len());

        // Forecast timestamps strictly follow the last historical timestamp.
        let last_history: DateTime<Utc> = history.iter().map(|r| r.timestamp).max().unwrap();
        for row in &forecasts {
            prop_assert!(row.timestamp > last_history);
        }
    }
}
