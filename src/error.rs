//! Error types for the fleet-forecast library.

use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Failure categories reported by the hosted forecasting API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Credential rejected by the service.
    Auth,
    /// Request quota or rate limit exhausted.
    Quota,
    /// The call did not complete within the configured timeout.
    Timeout,
    /// Anything else (transport errors, malformed responses).
    Other,
}

impl ApiErrorKind {
    /// Auth and quota failures affect every future call, so the batch
    /// disables the hosted candidate after seeing one.
    pub fn is_batch_fatal(self) -> bool {
        matches!(self, ApiErrorKind::Auth | ApiErrorKind::Quota)
    }

    /// Timeouts and transient transport errors are worth retrying.
    pub fn is_retryable(self) -> bool {
        matches!(self, ApiErrorKind::Timeout | ApiErrorKind::Other)
    }
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApiErrorKind::Auth => "auth",
            ApiErrorKind::Quota => "quota",
            ApiErrorKind::Timeout => "timeout",
            ApiErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Errors that can occur during aggregation, profiling or forecasting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Required input columns are absent. Fatal to the whole run.
    #[error("missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    Timestamp(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Numerical failure during fitting or prediction.
    #[error("computation error: {0}")]
    Computation(String),

    /// Hosted forecasting API failure.
    #[error("hosted api error ({kind}): {message}")]
    Api { kind: ApiErrorKind, message: String },
}

impl ForecastError {
    /// Kind of the underlying API failure, if this is one.
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            ForecastError::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
