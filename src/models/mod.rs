//! Candidate forecasting models.
//!
//! Every model implements [`Forecaster`] and is built through the
//! [`ModelFactory`], which carries the seasonal period and, when enabled, the
//! hosted service context. Candidate lists are expressed as [`ModelKind`]
//! values so selection stays decoupled from construction.

pub mod auto_ar;
pub mod auto_ets;
pub mod auto_theta;
pub mod croston;
pub mod gradient_boost;
pub mod hosted;
pub mod seasonal_naive;
mod traits;

pub use auto_ar::AutoAr;
pub use auto_ets::AutoEts;
pub use auto_theta::AutoTheta;
pub use croston::CrostonSba;
pub use gradient_boost::GradientBoost;
pub use hosted::{HostedClient, HostedContext, HostedModel, HostedRequest, HostedResponse, Throttle};
pub use seasonal_naive::SeasonalNaive;
pub use traits::{BoxedForecaster, Forecaster};

use crate::config::Granularity;

/// The candidate model kinds the selector can nominate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    CrostonSba,
    AutoEts,
    AutoTheta,
    AutoAr,
    SeasonalNaive,
    GradientBoost,
    Hosted,
}

impl ModelKind {
    /// Display name, also used as the champion label.
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::CrostonSba => "CrostonSBA",
            ModelKind::AutoEts => "AutoETS",
            ModelKind::AutoTheta => "AutoTheta",
            ModelKind::AutoAr => "AutoAR",
            ModelKind::SeasonalNaive => "SeasonalNaive",
            ModelKind::GradientBoost => "GradientBoost",
            ModelKind::Hosted => "Hosted",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds fresh model instances for fitting.
///
/// Cross-validation fits each candidate once per window, so construction has
/// to be cheap and stateless.
#[derive(Debug, Clone)]
pub struct ModelFactory {
    granularity: Granularity,
    hosted: Option<HostedContext>,
}

impl ModelFactory {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            hosted: None,
        }
    }

    /// Enable the hosted candidate with the given shared context.
    pub fn with_hosted(mut self, context: HostedContext) -> Self {
        self.hosted = Some(context);
        self
    }

    pub fn hosted_available(&self) -> bool {
        self.hosted.is_some()
    }

    pub fn seasonal_period(&self) -> usize {
        self.granularity.seasonal_period()
    }

    /// Build an unfitted instance of `kind`.
    ///
    /// `None` only for [`ModelKind::Hosted`] when no hosted context was
    /// attached; local models always construct.
    pub fn build(&self, kind: ModelKind) -> Option<BoxedForecaster> {
        let model: BoxedForecaster = match kind {
            ModelKind::CrostonSba => Box::new(CrostonSba::new()),
            ModelKind::AutoEts => Box::new(AutoEts::new()),
            ModelKind::AutoTheta => Box::new(AutoTheta::new()),
            ModelKind::AutoAr => Box::new(AutoAr::new()),
            ModelKind::SeasonalNaive => Box::new(SeasonalNaive::new(self.seasonal_period())),
            ModelKind::GradientBoost => Box::new(GradientBoost::new()),
            ModelKind::Hosted => {
                let context = self.hosted.clone()?;
                Box::new(HostedModel::new(context, self.granularity))
            }
        };
        Some(model)
    }
}
