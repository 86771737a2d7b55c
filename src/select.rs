//! Profile-driven candidate selection.
//!
//! The profile decides the route: intermittent series skip evaluation and go
//! straight to Croston SBA, short histories fall back to exponential
//! smoothing, and everything else gets a candidate shortlist shaped by trend
//! and seasonality strength. The seasonal naive baseline rides along on every
//! evaluation so the champion never loses to "repeat last cycle" silently.

use crate::config::MIN_HISTORY_FOR_EVALUATION;
use crate::models::ModelKind;
use crate::profile::SeriesProfile;

/// Seasonality strength above which the shortlist favors seasonal learners.
pub const SEASONALITY_SHORTLIST_THRESHOLD: f64 = 0.6;
/// Trend strength above which the shortlist favors trend learners.
pub const TREND_SHORTLIST_THRESHOLD: f64 = 0.7;

/// How a series will be forecast, decided from its profile alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionDecision {
    /// The profile dictates a single model; no backtest is run.
    Forced(ModelKind),
    /// Too little history to evaluate; use the robust baseline directly.
    Fallback(ModelKind),
    /// Cross-validate these candidates and pick the champion.
    Evaluate(Vec<ModelKind>),
}

impl SelectionDecision {
    /// Candidates that will actually be fitted, whichever route was taken.
    pub fn candidates(&self) -> Vec<ModelKind> {
        match self {
            SelectionDecision::Forced(kind) | SelectionDecision::Fallback(kind) => vec![*kind],
            SelectionDecision::Evaluate(kinds) => kinds.clone(),
        }
    }
}

/// Select candidates for one profiled series.
///
/// `hosted_available` appends the hosted model to evaluated shortlists; it
/// never overrides the forced or fallback routes.
pub fn select_candidates(profile: &SeriesProfile, hosted_available: bool) -> SelectionDecision {
    if profile.is_intermittent {
        return SelectionDecision::Forced(ModelKind::CrostonSba);
    }
    if profile.history_length < MIN_HISTORY_FOR_EVALUATION {
        return SelectionDecision::Fallback(ModelKind::AutoEts);
    }

    let mut candidates = if profile.seasonality_strength > SEASONALITY_SHORTLIST_THRESHOLD {
        vec![ModelKind::AutoEts, ModelKind::AutoTheta, ModelKind::GradientBoost]
    } else if profile.trend_strength > TREND_SHORTLIST_THRESHOLD {
        vec![ModelKind::AutoAr, ModelKind::AutoEts, ModelKind::AutoTheta]
    } else {
        vec![
            ModelKind::AutoAr,
            ModelKind::AutoEts,
            ModelKind::AutoTheta,
            ModelKind::GradientBoost,
        ]
    };
    candidates.push(ModelKind::SeasonalNaive);
    if hosted_available {
        candidates.push(ModelKind::Hosted);
    }
    SelectionDecision::Evaluate(candidates)
}
