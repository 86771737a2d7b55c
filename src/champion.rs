//! Champion selection from backtest records.
//!
//! Candidates are ranked by mean MAPE over their shared backtest windows.
//! When every window has a zero actual MAPE is undefined for all candidates
//! at once (they share windows), so ranking degrades to MAE. Ties keep the
//! earlier candidate in selector order, which makes reruns deterministic.

use crate::cv::CvRecord;
use crate::models::ModelKind;
use crate::utils::metrics::{mae, mape};

/// Metric that ended up ranking the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMetric {
    Mape,
    Mae,
}

/// Winning candidate and its score.
#[derive(Debug, Clone, PartialEq)]
pub struct Champion {
    pub model: ModelKind,
    pub score: f64,
    pub metric: RankingMetric,
}

/// Mean error per candidate, computed over that candidate's records.
fn candidate_errors(records: &[CvRecord], kind: ModelKind) -> Option<(Option<f64>, f64)> {
    let mut actuals = Vec::new();
    let mut predictions = Vec::new();
    for r in records.iter().filter(|r| r.model == kind) {
        actuals.push(r.actual);
        predictions.push(r.predicted);
    }
    if actuals.is_empty() {
        return None;
    }
    Some((mape(&actuals, &predictions), mae(&actuals, &predictions)))
}

/// Pick the champion among `order` from the backtest `records`.
///
/// `None` when no candidate has any record (every candidate failed the
/// backtest); the caller applies the error fallback.
pub fn select_champion(records: &[CvRecord], order: &[ModelKind]) -> Option<Champion> {
    let mut scored: Vec<(ModelKind, Option<f64>, f64)> = Vec::new();
    for &kind in order {
        if let Some((mape_score, mae_score)) = candidate_errors(records, kind) {
            scored.push((kind, mape_score, mae_score));
        }
    }
    if scored.is_empty() {
        return None;
    }

    // All surviving candidates share windows, so MAPE is defined for all of
    // them or for none of them.
    let use_mape = scored.iter().any(|(_, m, _)| m.is_some());
    let metric = if use_mape {
        RankingMetric::Mape
    } else {
        RankingMetric::Mae
    };

    let mut best: Option<Champion> = None;
    for (kind, mape_score, mae_score) in scored {
        let score = match metric {
            RankingMetric::Mape => match mape_score {
                Some(s) => s,
                None => continue,
            },
            RankingMetric::Mae => mae_score,
        };
        if !score.is_finite() {
            continue;
        }
        // Strict comparison keeps the earlier candidate on ties.
        if best.as_ref().map_or(true, |b| score < b.score) {
            best = Some(Champion {
                model: kind,
                score,
                metric,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::test_support::monthly_timestamps;
    use approx::assert_relative_eq;

    fn record(model: ModelKind, window: usize, actual: f64, predicted: f64) -> CvRecord {
        let timestamps = monthly_timestamps(window + 2);
        CvRecord {
            unique_id: "s".to_string(),
            timestamp: timestamps[window + 1],
            cutoff: timestamps[window],
            model,
            actual,
            predicted,
        }
    }

    #[test]
    fn champion_is_the_lowest_mean_mape() {
        let records = vec![
            record(ModelKind::AutoEts, 0, 10.0, 11.0),
            record(ModelKind::AutoEts, 1, 10.0, 9.0),
            record(ModelKind::SeasonalNaive, 0, 10.0, 15.0),
            record(ModelKind::SeasonalNaive, 1, 10.0, 5.0),
        ];
        let champion = select_champion(
            &records,
            &[ModelKind::AutoEts, ModelKind::SeasonalNaive],
        )
        .unwrap();

        assert_eq!(champion.model, ModelKind::AutoEts);
        assert_eq!(champion.metric, RankingMetric::Mape);
        assert_relative_eq!(champion.score, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn ties_keep_selector_order() {
        let records = vec![
            record(ModelKind::AutoTheta, 0, 10.0, 12.0),
            record(ModelKind::AutoEts, 0, 10.0, 12.0),
        ];
        let champion = select_champion(
            &records,
            &[ModelKind::AutoTheta, ModelKind::AutoEts],
        )
        .unwrap();
        assert_eq!(champion.model, ModelKind::AutoTheta);
    }

    #[test]
    fn all_zero_actuals_rank_by_mae() {
        let records = vec![
            record(ModelKind::AutoEts, 0, 0.0, 3.0),
            record(ModelKind::SeasonalNaive, 0, 0.0, 1.0),
        ];
        let champion = select_champion(
            &records,
            &[ModelKind::AutoEts, ModelKind::SeasonalNaive],
        )
        .unwrap();

        assert_eq!(champion.metric, RankingMetric::Mae);
        assert_eq!(champion.model, ModelKind::SeasonalNaive);
        assert_relative_eq!(champion.score, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn no_records_means_no_champion() {
        assert_eq!(select_champion(&[], &[ModelKind::AutoEts]), None);
    }

    #[test]
    fn candidate_without_records_is_ignored() {
        let records = vec![record(ModelKind::AutoEts, 0, 10.0, 11.0)];
        let champion = select_champion(
            &records,
            &[ModelKind::CrostonSba, ModelKind::AutoEts],
        )
        .unwrap();
        assert_eq!(champion.model, ModelKind::AutoEts);
    }
}
