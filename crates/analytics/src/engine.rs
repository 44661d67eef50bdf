// In crates/analytics/src/engine.rs

use crate::types::{
    BacktestReport, ExitReason, HorizonStats, OverfitRisk, SignalOutcome, ValidationReport,
};

/// Degradation above this marks the run as HIGH overfitting risk.
const DEGRADATION_HIGH_PCT: f64 = 2.0;
/// Degradation above this (but below HIGH) marks MEDIUM risk.
const DEGRADATION_MEDIUM_PCT: f64 = 1.0;
/// An out-of-sample win-rate drop beyond this many points raises a flag.
const WIN_RATE_DROP_FLAG_PCT: f64 = 10.0;

/// The engine responsible for aggregating replay outcomes into reports.
///
/// The thresholds used by the walk-forward validation are heuristics carried
/// over from live operation of the strategy; they carry no statistical
/// guarantee and are deliberately kept as plain constants.
#[derive(Default)]
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregates a set of signal outcomes into the run report.
    pub fn report(&self, outcomes: &[SignalOutcome], hold_days: &[u32]) -> BacktestReport {
        let mut report = BacktestReport::default();
        if outcomes.is_empty() {
            return report;
        }

        report.signal_count = outcomes.len();
        report.stop_count = outcomes
            .iter()
            .filter(|o| o.exit_reason == ExitReason::StopLoss)
            .count();
        report.stop_rate_pct = report.stop_count as f64 / report.signal_count as f64 * 100.0;

        let nets: Vec<f64> = outcomes.iter().map(|o| o.net_return_pct).collect();
        let grosses: Vec<f64> = outcomes.iter().map(|o| o.gross_return_pct).collect();

        let wins = nets.iter().filter(|r| **r > 0.0).count();
        report.win_rate_pct = wins as f64 / nets.len() as f64 * 100.0;

        report.avg_net_return_pct = mean(&nets);
        report.min_net_return_pct = fold_min(&nets);
        report.max_net_return_pct = fold_max(&nets);
        report.avg_gross_return_pct = mean(&grosses);
        report.min_gross_return_pct = fold_min(&grosses);
        report.max_gross_return_pct = fold_max(&grosses);

        let total_cost: f64 = outcomes.iter().map(|o| o.total_cost_pct).sum();
        let total_gross: f64 = grosses.iter().sum();
        report.cost_drag_pct = if total_gross.abs() > f64::EPSILON {
            total_cost / total_gross * 100.0
        } else {
            0.0
        };

        report.avg_max_drawdown_pct =
            mean(&outcomes.iter().map(|o| o.max_drawdown_pct).collect::<Vec<_>>());

        // Per-horizon breakdown; a horizon the walk never reached simply has
        // a smaller sample.
        for &days in hold_days {
            let horizon_nets: Vec<f64> = outcomes
                .iter()
                .flat_map(|o| &o.horizon_returns)
                .filter(|h| h.days == days)
                .map(|h| h.net_pct)
                .collect();
            if horizon_nets.is_empty() {
                continue;
            }
            let wins = horizon_nets.iter().filter(|r| **r > 0.0).count();
            report.horizons.push(HorizonStats {
                days,
                sample_size: horizon_nets.len(),
                avg_net_pct: mean(&horizon_nets),
                max_net_pct: fold_max(&horizon_nets),
                min_net_pct: fold_min(&horizon_nets),
                win_rate_pct: wins as f64 / horizon_nets.len() as f64 * 100.0,
            });
        }

        report
    }

    /// Walk-forward validation: chronological split, no shuffling.
    ///
    /// Returns `None` when either side of the split would be empty.
    pub fn validate(
        &self,
        outcomes: &[SignalOutcome],
        train_ratio: f64,
    ) -> Option<ValidationReport> {
        if outcomes.len() < 2 {
            return None;
        }

        let mut sorted: Vec<&SignalOutcome> = outcomes.iter().collect();
        sorted.sort_by_key(|o| o.signal_date);

        let split = (sorted.len() as f64 * train_ratio) as usize;
        if split == 0 || split == sorted.len() {
            return None;
        }
        let (train, test) = sorted.split_at(split);

        let train_returns: Vec<f64> = train.iter().map(|o| o.net_return_pct).collect();
        let test_returns: Vec<f64> = test.iter().map(|o| o.net_return_pct).collect();

        let train_avg = mean(&train_returns);
        let test_avg = mean(&test_returns);
        let train_win = win_rate(&train_returns);
        let test_win = win_rate(&test_returns);

        let degradation = train_avg - test_avg;
        let win_rate_drop = train_win - test_win;

        let risk = if degradation > DEGRADATION_HIGH_PCT {
            OverfitRisk::High
        } else if degradation > DEGRADATION_MEDIUM_PCT {
            OverfitRisk::Medium
        } else {
            OverfitRisk::Low
        };

        Some(ValidationReport {
            train_count: train.len(),
            test_count: test.len(),
            train_win_rate_pct: train_win,
            test_win_rate_pct: test_win,
            train_avg_return_pct: train_avg,
            test_avg_return_pct: test_avg,
            degradation_pct: degradation,
            win_rate_drop_pct: win_rate_drop,
            risk,
            win_rate_flag: win_rate_drop > WIN_RATE_DROP_FLAG_PCT,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn win_rate(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|r| **r > 0.0).count() as f64 / values.len() as f64 * 100.0
}

fn fold_min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn fold_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HorizonReturn;
    use core_types::Symbol;
    use rust_decimal_macros::dec;

    fn outcome(date: &str, net: f64, reason: ExitReason) -> SignalOutcome {
        SignalOutcome {
            symbol: Symbol::new("BTC"),
            signal_date: date.parse().unwrap(),
            entry_price: dec!(100),
            horizon_returns: vec![HorizonReturn {
                days: 7,
                gross_pct: net + 0.2,
                net_pct: net,
            }],
            exit_reason: reason,
            exit_price: dec!(100),
            exit_day: 30,
            gross_return_pct: net + 0.2,
            net_return_pct: net,
            max_drawdown_pct: -8.0,
            total_cost_pct: 0.2,
        }
    }

    #[test]
    fn report_aggregates_wins_stops_and_drag() {
        let outcomes = vec![
            outcome("2024-01-01", 10.0, ExitReason::Hold),
            outcome("2024-01-05", -4.0, ExitReason::StopLoss),
            outcome("2024-01-09", 2.0, ExitReason::Hold),
            outcome("2024-01-13", -1.0, ExitReason::StopLoss),
        ];
        let report = AnalyticsEngine::new().report(&outcomes, &[7]);

        assert_eq!(report.signal_count, 4);
        assert_eq!(report.stop_count, 2);
        assert!((report.stop_rate_pct - 50.0).abs() < 1e-9);
        assert!((report.win_rate_pct - 50.0).abs() < 1e-9);
        assert!((report.avg_net_return_pct - 1.75).abs() < 1e-9);
        assert!((report.min_net_return_pct - (-4.0)).abs() < 1e-9);
        assert!((report.max_net_return_pct - 10.0).abs() < 1e-9);
        // 4 * 0.2 cost against 7.8 total gross.
        assert!((report.cost_drag_pct - (0.8 / 7.8 * 100.0)).abs() < 1e-9);
        assert_eq!(report.horizons.len(), 1);
        assert_eq!(report.horizons[0].sample_size, 4);
    }

    #[test]
    fn empty_outcomes_produce_an_empty_report() {
        let report = AnalyticsEngine::new().report(&[], &[7, 14]);
        assert_eq!(report.signal_count, 0);
        assert!(report.horizons.is_empty());
    }

    #[test]
    fn split_is_chronological_and_exhaustive() {
        // Outcomes arrive shuffled; the split must re-sort by date.
        let outcomes = vec![
            outcome("2024-03-01", 1.0, ExitReason::Hold),
            outcome("2024-01-01", 8.0, ExitReason::Hold),
            outcome("2024-04-01", -2.0, ExitReason::Hold),
            outcome("2024-02-01", 6.0, ExitReason::Hold),
            outcome("2024-05-01", -3.0, ExitReason::Hold),
        ];
        let validation = AnalyticsEngine::new().validate(&outcomes, 0.7).unwrap();

        assert_eq!(validation.train_count + validation.test_count, 5);
        assert_eq!(validation.train_count, 3);
        // Train = Jan..Mar (8, 6, 1), test = Apr..May (-2, -3).
        assert!((validation.train_avg_return_pct - 5.0).abs() < 1e-9);
        assert!((validation.test_avg_return_pct - (-2.5)).abs() < 1e-9);
        assert!((validation.degradation_pct - 7.5).abs() < 1e-9);
        assert_eq!(validation.risk, OverfitRisk::High);
        // 100% train wins vs 0% test wins.
        assert!(validation.win_rate_flag);
    }

    #[test]
    fn degradation_grades_follow_the_heuristic_thresholds() {
        let engine = AnalyticsEngine::new();

        // Identical halves: no degradation.
        let flat = vec![
            outcome("2024-01-01", 3.0, ExitReason::Hold),
            outcome("2024-02-01", 3.0, ExitReason::Hold),
            outcome("2024-03-01", 3.0, ExitReason::Hold),
            outcome("2024-04-01", 3.0, ExitReason::Hold),
        ];
        assert_eq!(engine.validate(&flat, 0.5).unwrap().risk, OverfitRisk::Low);

        // Train 4.5 avg, test 3.0 avg: degradation 1.5 -> MEDIUM.
        let medium = vec![
            outcome("2024-01-01", 4.0, ExitReason::Hold),
            outcome("2024-02-01", 5.0, ExitReason::Hold),
            outcome("2024-03-01", 3.0, ExitReason::Hold),
            outcome("2024-04-01", 3.0, ExitReason::Hold),
        ];
        assert_eq!(
            engine.validate(&medium, 0.5).unwrap().risk,
            OverfitRisk::Medium
        );
    }

    #[test]
    fn validation_declines_degenerate_splits() {
        let engine = AnalyticsEngine::new();
        assert!(engine.validate(&[], 0.7).is_none());
        let one = vec![outcome("2024-01-01", 1.0, ExitReason::Hold)];
        assert!(engine.validate(&one, 0.7).is_none());
        let two = vec![
            outcome("2024-01-01", 1.0, ExitReason::Hold),
            outcome("2024-02-01", 1.0, ExitReason::Hold),
        ];
        // ratio 0 or 1 would leave a side empty.
        assert!(engine.validate(&two, 0.0).is_none());
        assert!(engine.validate(&two, 1.0).is_none());
    }
}
