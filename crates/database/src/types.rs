// In crates/database/src/types.rs

use chrono::{DateTime, Utc};
use core_types::{SignalKind, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A stored signal still waiting for its horizon returns.
#[derive(Debug, Clone)]
pub struct PendingSignal {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    pub kind: SignalKind,
    pub price: Decimal,
}

/// Horizon prices and returns to write back onto a stored signal.
#[derive(Debug, Clone, Default)]
pub struct BacktestFill {
    pub price_7d: Option<f64>,
    pub price_14d: Option<f64>,
    pub price_30d: Option<f64>,
    pub return_7d: Option<f64>,
    pub return_14d: Option<f64>,
    pub return_30d: Option<f64>,
    /// Whether the 7-day return was positive, when known.
    pub is_successful: Option<bool>,
}

/// Aggregate 7-day statistics for one coin/signal-kind pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalStatistics {
    pub total: i64,
    pub wins: i64,
    pub losses: i64,
    pub win_rate_pct: f64,
    pub avg_return_pct: f64,
    pub min_return_pct: f64,
    pub max_return_pct: f64,
    /// Half the min-to-max spread, a crude volatility proxy.
    pub volatility_pct: f64,
}

/// The outcome of scanning stored statistics for overfitting smells.
#[derive(Debug, Clone, Default)]
pub struct OverfittingReport {
    /// Additive risk score; anything at 2 or above deserves attention.
    pub risk_level: u32,
    pub warnings: Vec<String>,
}

/// Scans aggregate statistics for the classic signs of an overfit strategy:
/// tiny samples, implausible win rates, wild swings, and a lopsided buy/sell
/// mix. Purely heuristic.
pub fn overfitting_warnings(stats: &HashMap<String, SignalStatistics>) -> OverfittingReport {
    let mut report = OverfittingReport::default();

    if stats.is_empty() {
        report.warnings.push("No backtest data yet".to_string());
        return report;
    }

    let total_signals: i64 = stats.values().map(|s| s.total).sum();
    if total_signals < 10 {
        report.warnings.push(format!(
            "Sample too small ({total_signals} signals), statistics are meaningless"
        ));
        report.risk_level += 2;
    } else if total_signals < 30 {
        report.warnings.push(format!(
            "Sample on the small side ({total_signals} signals), low confidence"
        ));
        report.risk_level += 1;
    }

    let mut keys: Vec<&String> = stats.keys().collect();
    keys.sort();

    for key in &keys {
        let s = &stats[*key];
        if s.total >= 10 && s.win_rate_pct > 80.0 {
            report.warnings.push(format!(
                "{key} win rate suspiciously high ({:.1}%), possible overfit",
                s.win_rate_pct
            ));
            report.risk_level += 1;
        } else if s.total >= 10 && s.win_rate_pct < 30.0 {
            report.warnings.push(format!(
                "{key} win rate very low ({:.1}%), strategy ineffective",
                s.win_rate_pct
            ));
            report.risk_level += 1;
        }
    }

    for key in &keys {
        let s = &stats[*key];
        if s.volatility_pct > 30.0 {
            report.warnings.push(format!(
                "{key} returns swing widely ({:.1}%), high risk",
                s.volatility_pct
            ));
            report.risk_level += 1;
        }
    }

    let buys: i64 = stats
        .iter()
        .filter(|(k, _)| k.contains("BUY"))
        .map(|(_, s)| s.total)
        .sum();
    let sells: i64 = stats
        .iter()
        .filter(|(k, _)| k.contains("SELL"))
        .map(|(_, s)| s.total)
        .sum();
    if buys > 0 && sells > 0 {
        let ratio = buys as f64 / sells as f64;
        if ratio > 3.0 {
            report.warnings.push(format!(
                "Buy/sell balance is heavily skewed ({ratio:.1}:1)"
            ));
            report.risk_level += 1;
        }
    }

    report
}
