// In crates/analytics/src/types.rs

use chrono::NaiveDate;
use core_types::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a replayed position left the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Held to the end of the longest horizon.
    Hold,
    StopLoss,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Hold => f.write_str("hold"),
            ExitReason::StopLoss => f.write_str("stop_loss"),
        }
    }
}

/// Gross and net return recorded at one configured holding horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonReturn {
    pub days: u32,
    pub gross_pct: f64,
    pub net_pct: f64,
}

/// The full replay result for one historical signal. Read-only once computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalOutcome {
    pub symbol: Symbol,
    pub signal_date: NaiveDate,
    pub entry_price: Decimal,
    /// Horizons reached before the exit, in ascending day order.
    pub horizon_returns: Vec<HorizonReturn>,
    pub exit_reason: ExitReason,
    pub exit_price: Decimal,
    /// Days after entry at which the walk ended.
    pub exit_day: u32,
    /// Realized return at the exit, before costs.
    pub gross_return_pct: f64,
    /// Realized return after the round-trip cost.
    pub net_return_pct: f64,
    /// Worst drawdown from the running peak, as a negative percentage.
    pub max_drawdown_pct: f64,
    /// Round-trip trading cost applied to this signal, in percent.
    pub total_cost_pct: f64,
}

/// Per-horizon aggregate statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonStats {
    pub days: u32,
    pub sample_size: usize,
    pub avg_net_pct: f64,
    pub max_net_pct: f64,
    pub min_net_pct: f64,
    pub win_rate_pct: f64,
}

/// The aggregate report over one backtest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestReport {
    pub signal_count: usize,
    pub stop_count: usize,
    pub stop_rate_pct: f64,
    /// Share of signals whose realized net return was positive.
    pub win_rate_pct: f64,
    pub avg_net_return_pct: f64,
    pub min_net_return_pct: f64,
    pub max_net_return_pct: f64,
    pub avg_gross_return_pct: f64,
    pub min_gross_return_pct: f64,
    pub max_gross_return_pct: f64,
    /// Total cost divided by total gross return, in percent.
    pub cost_drag_pct: f64,
    pub avg_max_drawdown_pct: f64,
    pub horizons: Vec<HorizonStats>,
}

/// Heuristic overfitting grade from the walk-forward split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverfitRisk {
    Low,
    Medium,
    High,
}

impl fmt::Display for OverfitRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverfitRisk::Low => f.write_str("LOW"),
            OverfitRisk::Medium => f.write_str("MEDIUM"),
            OverfitRisk::High => f.write_str("HIGH"),
        }
    }
}

/// Train/test comparison over a chronological split of the outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub train_count: usize,
    pub test_count: usize,
    pub train_win_rate_pct: f64,
    pub test_win_rate_pct: f64,
    pub train_avg_return_pct: f64,
    pub test_avg_return_pct: f64,
    /// Train average return minus test average return.
    pub degradation_pct: f64,
    /// Train win rate minus test win rate, in percentage points.
    pub win_rate_drop_pct: f64,
    pub risk: OverfitRisk,
    /// Raised when the win rate drops by more than ten points out of sample.
    pub win_rate_flag: bool,
}
