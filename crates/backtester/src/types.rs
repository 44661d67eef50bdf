// In crates/backtester/src/types.rs

use serde::{Deserialize, Serialize};

/// Backtest horizons and cost model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// Holding horizons in days; the walk runs to the longest one.
    #[serde(default = "default_hold_days")]
    pub hold_days: Vec<u32>,
    /// One-way trading fee, in percent.
    #[serde(default = "default_fee_rate")]
    pub fee_rate: f64,
    /// Slippage per round trip, in percent.
    #[serde(default = "default_slippage")]
    pub slippage: f64,
    /// Cost of acting one polling interval late, in percent.
    #[serde(default)]
    pub execution_delay: f64,
    /// Chronological share of outcomes used for training in the walk-forward
    /// split.
    #[serde(default = "default_train_test_split")]
    pub train_test_split: f64,
    #[serde(default)]
    pub validate_out_of_sample: bool,
}

fn default_hold_days() -> Vec<u32> {
    vec![7, 14, 30]
}
fn default_fee_rate() -> f64 {
    0.1
}
fn default_slippage() -> f64 {
    0.1
}
fn default_train_test_split() -> f64 {
    0.7
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            hold_days: default_hold_days(),
            fee_rate: default_fee_rate(),
            slippage: default_slippage(),
            execution_delay: 0.0,
            train_test_split: default_train_test_split(),
            validate_out_of_sample: false,
        }
    }
}

impl BacktestSettings {
    /// Round-trip cost applied once per completed trade, in percent:
    /// entry fee + exit fee + slippage + execution delay.
    pub fn total_cost_pct(&self) -> f64 {
        2.0 * self.fee_rate + self.slippage + self.execution_delay
    }

    pub fn max_hold_days(&self) -> u32 {
        self.hold_days.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_cost_counts_the_fee_twice() {
        let settings = BacktestSettings {
            fee_rate: 0.1,
            slippage: 0.1,
            execution_delay: 0.05,
            ..BacktestSettings::default()
        };
        assert!((settings.total_cost_pct() - 0.35).abs() < 1e-12);
    }

    #[test]
    fn defaults_match_the_documented_configuration() {
        let settings = BacktestSettings::default();
        assert_eq!(settings.hold_days, vec![7, 14, 30]);
        assert_eq!(settings.max_hold_days(), 30);
        assert!((settings.train_test_split - 0.7).abs() < 1e-12);
        assert!(!settings.validate_out_of_sample);
    }
}
