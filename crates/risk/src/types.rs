// In crates/risk/src/types.rs

use serde::{Deserialize, Serialize};

/// How the stop line for an open position is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopPolicy {
    /// The stop follows the highest price seen since entry and only ever rises.
    Trailing,
    /// The stop sits at a fixed offset below the entry price.
    Fixed,
}

/// Stop-loss configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSettings {
    #[serde(default = "default_stop_type")]
    pub stop_loss_type: StopPolicy,
    /// Trailing stop distance below the peak, as a negative percentage.
    #[serde(default = "default_stop_pct")]
    pub stop_loss_pct: f64,
    /// Fixed stop distance below the entry, as a negative percentage.
    #[serde(default = "default_initial_stop")]
    pub initial_stop: f64,
    #[serde(default = "default_true")]
    pub notify_on_stop: bool,
}

fn default_stop_type() -> StopPolicy {
    StopPolicy::Trailing
}
fn default_stop_pct() -> f64 {
    -15.0
}
fn default_initial_stop() -> f64 {
    -20.0
}
fn default_true() -> bool {
    true
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            stop_loss_type: default_stop_type(),
            stop_loss_pct: default_stop_pct(),
            initial_stop: default_initial_stop(),
            notify_on_stop: true,
        }
    }
}

/// Pyramiding (adding to a winning position) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PyramidingSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Minimum unrealized profit before an add is allowed, in percent.
    #[serde(default = "default_min_profit")]
    pub min_profit_pct: f64,
}

fn default_min_profit() -> f64 {
    5.0
}

impl Default for PyramidingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            min_profit_pct: default_min_profit(),
        }
    }
}

/// Position-management configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionSettings {
    #[serde(default)]
    pub pyramiding: PyramidingSettings,
}
