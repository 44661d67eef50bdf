// In crates/signals/src/types.rs

use serde::{Deserialize, Serialize};

/// Decision thresholds for the signal engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSettings {
    /// Fear & Greed value below which buy candidates appear.
    #[serde(default = "default_fear_buy")]
    pub fear_buy: f64,
    /// Fear & Greed value above which sell candidates appear.
    #[serde(default = "default_greed_sell")]
    pub greed_sell: f64,
    /// Funding-rate percentile below which a buy is considered extreme panic.
    #[serde(default = "default_funding_panic")]
    pub funding_panic_percentile: f64,
    /// Funding-rate percentile above which a sell is considered overheated.
    #[serde(default = "default_funding_greed")]
    pub funding_greed_percentile: f64,
    /// Long/short ratio below which shorts are considered extremely dominant.
    #[serde(default = "default_longshort_extreme")]
    pub longshort_extreme: f64,
    /// Minimum history size before a percentile is trusted at all.
    #[serde(default = "default_min_percentile_samples")]
    pub min_percentile_samples: usize,
}

fn default_fear_buy() -> f64 {
    25.0
}
fn default_greed_sell() -> f64 {
    75.0
}
fn default_funding_panic() -> f64 {
    15.0
}
fn default_funding_greed() -> f64 {
    85.0
}
fn default_longshort_extreme() -> f64 {
    0.8
}
fn default_min_percentile_samples() -> usize {
    24
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            fear_buy: default_fear_buy(),
            greed_sell: default_greed_sell(),
            funding_panic_percentile: default_funding_panic(),
            funding_greed_percentile: default_funding_greed(),
            longshort_extreme: default_longshort_extreme(),
            min_percentile_samples: default_min_percentile_samples(),
        }
    }
}

/// Settings for the multi-period reversal confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversalSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How many consecutive historical moves must confirm the inflection.
    #[serde(default = "default_consecutive_periods")]
    pub consecutive_periods: usize,
    /// Samples this close to "now" are treated as the current reading and
    /// excluded from the history window.
    #[serde(default = "default_sample_tolerance")]
    pub sample_tolerance_secs: i64,
}

fn default_true() -> bool {
    true
}
fn default_consecutive_periods() -> usize {
    2
}
fn default_sample_tolerance() -> i64 {
    5
}

impl Default for ReversalSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            consecutive_periods: default_consecutive_periods(),
            sample_tolerance_secs: default_sample_tolerance(),
        }
    }
}

/// Settings for the cross-asset resonance upgrade pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResonanceSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Minimum number of simultaneously signalling coins.
    #[serde(default = "default_min_coins")]
    pub min_coins: usize,
}

fn default_min_coins() -> usize {
    2
}

impl Default for ResonanceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            min_coins: default_min_coins(),
        }
    }
}

/// Feature toggles for the individual strategy conditions. Fewer enabled
/// conditions means less curve fitting; see [`crate::complexity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyToggles {
    #[serde(default = "default_true")]
    pub use_fear_greed: bool,
    #[serde(default = "default_true")]
    pub use_reversal: bool,
    #[serde(default = "default_true")]
    pub use_funding_percentile: bool,
    #[serde(default = "default_true")]
    pub use_longshort: bool,
    #[serde(default = "default_true")]
    pub use_resonance: bool,
    #[serde(default = "default_true")]
    pub use_sell_signal: bool,
}

impl Default for StrategyToggles {
    fn default() -> Self {
        Self {
            use_fear_greed: true,
            use_reversal: true,
            use_funding_percentile: true,
            use_longshort: true,
            use_resonance: true,
            use_sell_signal: true,
        }
    }
}

/// Everything the signal engine needs, aggregated by the host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalSettings {
    #[serde(default)]
    pub thresholds: ThresholdSettings,
    #[serde(default)]
    pub reversal: ReversalSettings,
    #[serde(default)]
    pub resonance: ResonanceSettings,
    #[serde(default)]
    pub strategy: StrategyToggles,
}
