// In crates/app-config/src/types.rs

use serde::Deserialize;

use backtester::BacktestSettings;
use risk::{PositionSettings, RiskSettings};
use signals::{
    ResonanceSettings, ReversalSettings, SignalSettings, StrategyToggles, ThresholdSettings,
};

/// The full application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// The application's general settings.
    pub app: AppSettings,
    /// Polling cadence and file locations.
    pub runtime: RuntimeSettings,
    /// Which market-data source to use.
    pub exchange: ExchangeSettings,
    /// Settings for the database connection.
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telegram: TelegramSettings,

    /// The coins the monitor watches.
    #[serde(default)]
    pub coins: Vec<CoinConfig>,

    #[serde(default)]
    pub thresholds: ThresholdSettings,
    #[serde(default)]
    pub reversal: ReversalSettings,
    #[serde(default)]
    pub resonance: ResonanceSettings,
    #[serde(default)]
    pub strategy: StrategyToggles,
    #[serde(default)]
    pub risk: RiskSettings,
    #[serde(default)]
    pub position: PositionSettings,
    #[serde(default)]
    pub backtest: BacktestSettings,
}

impl Settings {
    /// The signal-engine slice of the configuration.
    pub fn signal_settings(&self) -> SignalSettings {
        SignalSettings {
            thresholds: self.thresholds.clone(),
            reversal: self.reversal.clone(),
            resonance: self.resonance.clone(),
            strategy: self.strategy.clone(),
        }
    }

    /// Symbols of all enabled coins, in configuration order.
    pub fn enabled_coins(&self) -> Vec<String> {
        self.coins
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.symbol.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    pub environment: String,
    /// The log level for the application.
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSettings {
    /// Seconds between polling cycles.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Seconds to back off after a failed cycle.
    #[serde(default = "default_error_retry")]
    pub error_retry_secs: u64,
    /// Where the tracked positions are persisted.
    #[serde(default = "default_positions_file")]
    pub positions_file: String,
}

fn default_check_interval() -> u64 {
    1800
}
fn default_error_retry() -> u64 {
    300
}
fn default_positions_file() -> String {
    ".positions.json".to_string()
}

/// Which exchange backs the market-data source.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeSettings {
    /// "okx" or "binance".
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// The connection URL for the SQLite database.
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

/// Configuration for a single monitored coin.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinConfig {
    pub symbol: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_configuration_fills_in_all_documented_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [app]
            environment = "development"
            log_level = "info"

            [runtime]

            [exchange]
            name = "okx"

            [database]
            url = "sqlite://sentiment.db"

            [[coins]]
            symbol = "BTC"

            [[coins]]
            symbol = "DOGE"
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(settings.enabled_coins(), vec!["BTC"]);
        assert_eq!(settings.runtime.check_interval_secs, 1800);
        assert!((settings.thresholds.fear_buy - 25.0).abs() < 1e-12);
        assert!((settings.thresholds.greed_sell - 75.0).abs() < 1e-12);
        assert_eq!(settings.reversal.consecutive_periods, 2);
        assert_eq!(settings.reversal.sample_tolerance_secs, 5);
        assert!((settings.risk.stop_loss_pct - (-15.0)).abs() < 1e-12);
        assert!((settings.risk.initial_stop - (-20.0)).abs() < 1e-12);
        assert!(!settings.position.pyramiding.enabled);
        assert!((settings.position.pyramiding.min_profit_pct - 5.0).abs() < 1e-12);
        assert_eq!(settings.backtest.hold_days, vec![7, 14, 30]);
        assert!(!settings.telegram.enabled);
    }

    #[test]
    fn explicit_values_override_the_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [app]
            environment = "production"
            log_level = "warn"

            [runtime]
            check_interval_secs = 600

            [exchange]
            name = "binance"

            [database]
            url = "sqlite://sentiment.db"

            [thresholds]
            fear_buy = 20.0

            [risk]
            stop_loss_type = "fixed"
            initial_stop = -10.0

            [backtest]
            hold_days = [5, 10]
            validate_out_of_sample = true
            "#,
        )
        .unwrap();

        assert!((settings.thresholds.fear_buy - 20.0).abs() < 1e-12);
        assert_eq!(settings.risk.stop_loss_type, risk::StopPolicy::Fixed);
        assert_eq!(settings.backtest.hold_days, vec![5, 10]);
        assert!(settings.backtest.validate_out_of_sample);
    }
}
