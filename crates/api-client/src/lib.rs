// In crates/api-client/src/lib.rs

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Candle, LongShortRatio, Symbol};
use rust_decimal::Decimal;
use serde_json::Value;

use app_config::ExchangeSettings;

pub mod binance;
pub mod error;
pub mod history;
pub mod okx;
pub mod sentiment;
pub mod types;

// Re-export public types
pub use binance::BinanceClient;
pub use error::{Error, Result};
pub use history::PriceHistoryClient;
pub use okx::OkxClient;
pub use sentiment::FearGreedClient;

/// The capability contract every supported exchange fulfils.
///
/// Only public market-data endpoints are used; nothing here signs requests or
/// places orders. A lookup that the venue cannot answer resolves to `Ok(None)`
/// so one missing metric never fails a whole snapshot.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// The name of the exchange backing this source.
    fn name(&self) -> &'static str;

    /// The latest spot price for `symbol`, quoted in USDT.
    async fn spot_price(&self, symbol: &Symbol) -> Result<Option<Decimal>>;

    /// The current perpetual funding rate for `symbol`, as a percentage.
    async fn funding_rate(&self, symbol: &Symbol) -> Result<Option<f64>>;

    /// The latest long/short account ratio for `symbol`.
    async fn long_short_ratio(&self, symbol: &Symbol) -> Result<Option<LongShortRatio>>;

    /// Historical candles for `symbol` between `start` and `end`, oldest first.
    async fn historical_candles(
        &self,
        symbol: &Symbol,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>>;
}

/// Creates the market-data source named in the configuration.
///
/// Exchanges are variants behind the capability trait, selected here at
/// startup rather than through an inheritance hierarchy.
pub fn create_market_source(settings: &ExchangeSettings) -> Result<Box<dyn MarketDataSource>> {
    match settings.name.to_lowercase().as_str() {
        "okx" => Ok(Box::new(OkxClient::new())),
        "binance" => Ok(Box::new(BinanceClient::new())),
        other => Err(Error::UnsupportedExchange(other.to_string())),
    }
}

/// Bounded retry for outbound calls: a fixed number of attempts with a fixed
/// delay in between.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Fetches a URL and parses the body as JSON, retrying per `policy`.
pub(crate) async fn fetch_json(
    http_client: &reqwest::Client,
    policy: &RetryPolicy,
    url: &str,
) -> Result<Value> {
    let mut last_error: Option<Error> = None;

    for attempt in 1..=policy.max_attempts {
        match http_client.get(url).send().await {
            Ok(response) => match response.json::<Value>().await {
                Ok(value) => return Ok(value),
                Err(e) => last_error = Some(Error::RequestFailed(e)),
            },
            Err(e) => last_error = Some(Error::RequestFailed(e)),
        }
        if attempt < policy.max_attempts {
            tracing::warn!(url, attempt, "Request failed, retrying");
            tokio::time::sleep(policy.delay).await;
        }
    }

    Err(last_error.unwrap_or_else(|| Error::CustomError("request never attempted".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_selects_the_configured_exchange() {
        let okx = create_market_source(&ExchangeSettings {
            name: "okx".to_string(),
        })
        .unwrap();
        assert_eq!(okx.name(), "okx");

        let binance = create_market_source(&ExchangeSettings {
            name: "Binance".to_string(),
        })
        .unwrap();
        assert_eq!(binance.name(), "binance");

        assert!(
            create_market_source(&ExchangeSettings {
                name: "kraken".to_string(),
            })
            .is_err()
        );
    }
}
