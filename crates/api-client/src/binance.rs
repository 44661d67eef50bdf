// In crates/api-client/src/binance.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Candle, LongShortRatio, Symbol};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::types::{BinanceFundingRate, BinanceLongShort, BinanceTicker};
use crate::{MarketDataSource, Result, RetryPolicy, fetch_json};

const SPOT_URL: &str = "https://api.binance.com";
const FUTURES_URL: &str = "https://fapi.binance.com";

/// Market-data source backed by Binance public endpoints. Spot price and
/// klines come from the spot API, funding and long/short data from futures.
#[derive(Debug, Clone)]
pub struct BinanceClient {
    http_client: reqwest::Client,
    retry: RetryPolicy,
    spot_url: String,
    futures_url: String,
}

impl BinanceClient {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
            spot_url: SPOT_URL.to_string(),
            futures_url: FUTURES_URL.to_string(),
        }
    }
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn spot_price(&self, symbol: &Symbol) -> Result<Option<Decimal>> {
        let url = format!(
            "{}/api/v3/ticker/price?symbol={}USDT",
            self.spot_url, symbol.0
        );
        let value = fetch_json(&self.http_client, &self.retry, &url).await?;
        let ticker: BinanceTicker = serde_json::from_value(value)?;
        Ok(Decimal::from_str(&ticker.price).ok())
    }

    async fn funding_rate(&self, symbol: &Symbol) -> Result<Option<f64>> {
        let url = format!(
            "{}/fapi/v1/fundingRate?symbol={}USDT&limit=1",
            self.futures_url, symbol.0
        );
        let value = fetch_json(&self.http_client, &self.retry, &url).await?;
        let rates: Vec<BinanceFundingRate> = serde_json::from_value(value)?;
        let rate = rates
            .first()
            .and_then(|r| r.funding_rate.parse::<f64>().ok())
            .map(|r| (r * 100.0 * 10_000.0).round() / 10_000.0);
        Ok(rate)
    }

    async fn long_short_ratio(&self, symbol: &Symbol) -> Result<Option<LongShortRatio>> {
        let url = format!(
            "{}/futures/data/topLongShortAccountRatio?symbol={}USDT&period=1h&limit=1",
            self.futures_url, symbol.0
        );
        let value = fetch_json(&self.http_client, &self.retry, &url).await?;
        let rows: Vec<BinanceLongShort> = serde_json::from_value(value)?;
        let ratio = rows.first().and_then(|row| {
            let long: f64 = row.long_account.parse().ok()?;
            let short: f64 = row.short_account.parse().ok()?;
            if short <= 0.0 {
                return None;
            }
            Some(LongShortRatio {
                long_pct: (long * 100.0 * 10.0).round() / 10.0,
                short_pct: (short * 100.0 * 10.0).round() / 10.0,
                ratio: (long / short * 100.0).round() / 100.0,
            })
        });
        Ok(ratio)
    }

    async fn historical_candles(
        &self,
        symbol: &Symbol,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let url = format!(
            "{}/api/v3/klines?symbol={}USDT&interval={}&startTime={}&endTime={}&limit=1000",
            self.spot_url,
            symbol.0,
            interval.to_lowercase(),
            start.timestamp_millis(),
            end.timestamp_millis()
        );
        let value = fetch_json(&self.http_client, &self.retry, &url).await?;
        let rows: Vec<Vec<Value>> = serde_json::from_value(value)?;

        let candles = rows
            .iter()
            .filter_map(|row| {
                let millis = row.first()?.as_i64()?;
                Some(Candle {
                    timestamp: DateTime::from_timestamp_millis(millis)?,
                    open: decimal_field(row, 1)?,
                    high: decimal_field(row, 2)?,
                    low: decimal_field(row, 3)?,
                    close: decimal_field(row, 4)?,
                    volume: decimal_field(row, 5)?,
                })
            })
            .collect();
        Ok(candles)
    }
}

fn decimal_field(row: &[Value], index: usize) -> Option<Decimal> {
    row.get(index)
        .and_then(Value::as_str)
        .and_then(|s| Decimal::from_str(s).ok())
}
