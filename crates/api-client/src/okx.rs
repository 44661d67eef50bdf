// In crates/api-client/src/okx.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Candle, LongShortRatio, Symbol};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::types::OkxEnvelope;
use crate::{Error, MarketDataSource, Result, RetryPolicy, fetch_json};

const BASE_URL: &str = "https://www.okx.com";

/// Market-data source backed by OKX public endpoints.
#[derive(Debug, Clone)]
pub struct OkxClient {
    http_client: reqwest::Client,
    retry: RetryPolicy,
    base_url: String,
}

impl OkxClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
            base_url,
        }
    }

    /// Fetches an endpoint and unwraps the OKX envelope.
    async fn get_data(&self, path_and_query: &str) -> Result<Vec<Value>> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let value = fetch_json(&self.http_client, &self.retry, &url).await?;
        let envelope: OkxEnvelope = serde_json::from_value(value)?;
        if envelope.code != "0" {
            return Err(Error::ApiError {
                code: envelope.code,
                msg: envelope.msg,
            });
        }
        Ok(envelope.data)
    }
}

impl Default for OkxClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataSource for OkxClient {
    fn name(&self) -> &'static str {
        "okx"
    }

    async fn spot_price(&self, symbol: &Symbol) -> Result<Option<Decimal>> {
        let data = self
            .get_data(&format!("/api/v5/market/ticker?instId={}-USDT", symbol.0))
            .await?;
        let price = data
            .first()
            .and_then(|t| t.get("last"))
            .and_then(Value::as_str)
            .and_then(|s| Decimal::from_str(s).ok());
        Ok(price)
    }

    async fn funding_rate(&self, symbol: &Symbol) -> Result<Option<f64>> {
        let data = self
            .get_data(&format!(
                "/api/v5/public/funding-rate?instId={}-USDT-SWAP",
                symbol.0
            ))
            .await?;
        let rate = data
            .first()
            .and_then(|t| t.get("fundingRate"))
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok())
            // The venue reports a fraction; we work in percent.
            .map(|r| (r * 100.0 * 10_000.0).round() / 10_000.0);
        Ok(rate)
    }

    async fn long_short_ratio(&self, symbol: &Symbol) -> Result<Option<LongShortRatio>> {
        let data = self
            .get_data(&format!(
                "/api/v5/rubik/stat/contracts/long-short-account-ratio?ccy={}&period=1H",
                symbol.0
            ))
            .await?;
        // Rubik rows are [ts, ratio]; only the ratio is reported, the long and
        // short percentages are derived from it.
        let ratio = data
            .first()
            .and_then(Value::as_array)
            .and_then(|row| row.get(1))
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok());
        Ok(ratio.map(|ratio| {
            let short_pct = 1.0 / (ratio + 1.0) * 100.0;
            LongShortRatio {
                long_pct: ((100.0 - short_pct) * 10.0).round() / 10.0,
                short_pct: (short_pct * 10.0).round() / 10.0,
                ratio: (ratio * 100.0).round() / 100.0,
            }
        }))
    }

    async fn historical_candles(
        &self,
        symbol: &Symbol,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let data = self
            .get_data(&format!(
                "/api/v5/market/history-candles?instId={}-USDT&bar={}&after={}&before={}&limit=300",
                symbol.0,
                interval,
                start.timestamp_millis(),
                end.timestamp_millis()
            ))
            .await?;

        let mut candles: Vec<Candle> = data
            .iter()
            .filter_map(|row| {
                let row = row.as_array()?;
                let millis: i64 = row.first()?.as_str()?.parse().ok()?;
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
        // OKX returns newest first.
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

fn decimal_field(row: &[Value], index: usize) -> Option<Decimal> {
    row.get(index)
        .and_then(Value::as_str)
        .and_then(|s| Decimal::from_str(s).ok())
}
