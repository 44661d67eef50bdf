// In crates/api-client/src/history.rs

use chrono::{DateTime, Utc};
use core_types::{PricePoint, PriceSeries, Symbol};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

use crate::types::CcResponse;
use crate::{Error, Result, RetryPolicy, fetch_json};

const BASE_URL: &str = "https://min-api.cryptocompare.com";

/// Client for CryptoCompare daily OHLC history, used to feed the backtester.
#[derive(Debug, Clone)]
pub struct PriceHistoryClient {
    http_client: reqwest::Client,
    retry: RetryPolicy,
    base_url: String,
}

impl PriceHistoryClient {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Fetches up to `days` daily closes for `symbol`, oldest first.
    ///
    /// Days with a zero close are dropped; the provider pads missing history
    /// with zeros.
    pub async fn daily_series(&self, symbol: &Symbol, days: usize) -> Result<PriceSeries> {
        let url = format!(
            "{}/data/v2/histoday?fsym={}&tsym=USD&limit={}",
            self.base_url,
            symbol.0.to_uppercase(),
            days
        );
        let value = fetch_json(&self.http_client, &self.retry, &url).await?;
        let response: CcResponse = serde_json::from_value(value)?;

        if response.response != "Success" {
            return Err(Error::ApiError {
                code: response.response,
                msg: response.message,
            });
        }

        let points: Vec<PricePoint> = response
            .data
            .map(|d| d.data)
            .unwrap_or_default()
            .iter()
            .filter(|day| day.close > 0.0)
            .filter_map(|day| {
                let date = DateTime::<Utc>::from_timestamp(day.time, 0)?.date_naive();
                Some(PricePoint {
                    date,
                    open: Decimal::from_f64(day.open),
                    high: Decimal::from_f64(day.high),
                    low: Decimal::from_f64(day.low),
                    close: Decimal::from_f64(day.close)?,
                    volume: Decimal::from_f64(day.volumeto),
                })
            })
            .collect();

        Ok(PriceSeries::from_points(points))
    }
}

impl Default for PriceHistoryClient {
    fn default() -> Self {
        Self::new()
    }
}
