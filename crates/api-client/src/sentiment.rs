// In crates/api-client/src/sentiment.rs

use chrono::{DateTime, Utc};
use core_types::{DailySentiment, SentimentReading};

use crate::types::FngResponse;
use crate::{Result, RetryPolicy, fetch_json};

const BASE_URL: &str = "https://api.alternative.me";

/// Client for the alternative.me Fear & Greed index.
#[derive(Debug, Clone)]
pub struct FearGreedClient {
    http_client: reqwest::Client,
    retry: RetryPolicy,
    base_url: String,
}

impl FearGreedClient {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// The latest index reading, or `None` when the provider has nothing.
    pub async fn latest(&self) -> Result<Option<SentimentReading>> {
        let url = format!("{}/fng/?limit=1", self.base_url);
        let value = fetch_json(&self.http_client, &self.retry, &url).await?;
        let response: FngResponse = serde_json::from_value(value)?;

        Ok(response.data.first().and_then(|entry| {
            let value: f64 = entry.value.parse().ok()?;
            let seconds: i64 = entry.timestamp.parse().ok()?;
            Some(SentimentReading {
                value,
                classification: entry.value_classification.clone(),
                timestamp: DateTime::from_timestamp(seconds, 0)?,
            })
        }))
    }

    /// Daily index history, oldest first, truncated to the last `days` days.
    ///
    /// Entries with unparseable values or timestamps are dropped.
    pub async fn history(&self, days: usize) -> Result<Vec<DailySentiment>> {
        // limit=0 asks the provider for its full history.
        let url = format!("{}/fng/?limit=0", self.base_url);
        let value = fetch_json(&self.http_client, &self.retry, &url).await?;
        let response: FngResponse = serde_json::from_value(value)?;

        let mut records: Vec<DailySentiment> = response
            .data
            .iter()
            .filter_map(|entry| {
                let value: f64 = entry.value.parse().ok()?;
                let seconds: i64 = entry.timestamp.parse().ok()?;
                let date = DateTime::<Utc>::from_timestamp(seconds, 0)?.date_naive();
                Some(DailySentiment {
                    date,
                    value,
                    classification: entry.value_classification.clone(),
                })
            })
            .collect();

        records.sort_by_key(|r| r.date);
        if days > 0 && records.len() > days {
            records.drain(..records.len() - days);
        }
        Ok(records)
    }
}

impl Default for FearGreedClient {
    fn default() -> Self {
        Self::new()
    }
}
