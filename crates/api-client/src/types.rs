// In crates/api-client/src/types.rs

use serde::Deserialize;

/// The standard OKX response envelope: `code` is "0" on success and the
/// payload shape inside `data` varies per endpoint.
#[derive(Debug, Deserialize)]
pub struct OkxEnvelope {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

/// Binance spot ticker price.
#[derive(Debug, Deserialize)]
pub struct BinanceTicker {
    pub price: String,
}

/// One entry of the Binance funding-rate history.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceFundingRate {
    pub funding_rate: String,
}

/// One entry of the Binance top long/short account ratio series.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceLongShort {
    pub long_account: String,
    pub short_account: String,
}

/// The Fear & Greed index payload from alternative.me.
#[derive(Debug, Deserialize)]
pub struct FngResponse {
    #[serde(default)]
    pub data: Vec<FngEntry>,
}

#[derive(Debug, Deserialize)]
pub struct FngEntry {
    pub value: String,
    pub value_classification: String,
    pub timestamp: String,
}

/// The CryptoCompare daily-history envelope.
#[derive(Debug, Deserialize)]
pub struct CcResponse {
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "Data", default)]
    pub data: Option<CcData>,
}

#[derive(Debug, Deserialize)]
pub struct CcData {
    #[serde(rename = "Data", default)]
    pub data: Vec<CcDay>,
}

#[derive(Debug, Deserialize)]
pub struct CcDay {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volumeto: f64,
}
