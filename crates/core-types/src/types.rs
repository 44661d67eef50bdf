// In crates/core-types/src/types.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A coin symbol, e.g. "BTC" or "ETH".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single Fear & Greed index reading, as published by the sentiment provider.
///
/// The value is always in `[0, 100]`: low values mean fear, high values greed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub value: f64,
    pub classification: String,
    pub timestamp: DateTime<Utc>,
}

/// A raw sentiment history row as returned by the store.
///
/// The timestamp is kept as the store's original text form; consumers parse it
/// on use and skip rows that do not parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSample {
    pub timestamp: String,
    pub value: f64,
}

/// One day of the sentiment index, used by the historical backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySentiment {
    pub date: NaiveDate,
    pub value: f64,
    pub classification: String,
}

/// Long/short account ratio for a coin's perpetual market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LongShortRatio {
    /// Percentage of accounts positioned long.
    pub long_pct: f64,
    /// Percentage of accounts positioned short.
    pub short_pct: f64,
    /// long / short.
    pub ratio: f64,
}

/// The per-coin slice of a market snapshot. Any field can be missing when the
/// corresponding upstream call failed; a missing value simply removes that
/// feature from the decision, it never fails the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinMetrics {
    pub price: Option<Decimal>,
    /// Funding rate as a percentage (e.g. 0.01 = 0.01%).
    pub funding_rate: Option<f64>,
    pub long_short: Option<LongShortRatio>,
}

/// Everything the signal engine looks at in one polling cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub timestamp: DateTime<Utc>,
    pub fear_greed: Option<SentimentReading>,
    pub coins: HashMap<Symbol, CoinMetrics>,
}

/// The kind of action a signal recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Buy,
    Sell,
    /// A pyramiding add to an already open position.
    Add,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Buy => "BUY",
            SignalKind::Sell => "SELL",
            SignalKind::Add => "ADD",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(SignalKind::Buy),
            "SELL" => Ok(SignalKind::Sell),
            "ADD" => Ok(SignalKind::Add),
            other => Err(Error::UnknownSignalKind(other.to_string())),
        }
    }
}

/// Signal conviction. Totally ordered; a signal's strength is only ever
/// upgraded, never downgraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    Medium,
    Strong,
    Extreme,
}

impl Strength {
    /// One step up the ladder, saturating at `Extreme`.
    pub fn upgraded(self) -> Strength {
        match self {
            Strength::Weak => Strength::Medium,
            Strength::Medium => Strength::Strong,
            Strength::Strong => Strength::Extreme,
            Strength::Extreme => Strength::Extreme,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strength::Weak => "weak",
            Strength::Medium => "medium",
            Strength::Strong => "strong",
            Strength::Extreme => "extreme",
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strength {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weak" => Ok(Strength::Weak),
            "medium" => Ok(Strength::Medium),
            "strong" => Ok(Strength::Strong),
            "extreme" => Ok(Strength::Extreme),
            other => Err(Error::UnknownStrength(other.to_string())),
        }
    }
}

/// A trading signal produced by the signal engine.
///
/// Immutable once the resonance pass has run; persisted by the database layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: Symbol,
    pub kind: SignalKind,
    pub strength: Strength,
    /// Human-readable reasons, in the order they were established.
    pub reasons: Vec<String>,
    /// Tags with set semantics (no duplicates).
    pub tags: Vec<String>,
    pub source_price: Option<Decimal>,
    pub source_sentiment: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    /// Adds a tag unless it is already present.
    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }
}

/// A single daily price point for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Decimal,
    pub volume: Option<Decimal>,
}

/// An intraday candle as returned by an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// A date-indexed daily price history for one asset.
///
/// Supports the "price N days after a given date" lookup the backtester needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: BTreeMap<NaiveDate, PricePoint>,
}

impl PriceSeries {
    pub fn from_points(points: Vec<PricePoint>) -> Self {
        Self {
            points: points.into_iter().map(|p| (p.date, p)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    /// The closing price on exactly `date`, if that day is present.
    pub fn close_on(&self, date: NaiveDate) -> Option<Decimal> {
        self.points.get(&date).map(|p| p.close)
    }

    /// The closing price exactly `days` days after `date`.
    pub fn close_after(&self, date: NaiveDate, days: i64) -> Option<Decimal> {
        self.close_on(date + chrono::Duration::days(days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn point(date: &str, close: Decimal) -> PricePoint {
        PricePoint {
            date: date.parse().unwrap(),
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    #[test]
    fn strength_is_totally_ordered_and_upgrade_saturates() {
        assert!(Strength::Weak < Strength::Medium);
        assert!(Strength::Medium < Strength::Strong);
        assert!(Strength::Strong < Strength::Extreme);
        assert_eq!(Strength::Weak.upgraded(), Strength::Medium);
        assert_eq!(Strength::Extreme.upgraded(), Strength::Extreme);
    }

    #[test]
    fn signal_tags_behave_like_a_set() {
        let mut signal = Signal {
            symbol: Symbol::new("BTC"),
            kind: SignalKind::Buy,
            strength: Strength::Weak,
            reasons: vec![],
            tags: vec!["#watch".to_string()],
            source_price: None,
            source_sentiment: None,
            timestamp: Utc::now(),
        };
        signal.add_tag("#resonance");
        signal.add_tag("#resonance");
        assert_eq!(signal.tags, vec!["#watch", "#resonance"]);
    }

    #[test]
    fn price_series_looks_up_offsets_by_calendar_day() {
        let series = PriceSeries::from_points(vec![
            point("2024-01-01", dec!(100)),
            point("2024-01-02", dec!(110)),
            point("2024-01-04", dec!(120)),
        ]);
        let start: NaiveDate = "2024-01-01".parse().unwrap();
        assert_eq!(series.close_on(start), Some(dec!(100)));
        assert_eq!(series.close_after(start, 1), Some(dec!(110)));
        // A gap in the series is a missing lookup, not the nearest neighbour.
        assert_eq!(series.close_after(start, 2), None);
        assert_eq!(series.close_after(start, 3), Some(dec!(120)));
    }

    #[test]
    fn signal_kind_round_trips_through_text() {
        assert_eq!("BUY".parse::<SignalKind>().unwrap(), SignalKind::Buy);
        assert_eq!(SignalKind::Add.to_string(), "ADD");
        assert!("HOLD".parse::<SignalKind>().is_err());
    }
}
