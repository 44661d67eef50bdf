// In crates/risk/src/position.rs

use chrono::{DateTime, NaiveDate, Utc};
use core_types::Symbol;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a tracked position. `Stopped` and `Closed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Stopped,
    Closed,
}

/// One tracked position. At most one exists per asset.
///
/// Invariant: `max_price >= entry_price` at all times, and `max_price` only
/// ever increases over the position's life.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: Symbol,
    pub entry_price: Decimal,
    pub amount: Decimal,
    pub entry_date: NaiveDate,
    pub reasons: Vec<String>,
    pub max_price: Decimal,
    pub current_price: Decimal,
    pub status: PositionStatus,
    pub stop_triggered_at: Option<DateTime<Utc>>,
    pub stop_price: Option<Decimal>,
}

impl Position {
    pub fn open(
        symbol: Symbol,
        entry_price: Decimal,
        amount: Decimal,
        entry_date: NaiveDate,
        reasons: Vec<String>,
    ) -> Self {
        Self {
            symbol,
            entry_price,
            amount,
            entry_date,
            reasons,
            max_price: entry_price,
            current_price: entry_price,
            status: PositionStatus::Open,
            stop_triggered_at: None,
            stop_price: None,
        }
    }

    /// Unrealized return in percent, relative to the (possibly averaged) entry.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price.is_zero() {
            return 0.0;
        }
        ((self.current_price - self.entry_price) / self.entry_price)
            .to_f64()
            .unwrap_or(0.0)
            * 100.0
    }

    /// Drawdown from the highest price seen since entry, in percent.
    pub fn drawdown_from_peak(&self) -> f64 {
        if self.max_price.is_zero() {
            return 0.0;
        }
        ((self.current_price - self.max_price) / self.max_price)
            .to_f64()
            .unwrap_or(0.0)
            * 100.0
    }

    /// Applies a price tick. The peak only ever moves up.
    pub fn tick(&mut self, price: Decimal) {
        self.current_price = price;
        if price > self.max_price {
            self.max_price = price;
        }
    }

    /// Merges a pyramiding fill into this position.
    ///
    /// The entry price becomes the amount-weighted average of the old entry
    /// and the new fill, reasons are unioned, and the peak is left for the
    /// next price tick to update.
    pub fn merge_fill(&mut self, fill_price: Decimal, fill_amount: Decimal, reasons: &[String]) {
        let total = self.amount + fill_amount;
        if total.is_zero() {
            return;
        }
        self.entry_price =
            (self.entry_price * self.amount + fill_price * fill_amount) / total;
        self.amount = total;
        for reason in reasons {
            if !self.reasons.contains(reason) {
                self.reasons.push(reason.clone());
            }
        }
    }
}

/// The persisted shape of a position, as written to the position store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub asset: String,
    pub entry_price: Decimal,
    pub amount: Decimal,
    pub entry_date: NaiveDate,
    pub signal_reasons: Vec<String>,
    pub max_price: Decimal,
    pub current_price: Decimal,
    pub status: PositionStatus,
    pub stop_triggered_at: Option<DateTime<Utc>>,
    pub stop_price: Option<Decimal>,
}

impl From<&Position> for PositionRecord {
    fn from(position: &Position) -> Self {
        Self {
            asset: position.symbol.0.clone(),
            entry_price: position.entry_price,
            amount: position.amount,
            entry_date: position.entry_date,
            signal_reasons: position.reasons.clone(),
            max_price: position.max_price,
            current_price: position.current_price,
            status: position.status,
            stop_triggered_at: position.stop_triggered_at,
            stop_price: position.stop_price,
        }
    }
}

impl From<PositionRecord> for Position {
    fn from(record: PositionRecord) -> Self {
        Self {
            symbol: Symbol(record.asset),
            entry_price: record.entry_price,
            amount: record.amount,
            entry_date: record.entry_date,
            reasons: record.signal_reasons,
            max_price: record.max_price,
            current_price: record.current_price,
            status: record.status,
            stop_triggered_at: record.stop_triggered_at,
            stop_price: record.stop_price,
        }
    }
}
