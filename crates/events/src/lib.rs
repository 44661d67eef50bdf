// In crates/events/src/lib.rs

use chrono::{DateTime, Utc};
use core_types::{Signal, Symbol};
use rust_decimal::Decimal;
use serde::Serialize;

/// Emitted when a position's stop line is breached.
#[derive(Debug, Clone, Serialize)]
pub struct StopEvent {
    pub symbol: Symbol,
    pub entry_price: Decimal,
    pub stop_price: Decimal,
    pub return_pct: f64,
    pub max_price: Decimal,
    /// Drawdown from the peak price, as a (negative) percentage.
    pub drawdown_pct: f64,
    pub triggered_at: DateTime<Utc>,
}

/// Emitted the first time a position trades above its entry price.
#[derive(Debug, Clone, Serialize)]
pub struct NewHighEvent {
    pub symbol: Symbol,
    pub entry_price: Decimal,
    pub price: Decimal,
    pub return_pct: f64,
}

/// Emitted when a trailing stop line moves up meaningfully.
#[derive(Debug, Clone, Serialize)]
pub struct StopRaisedEvent {
    pub symbol: Symbol,
    pub previous_line: Decimal,
    pub new_line: Decimal,
    pub raised_pct: f64,
}

/// The top-level monitor event enum.
/// `tag` and `content` are used by serde for clean JSON representation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum MonitorEvent {
    SignalBatch(Vec<Signal>),
    StopTriggered(StopEvent),
    NewHigh(NewHighEvent),
    StopLineRaised(StopRaisedEvent),
}
