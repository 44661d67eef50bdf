// In crates/risk/src/tracker.rs

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use core_types::Symbol;
use events::{NewHighEvent, StopEvent, StopRaisedEvent};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use tracing::{info, warn};

use crate::position::{Position, PositionRecord, PositionStatus};
use crate::stop::StopLine;
use crate::types::RiskSettings;
use crate::{FixedUnitSizing, SizingPolicy};

/// A stop-line increase below this percentage is not worth a notification.
const STOP_RAISE_NOTIFY_PCT: f64 = 2.0;

/// Everything a price sweep produced. Stop triggers are state transitions;
/// new highs and raised stop lines are notifications only.
#[derive(Debug, Default)]
pub struct PriceUpdateEvents {
    pub stopped: Vec<StopEvent>,
    pub new_highs: Vec<NewHighEvent>,
    pub stop_line_raised: Vec<StopRaisedEvent>,
}

/// A point-in-time summary of the tracker.
#[derive(Debug, Clone)]
pub struct TrackerStatus {
    pub open_positions: usize,
    /// Sum of unrealized returns across open positions, in percent.
    pub total_return_pct: f64,
    pub positions: Vec<PositionRecord>,
}

/// Tracks at most one position per asset and drives its stop line.
///
/// The tracker is the live counterpart of the backtester's walk: both share
/// [`StopLine`], so a price path exits at the same level in either.
pub struct PositionTracker {
    settings: RiskSettings,
    sizing: Box<dyn SizingPolicy>,
    positions: HashMap<Symbol, Position>,
    stop_lines: HashMap<Symbol, StopLine>,
}

impl PositionTracker {
    pub fn new(settings: RiskSettings) -> Self {
        Self::with_sizing(settings, Box::new(FixedUnitSizing::default()))
    }

    pub fn with_sizing(settings: RiskSettings, sizing: Box<dyn SizingPolicy>) -> Self {
        Self {
            settings,
            sizing,
            positions: HashMap::new(),
            stop_lines: HashMap::new(),
        }
    }

    /// Opens a position for `symbol`. Returns false (and changes nothing) when
    /// one is already being tracked.
    pub fn open(
        &mut self,
        symbol: &Symbol,
        price: Decimal,
        amount: Option<Decimal>,
        reasons: Vec<String>,
        entry_date: NaiveDate,
    ) -> bool {
        if self.positions.contains_key(symbol) {
            info!(symbol = %symbol, "Position already tracked, skipping open");
            return false;
        }
        let amount = amount.unwrap_or_else(|| self.sizing.amount(symbol, price));
        let position = Position::open(symbol.clone(), price, amount, entry_date, reasons);
        self.stop_lines
            .insert(symbol.clone(), StopLine::new(&self.settings, price));
        self.positions.insert(symbol.clone(), position);
        info!(symbol = %symbol, price = %price, amount = %amount, "Position opened");
        true
    }

    /// Merges a pyramiding fill into an existing open position.
    ///
    /// The stop line is left on its current (possibly raised) level; only
    /// subsequent price ticks move it.
    pub fn add_to_position(
        &mut self,
        symbol: &Symbol,
        price: Decimal,
        amount: Option<Decimal>,
        reasons: &[String],
    ) -> bool {
        let Some(position) = self.positions.get_mut(symbol) else {
            warn!(symbol = %symbol, "No tracked position to add to");
            return false;
        };
        if position.status != PositionStatus::Open {
            return false;
        }
        let amount = amount.unwrap_or_else(|| self.sizing.amount(symbol, price));
        position.merge_fill(price, amount, reasons);
        info!(
            symbol = %symbol,
            entry = %position.entry_price,
            amount = %position.amount,
            "Pyramiding fill merged"
        );
        true
    }

    /// Applies one price tick per asset and collects the resulting events.
    ///
    /// Assets absent from `prices` are simply not updated. Updates for the
    /// same asset must arrive in timestamp order; the stop line is monotonic
    /// and history-dependent.
    pub fn update_prices(
        &mut self,
        prices: &HashMap<Symbol, Decimal>,
        now: DateTime<Utc>,
    ) -> PriceUpdateEvents {
        let mut events = PriceUpdateEvents::default();

        for (symbol, price) in prices {
            let Some(position) = self.positions.get_mut(symbol) else {
                continue;
            };
            if position.status != PositionStatus::Open {
                continue;
            }
            let Some(stop) = self.stop_lines.get_mut(symbol) else {
                continue;
            };

            // A "new high" fires the first time the price clears the entry;
            // once the peak sits above the entry it can never fire again.
            let first_time_above_entry =
                position.max_price <= position.entry_price && *price > position.entry_price;

            let previous_line = stop.line();
            position.tick(*price);
            let line = stop.observe(*price);

            if first_time_above_entry {
                events.new_highs.push(NewHighEvent {
                    symbol: symbol.clone(),
                    entry_price: position.entry_price,
                    price: *price,
                    return_pct: position.return_pct(),
                });
            }

            if line > previous_line && !previous_line.is_zero() {
                let raised_pct = ((line - previous_line) / previous_line)
                    .to_f64()
                    .unwrap_or(0.0)
                    * 100.0;
                if raised_pct >= STOP_RAISE_NOTIFY_PCT {
                    events.stop_line_raised.push(StopRaisedEvent {
                        symbol: symbol.clone(),
                        previous_line,
                        new_line: line,
                        raised_pct,
                    });
                }
            }

            if stop.is_breached(*price) {
                position.status = PositionStatus::Stopped;
                position.stop_triggered_at = Some(now);
                position.stop_price = Some(*price);
                warn!(
                    symbol = %symbol,
                    entry = %position.entry_price,
                    stop = %price,
                    return_pct = position.return_pct(),
                    "Stop loss triggered"
                );
                events.stopped.push(StopEvent {
                    symbol: symbol.clone(),
                    entry_price: position.entry_price,
                    stop_price: *price,
                    return_pct: position.return_pct(),
                    max_price: position.max_price,
                    drawdown_pct: position.drawdown_from_peak(),
                    triggered_at: now,
                });
            }
        }

        events
    }

    /// The current stop line for `symbol`, if a position is open.
    pub fn stop_line(&self, symbol: &Symbol) -> Option<Decimal> {
        let position = self.positions.get(symbol)?;
        if position.status != PositionStatus::Open {
            return None;
        }
        self.stop_lines.get(symbol).map(|s| s.line())
    }

    pub fn position(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Per-asset summary plus the aggregate unrealized return of everything
    /// still open.
    pub fn status(&self) -> TrackerStatus {
        let open: Vec<&Position> = self
            .positions
            .values()
            .filter(|p| p.status == PositionStatus::Open)
            .collect();
        TrackerStatus {
            open_positions: open.len(),
            total_return_pct: open.iter().map(|p| p.return_pct()).sum(),
            positions: open.iter().map(|p| PositionRecord::from(*p)).collect(),
        }
    }

    /// Manually closes and removes a position.
    pub fn close(&mut self, symbol: &Symbol) -> Option<Position> {
        self.stop_lines.remove(symbol);
        let mut position = self.positions.remove(symbol)?;
        if position.status == PositionStatus::Open {
            position.status = PositionStatus::Closed;
        }
        info!(symbol = %symbol, "Position closed");
        Some(position)
    }

    /// All tracked positions in their persisted shape.
    pub fn snapshot(&self) -> Vec<PositionRecord> {
        self.positions.values().map(PositionRecord::from).collect()
    }

    /// Restores the tracker from persisted records. Only open positions are
    /// resumed; stop lines are rebuilt from the recorded peaks.
    pub fn restore(&mut self, records: Vec<PositionRecord>) {
        for record in records {
            if record.status != PositionStatus::Open {
                continue;
            }
            let position: Position = record.into();
            let mut stop = StopLine::new(&self.settings, position.entry_price);
            stop.observe(position.max_price);
            self.stop_lines.insert(position.symbol.clone(), stop);
            self.positions.insert(position.symbol.clone(), position);
        }
        info!(count = self.positions.len(), "Positions restored");
    }
}
