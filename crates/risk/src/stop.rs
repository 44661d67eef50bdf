// In crates/risk/src/stop.rs

use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use crate::types::{RiskSettings, StopPolicy};

/// The stop line for one open position.
///
/// Shared between the live tracker and the backtester so both simulate the
/// exact same exit behaviour. Under the trailing policy the line is derived
/// from the peak price and clamped to never move down; under the fixed policy
/// it is set once from the entry price.
#[derive(Debug, Clone)]
pub struct StopLine {
    policy: StopPolicy,
    /// Multiplier applied to the peak price under the trailing policy.
    trail_factor: Decimal,
    max_price: Decimal,
    line: Decimal,
}

impl StopLine {
    /// Creates the stop line for a position entered at `entry_price`.
    pub fn new(settings: &RiskSettings, entry_price: Decimal) -> Self {
        let trail_factor = pct_factor(settings.stop_loss_pct);
        let line = match settings.stop_loss_type {
            StopPolicy::Trailing => entry_price * trail_factor,
            StopPolicy::Fixed => entry_price * pct_factor(settings.initial_stop),
        };
        Self {
            policy: settings.stop_loss_type,
            trail_factor,
            max_price: entry_price,
            line,
        }
    }

    /// Feeds one price observation and returns the current line.
    ///
    /// The line is monotonically non-decreasing under the trailing policy and
    /// constant under the fixed policy.
    pub fn observe(&mut self, price: Decimal) -> Decimal {
        if price > self.max_price {
            self.max_price = price;
        }
        if self.policy == StopPolicy::Trailing {
            let candidate = self.max_price * self.trail_factor;
            if candidate > self.line {
                self.line = candidate;
            }
        }
        self.line
    }

    pub fn line(&self) -> Decimal {
        self.line
    }

    pub fn max_price(&self) -> Decimal {
        self.max_price
    }

    /// Whether `price` breaches the stop.
    pub fn is_breached(&self, price: Decimal) -> bool {
        price <= self.line
    }

    /// Drawdown of `price` from the peak, as a (negative) percentage.
    pub fn drawdown_pct(&self, price: Decimal) -> f64 {
        if self.max_price.is_zero() {
            return 0.0;
        }
        ((price - self.max_price) / self.max_price)
            .to_f64()
            .unwrap_or(0.0)
            * 100.0
    }
}

/// `1 + pct/100` as a `Decimal` multiplier; `pct` is negative for stops.
fn pct_factor(pct: f64) -> Decimal {
    dec!(1) + Decimal::from_f64(pct).unwrap_or_default() / dec!(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trailing(pct: f64) -> RiskSettings {
        RiskSettings {
            stop_loss_type: StopPolicy::Trailing,
            stop_loss_pct: pct,
            ..RiskSettings::default()
        }
    }

    #[test]
    fn trailing_line_tracks_the_peak() {
        // Entry 100 at -15%: the line starts at 85, a rally to 130 drags it to
        // 110.5, and the pullback to 105 breaches it.
        let mut stop = StopLine::new(&trailing(-15.0), dec!(100));
        assert_eq!(stop.line(), dec!(85));
        assert_eq!(stop.observe(dec!(100)), dec!(85));
        assert_eq!(stop.observe(dec!(130)), dec!(110.5));
        assert_eq!(stop.observe(dec!(105)), dec!(110.5));
        assert!(stop.is_breached(dec!(105)));
    }

    #[test]
    fn trailing_line_never_moves_down() {
        let mut stop = StopLine::new(&trailing(-15.0), dec!(100));
        let path = [100.0, 120.0, 90.0, 115.0, 80.0, 140.0, 60.0];
        let mut previous = stop.line();
        for price in path {
            let line = stop.observe(Decimal::from_f64(price).unwrap());
            assert!(line >= previous, "line regressed at price {price}");
            previous = line;
        }
    }

    #[test]
    fn fixed_line_stays_at_the_entry_offset() {
        let settings = RiskSettings {
            stop_loss_type: StopPolicy::Fixed,
            initial_stop: -20.0,
            ..RiskSettings::default()
        };
        let mut stop = StopLine::new(&settings, dec!(100));
        assert_eq!(stop.line(), dec!(80));
        stop.observe(dec!(150));
        assert_eq!(stop.line(), dec!(80));
        assert!(!stop.is_breached(dec!(81)));
        assert!(stop.is_breached(dec!(80)));
    }

    #[test]
    fn drawdown_is_measured_from_the_peak() {
        let mut stop = StopLine::new(&trailing(-15.0), dec!(100));
        stop.observe(dec!(130));
        let dd = stop.drawdown_pct(dec!(104));
        assert!((dd - (-20.0)).abs() < 1e-9);
    }
}
