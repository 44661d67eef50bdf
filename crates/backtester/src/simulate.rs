// In crates/backtester/src/simulate.rs

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use core_types::{DailySentiment, PriceSeries, Signal, SignalKind, Strength, Symbol};
use signals::{ReversalDetector, ThresholdSettings};
use tracing::info;

/// Walks a daily sentiment series and emits the BUY signals the strategy
/// would have produced, so a backtest can run without a populated signal
/// store.
///
/// A day signals when the index is inside the fear band and the reversal
/// detector confirms the inflection against the preceding days; each coin
/// with a price on that day gets its own signal.
pub fn simulate_buy_signals(
    sentiment: &[DailySentiment],
    prices: &HashMap<Symbol, PriceSeries>,
    thresholds: &ThresholdSettings,
    detector: &ReversalDetector,
) -> Vec<Signal> {
    let mut symbols: Vec<&Symbol> = prices.keys().collect();
    symbols.sort();

    let values: Vec<f64> = sentiment.iter().map(|d| d.value).collect();
    let mut signals = Vec::new();

    for (i, day) in sentiment.iter().enumerate() {
        if day.value >= thresholds.fear_buy {
            continue;
        }
        if !detector.confirm_values(&values[..i], day.value) {
            continue;
        }

        for symbol in &symbols {
            let Some(close) = prices[*symbol].close_on(day.date) else {
                continue;
            };
            let timestamp = Utc.from_utc_datetime(&day.date.and_hms_opt(0, 0, 0).unwrap_or_default());
            signals.push(Signal {
                symbol: (*symbol).clone(),
                kind: SignalKind::Buy,
                strength: Strength::Medium,
                reasons: vec![format!(
                    "panic reversal confirmed (index {:.0})",
                    day.value
                )],
                tags: vec!["#reversal".to_string()],
                source_price: Some(close),
                source_sentiment: Some(day.value),
                timestamp,
            });
        }
    }

    info!(count = signals.len(), "Historical signal simulation finished");
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_types::PricePoint;
    use rust_decimal::Decimal;
    use rust_decimal::prelude::*;
    use signals::ReversalSettings;

    fn sentiment(start: &str, values: &[f64]) -> Vec<DailySentiment> {
        let start: NaiveDate = start.parse().unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| DailySentiment {
                date: start + chrono::Duration::days(i as i64),
                value: *v,
                classification: String::new(),
            })
            .collect()
    }

    fn flat_series(start: &str, days: usize, close: f64) -> PriceSeries {
        let start: NaiveDate = start.parse().unwrap();
        PriceSeries::from_points(
            (0..days)
                .map(|i| PricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    open: None,
                    high: None,
                    low: None,
                    close: Decimal::from_f64(close).unwrap(),
                    volume: None,
                })
                .collect(),
        )
    }

    fn detector() -> ReversalDetector {
        ReversalDetector::new(ReversalSettings {
            enabled: true,
            consecutive_periods: 2,
            ..ReversalSettings::default()
        })
    }

    #[test]
    fn a_confirmed_panic_inflection_signals_every_priced_coin() {
        // Only the last day follows a rising panic tail ([18, 22] -> 24);
        // the dip into 18 itself is not a confirmed inflection.
        let sentiment = sentiment("2024-01-01", &[30.0, 26.0, 18.0, 22.0, 24.0]);
        let prices: HashMap<Symbol, PriceSeries> = [
            (Symbol::new("BTC"), flat_series("2024-01-01", 5, 50_000.0)),
            (Symbol::new("ETH"), flat_series("2024-01-01", 5, 3_000.0)),
        ]
        .into_iter()
        .collect();

        let signals = simulate_buy_signals(
            &sentiment,
            &prices,
            &ThresholdSettings::default(),
            &detector(),
        );

        assert_eq!(signals.len(), 2);
        // Symbols come out in sorted order for reproducible runs.
        assert_eq!(signals[0].symbol, Symbol::new("BTC"));
        assert_eq!(signals[1].symbol, Symbol::new("ETH"));
        let expected: NaiveDate = "2024-01-05".parse().unwrap();
        assert_eq!(signals[0].timestamp.date_naive(), expected);
    }

    #[test]
    fn fear_without_a_reversal_stays_quiet() {
        // Deep fear but still falling: no inflection, no signals.
        let sentiment = sentiment("2024-01-01", &[28.0, 24.0, 20.0, 16.0, 12.0]);
        let prices: HashMap<Symbol, PriceSeries> =
            [(Symbol::new("BTC"), flat_series("2024-01-01", 5, 50_000.0))]
                .into_iter()
                .collect();

        let signals = simulate_buy_signals(
            &sentiment,
            &prices,
            &ThresholdSettings::default(),
            &detector(),
        );
        assert!(signals.is_empty());
    }

    #[test]
    fn days_without_prices_produce_no_signal() {
        let sentiment = sentiment("2024-01-01", &[30.0, 26.0, 18.0, 22.0, 24.0]);
        // The price series ends before the signalling day.
        let prices: HashMap<Symbol, PriceSeries> =
            [(Symbol::new("BTC"), flat_series("2024-01-01", 3, 50_000.0))]
                .into_iter()
                .collect();

        let signals = simulate_buy_signals(
            &sentiment,
            &prices,
            &ThresholdSettings::default(),
            &detector(),
        );
        assert!(signals.is_empty());
    }
}
