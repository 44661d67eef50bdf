// In crates/signals/src/engine.rs

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use core_types::{
    CoinMetrics, MarketSnapshot, SentimentSample, Signal, SignalKind, Strength, Symbol,
};
use tracing::{debug, info, warn};

use crate::percentile::PercentileScorer;
use crate::reversal::ReversalDetector;
use crate::types::SignalSettings;

/// Sell signals additionally pass through this hard percentile gate,
/// independent of the configured greed cutoff. The buy side has no such gate;
/// the asymmetry is deliberate.
const SELL_PERCENTILE_GATE: f64 = 85.0;

/// Prefetched history windows the engine consults while scoring a snapshot.
///
/// Fetching is the caller's job; the engine itself is a pure, synchronous
/// function of snapshot + context.
#[derive(Debug, Clone, Default)]
pub struct SnapshotContext {
    pub sentiment_history: Vec<SentimentSample>,
    /// Funding-rate history per coin, oldest first.
    pub funding_history: HashMap<Symbol, Vec<f64>>,
}

/// Turns a market snapshot into strength-graded buy/sell signals.
///
/// Evaluation is two-phase: per-asset candidates are decided independently,
/// then a batch-wide resonance pass may upgrade everything that was emitted.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    settings: SignalSettings,
    scorer: PercentileScorer,
    detector: ReversalDetector,
}

impl SignalEngine {
    pub fn new(settings: SignalSettings) -> Self {
        let scorer = PercentileScorer::new(settings.thresholds.min_percentile_samples);
        let detector = ReversalDetector::new(settings.reversal.clone());
        Self {
            settings,
            scorer,
            detector,
        }
    }

    pub fn settings(&self) -> &SignalSettings {
        &self.settings
    }

    /// Generates the signal batch for one snapshot.
    pub fn generate(&self, snapshot: &MarketSnapshot, ctx: &SnapshotContext) -> Vec<Signal> {
        let Some(fear_greed) = &snapshot.fear_greed else {
            warn!("No fear & greed reading in snapshot, skipping signal generation");
            return Vec::new();
        };
        if !self.settings.strategy.use_fear_greed {
            return Vec::new();
        }
        let sentiment = fear_greed.value;

        // --- Phase 1: independent per-asset candidates ---
        let mut signals: Vec<Signal> = Vec::new();
        for (symbol, metrics) in &snapshot.coins {
            if metrics.price.is_none() {
                debug!(symbol = %symbol, "No price for coin, skipping");
                continue;
            }
            if let Some(signal) =
                self.evaluate_coin(symbol, metrics, sentiment, snapshot.timestamp, ctx)
            {
                signals.push(signal);
            }
        }

        // --- Phase 2: resonance upgrade across the whole batch ---
        let resonance = &self.settings.resonance;
        if resonance.enabled
            && self.settings.strategy.use_resonance
            && signals.len() >= resonance.min_coins
        {
            let count = signals.len();
            info!(count, "Market resonance detected");
            for signal in &mut signals {
                signal.strength = signal.strength.upgraded();
                signal.add_tag("#resonance");
                signal
                    .reasons
                    .push(format!("market resonance across {count} coins"));
            }
        }

        signals
    }

    fn evaluate_coin(
        &self,
        symbol: &Symbol,
        metrics: &CoinMetrics,
        sentiment: f64,
        now: DateTime<Utc>,
        ctx: &SnapshotContext,
    ) -> Option<Signal> {
        let thresholds = &self.settings.thresholds;
        if sentiment < thresholds.fear_buy {
            self.buy_candidate(symbol, metrics, sentiment, now, ctx)
        } else if sentiment > thresholds.greed_sell && self.settings.strategy.use_sell_signal {
            self.sell_candidate(symbol, metrics, sentiment, now, ctx)
        } else {
            None
        }
    }

    /// Builds the buy-side strength ladder: weak on the raw threshold cross,
    /// medium with a confirmed reversal, strong on an extreme funding
    /// percentile, extreme when short dominance piles on top of strong.
    fn buy_candidate(
        &self,
        symbol: &Symbol,
        metrics: &CoinMetrics,
        sentiment: f64,
        now: DateTime<Utc>,
        ctx: &SnapshotContext,
    ) -> Option<Signal> {
        let thresholds = &self.settings.thresholds;
        let mut strength = Strength::Weak;
        let mut reasons = vec![format!("fear & greed index at {sentiment:.0}")];
        let mut tags = vec!["#watch".to_string()];

        let reversal = self.settings.strategy.use_reversal
            && self
                .detector
                .confirm(&ctx.sentiment_history, now, sentiment);
        if reversal {
            strength = Strength::Medium;
            reasons.push("panic reversal confirmed".to_string());
            tags = vec!["#reversal".to_string()];
        }

        if let Some(percentile) = self.funding_percentile(symbol, metrics, ctx) {
            if percentile < thresholds.funding_panic_percentile {
                strength = Strength::Strong;
                reasons.push(format!(
                    "funding rate percentile {percentile:.1}% (extreme panic)"
                ));
                tags = vec!["#dip-buy".to_string()];
            }
        }

        if self.settings.strategy.use_longshort {
            if let Some(long_short) = &metrics.long_short {
                if long_short.ratio < thresholds.longshort_extreme {
                    reasons.push(format!(
                        "long/short ratio {:.2} (shorts dominate)",
                        long_short.ratio
                    ));
                    if strength == Strength::Strong {
                        strength = Strength::Extreme;
                    }
                }
            }
        }

        // A reversal alone may emit even at base strength; anything else must
        // have climbed to at least medium.
        if strength >= Strength::Medium || reversal {
            Some(self.signal(
                symbol,
                SignalKind::Buy,
                strength,
                reasons,
                tags,
                metrics,
                sentiment,
                now,
            ))
        } else {
            None
        }
    }

    /// The sell ladder starts at medium and is gated harder than the buy side:
    /// without a confirmed greed reversal, only a funding percentile above the
    /// hard gate lets the candidate out.
    fn sell_candidate(
        &self,
        symbol: &Symbol,
        metrics: &CoinMetrics,
        sentiment: f64,
        now: DateTime<Utc>,
        ctx: &SnapshotContext,
    ) -> Option<Signal> {
        let thresholds = &self.settings.thresholds;
        let mut strength = Strength::Medium;
        let mut reasons = vec![format!("greed index at {sentiment:.0}")];
        let mut tags = vec!["#derisk".to_string()];

        let reversal = self.settings.strategy.use_reversal
            && self
                .detector
                .confirm(&ctx.sentiment_history, now, sentiment);
        if reversal {
            strength = Strength::Strong;
            reasons.push("greed reversal confirmed".to_string());
            tags = vec!["#reversal".to_string(), "#distribution".to_string()];
        }

        let percentile = self.funding_percentile(symbol, metrics, ctx);
        if let Some(percentile) = percentile {
            if percentile > thresholds.funding_greed_percentile {
                strength = Strength::Extreme;
                reasons.push(format!(
                    "funding rate percentile {percentile:.1}% (overheated)"
                ));
                tags = vec!["#distribution".to_string(), "#overheated".to_string()];
            }
        }

        if reversal || percentile.is_some_and(|p| p > SELL_PERCENTILE_GATE) {
            Some(self.signal(
                symbol,
                SignalKind::Sell,
                strength,
                reasons,
                tags,
                metrics,
                sentiment,
                now,
            ))
        } else {
            None
        }
    }

    /// The funding-rate percentile for a coin, or `None` when the feature is
    /// disabled, the rate is missing, or the history window is too small.
    fn funding_percentile(
        &self,
        symbol: &Symbol,
        metrics: &CoinMetrics,
        ctx: &SnapshotContext,
    ) -> Option<f64> {
        if !self.settings.strategy.use_funding_percentile {
            return None;
        }
        let rate = metrics.funding_rate?;
        let history = ctx.funding_history.get(symbol)?;
        self.scorer.percentile(history, rate)
    }

    #[allow(clippy::too_many_arguments)]
    fn signal(
        &self,
        symbol: &Symbol,
        kind: SignalKind,
        strength: Strength,
        reasons: Vec<String>,
        tags: Vec<String>,
        metrics: &CoinMetrics,
        sentiment: f64,
        now: DateTime<Utc>,
    ) -> Signal {
        Signal {
            symbol: symbol.clone(),
            kind,
            strength,
            reasons,
            tags,
            source_price: metrics.price,
            source_sentiment: Some(sentiment),
            timestamp: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResonanceSettings, ReversalSettings, StrategyToggles, ThresholdSettings};
    use core_types::SentimentReading;
    use rust_decimal_macros::dec;

    fn settings() -> SignalSettings {
        SignalSettings {
            thresholds: ThresholdSettings {
                min_percentile_samples: 4,
                ..ThresholdSettings::default()
            },
            reversal: ReversalSettings::default(),
            resonance: ResonanceSettings::default(),
            strategy: StrategyToggles::default(),
        }
    }

    fn snapshot(sentiment: f64, coins: Vec<(&str, CoinMetrics)>) -> MarketSnapshot {
        MarketSnapshot {
            timestamp: Utc::now(),
            fear_greed: Some(SentimentReading {
                value: sentiment,
                classification: "Extreme Fear".to_string(),
                timestamp: Utc::now(),
            }),
            coins: coins
                .into_iter()
                .map(|(s, m)| (Symbol::new(s), m))
                .collect(),
        }
    }

    fn priced_coin() -> CoinMetrics {
        CoinMetrics {
            price: Some(dec!(50_000)),
            funding_rate: None,
            long_short: None,
        }
    }

    fn rising_history() -> Vec<SentimentSample> {
        ["10", "15", "20"]
            .iter()
            .enumerate()
            .map(|(i, v)| SentimentSample {
                timestamp: format!("2024-06-01 0{i}:00:00"),
                value: v.parse().unwrap(),
            })
            .collect()
    }

    #[test]
    fn weak_candidate_without_confirmation_is_not_emitted() {
        let engine = SignalEngine::new(settings());
        let snap = snapshot(20.0, vec![("BTC", priced_coin())]);
        let signals = engine.generate(&snap, &SnapshotContext::default());
        assert!(signals.is_empty());
    }

    #[test]
    fn reversal_emits_a_medium_buy() {
        let engine = SignalEngine::new(settings());
        let snap = snapshot(22.0, vec![("BTC", priced_coin())]);
        let ctx = SnapshotContext {
            sentiment_history: rising_history(),
            funding_history: HashMap::new(),
        };
        let signals = engine.generate(&snap, &ctx);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Buy);
        assert_eq!(signals[0].strength, Strength::Medium);
        assert!(signals[0].tags.contains(&"#reversal".to_string()));
    }

    #[test]
    fn extreme_funding_percentile_upgrades_a_buy_to_strong() {
        let engine = SignalEngine::new(settings());
        let metrics = CoinMetrics {
            funding_rate: Some(-0.05),
            ..priced_coin()
        };
        let snap = snapshot(20.0, vec![("BTC", metrics)]);
        let ctx = SnapshotContext {
            sentiment_history: Vec::new(),
            funding_history: [(Symbol::new("BTC"), vec![0.01, 0.02, 0.03, 0.04])]
                .into_iter()
                .collect(),
        };
        let signals = engine.generate(&snap, &ctx);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].strength, Strength::Strong);
    }

    #[test]
    fn short_dominance_on_top_of_strong_yields_extreme() {
        let engine = SignalEngine::new(settings());
        let metrics = CoinMetrics {
            price: Some(dec!(3_000)),
            funding_rate: Some(-0.05),
            long_short: Some(core_types::LongShortRatio {
                long_pct: 40.0,
                short_pct: 60.0,
                ratio: 0.67,
            }),
        };
        let snap = snapshot(20.0, vec![("ETH", metrics)]);
        let ctx = SnapshotContext {
            sentiment_history: Vec::new(),
            funding_history: [(Symbol::new("ETH"), vec![0.01, 0.02, 0.03, 0.04])]
                .into_iter()
                .collect(),
        };
        let signals = engine.generate(&snap, &ctx);
        assert_eq!(signals[0].strength, Strength::Extreme);
    }

    #[test]
    fn short_dominance_alone_does_not_upgrade_a_weak_buy() {
        let engine = SignalEngine::new(settings());
        let metrics = CoinMetrics {
            long_short: Some(core_types::LongShortRatio {
                long_pct: 40.0,
                short_pct: 60.0,
                ratio: 0.67,
            }),
            ..priced_coin()
        };
        let snap = snapshot(20.0, vec![("BTC", metrics)]);
        let signals = engine.generate(&snap, &SnapshotContext::default());
        assert!(signals.is_empty());
    }

    #[test]
    fn sell_requires_reversal_or_the_hard_percentile_gate() {
        let engine = SignalEngine::new(settings());
        // Greed threshold crossed but nothing else: no emission.
        let snap = snapshot(80.0, vec![("BTC", priced_coin())]);
        assert!(engine.generate(&snap, &SnapshotContext::default()).is_empty());

        // Overheated funding clears the gate and lands at extreme.
        let metrics = CoinMetrics {
            funding_rate: Some(0.9),
            ..priced_coin()
        };
        let snap = snapshot(80.0, vec![("BTC", metrics)]);
        let ctx = SnapshotContext {
            sentiment_history: Vec::new(),
            funding_history: [(Symbol::new("BTC"), vec![0.01, 0.02, 0.03, 0.04])]
                .into_iter()
                .collect(),
        };
        let signals = engine.generate(&snap, &ctx);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::Sell);
        assert_eq!(signals[0].strength, Strength::Extreme);
    }

    #[test]
    fn sell_side_can_be_disabled_entirely() {
        let mut s = settings();
        s.strategy.use_sell_signal = false;
        let engine = SignalEngine::new(s);
        let metrics = CoinMetrics {
            funding_rate: Some(0.9),
            ..priced_coin()
        };
        let snap = snapshot(80.0, vec![("BTC", metrics)]);
        let ctx = SnapshotContext {
            sentiment_history: Vec::new(),
            funding_history: [(Symbol::new("BTC"), vec![0.01, 0.02, 0.03, 0.04])]
                .into_iter()
                .collect(),
        };
        assert!(engine.generate(&snap, &ctx).is_empty());
    }

    #[test]
    fn resonance_upgrades_every_emitted_signal_once() {
        let mut s = settings();
        s.resonance = ResonanceSettings {
            enabled: true,
            min_coins: 2,
        };
        let engine = SignalEngine::new(s);
        let snap = snapshot(
            22.0,
            vec![
                ("BTC", priced_coin()),
                ("ETH", priced_coin()),
                ("SOL", priced_coin()),
            ],
        );
        let ctx = SnapshotContext {
            sentiment_history: rising_history(),
            funding_history: HashMap::new(),
        };
        let signals = engine.generate(&snap, &ctx);
        assert_eq!(signals.len(), 3);
        for signal in &signals {
            // Three independent medium signals all resonate up to strong.
            assert_eq!(signal.strength, Strength::Strong);
            assert!(signal.tags.contains(&"#resonance".to_string()));
            assert!(
                signal
                    .reasons
                    .iter()
                    .any(|r| r.contains("resonance across 3 coins"))
            );
        }
    }

    #[test]
    fn resonance_below_the_coin_floor_changes_nothing() {
        let mut s = settings();
        s.resonance = ResonanceSettings {
            enabled: true,
            min_coins: 2,
        };
        let engine = SignalEngine::new(s);
        let snap = snapshot(22.0, vec![("BTC", priced_coin())]);
        let ctx = SnapshotContext {
            sentiment_history: rising_history(),
            funding_history: HashMap::new(),
        };
        let signals = engine.generate(&snap, &ctx);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].strength, Strength::Medium);
        assert!(!signals[0].tags.contains(&"#resonance".to_string()));
    }

    #[test]
    fn missing_metrics_never_fail_the_batch() {
        let engine = SignalEngine::new(settings());
        let unpriced = CoinMetrics::default();
        let snap = snapshot(22.0, vec![("BTC", priced_coin()), ("DOGE", unpriced)]);
        let ctx = SnapshotContext {
            sentiment_history: rising_history(),
            funding_history: HashMap::new(),
        };
        // The unpriced coin is skipped; the other still signals.
        let signals = engine.generate(&snap, &ctx);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].symbol, Symbol::new("BTC"));
    }
}
