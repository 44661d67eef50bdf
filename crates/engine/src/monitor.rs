// In crates/engine/src/monitor.rs

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use tracing::{error, info, warn};

use api_client::{FearGreedClient, MarketDataSource, create_market_source};
use app_config::Settings;
use core_types::{CoinMetrics, MarketSnapshot, Signal, SignalKind, Symbol};
use database::{BacktestFill, Db, JsonPositionStore, PendingSignal};
use notifier::{Notifier, TelegramNotifier, format};
use risk::{PositionStatus, PositionTracker};
use signals::{SignalEngine, SnapshotContext, StrategyComplexity};

use crate::{FUNDING_HISTORY_HOURS, SENTIMENT_HISTORY_HOURS};

/// The portfolio-level orchestrator: one polling cycle collects a snapshot,
/// sweeps the stop lines, generates signals, and tops up pending horizon
/// backtests.
pub struct Monitor {
    settings: Settings,
    source: Box<dyn MarketDataSource>,
    fear_greed: FearGreedClient,
    db: Db,
    engine: SignalEngine,
    tracker: PositionTracker,
    position_store: JsonPositionStore,
    notifier: Option<TelegramNotifier>,
    complexity: StrategyComplexity,
    enabled_coins: Vec<Symbol>,
}

impl Monitor {
    pub async fn new(settings: Settings) -> Result<Self> {
        info!("Initializing sentiment monitor...");

        let source = create_market_source(&settings.exchange)?;
        info!(exchange = source.name(), "Market data source ready");

        let db = database::connect(&settings.database).await?;
        info!(url = %settings.database.url, "Database connected");

        let engine = SignalEngine::new(settings.signal_settings());
        let complexity = StrategyComplexity::assess(&settings.strategy);
        info!("{}", complexity.summary());
        if complexity.grade.level() >= 2 {
            warn!(grade = %complexity.grade, "Strategy risk is elevated, consider fewer conditions");
        }

        let mut tracker = PositionTracker::new(settings.risk.clone());
        let position_store = JsonPositionStore::new(&settings.runtime.positions_file);
        tracker.restore(position_store.load()?);

        let notifier = if settings.telegram.enabled {
            let notifier = TelegramNotifier::new(&settings.telegram);
            if notifier.test_connection().await {
                info!("Telegram connection verified");
            } else {
                warn!("Telegram connection failed");
            }
            Some(notifier)
        } else {
            info!("Telegram notifications disabled");
            None
        };

        let enabled_coins: Vec<Symbol> = settings
            .enabled_coins()
            .into_iter()
            .map(Symbol::new)
            .collect();
        info!(coins = ?enabled_coins, "Monitoring coins");

        Ok(Self {
            settings,
            source,
            fear_greed: FearGreedClient::new(),
            db,
            engine,
            tracker,
            position_store,
            notifier,
            complexity,
            enabled_coins,
        })
    }

    /// The main monitoring loop. Runs until the process is stopped; a failed
    /// cycle is logged, notified, and retried after a backoff.
    pub async fn run(&mut self) -> Result<()> {
        let interval = Duration::from_secs(self.settings.runtime.check_interval_secs);
        let retry = Duration::from_secs(self.settings.runtime.error_retry_secs);

        self.notify(&format::startup_message(
            self.source.name(),
            &self.settings.enabled_coins(),
            self.settings.runtime.check_interval_secs,
            Utc::now(),
            &self.complexity,
        ))
        .await;

        loop {
            match self.cycle().await {
                Ok(()) => {
                    info!(minutes = interval.as_secs() / 60, "Cycle done, sleeping");
                    tokio::time::sleep(interval).await;
                }
                Err(e) => {
                    error!(error = %e, "Cycle failed");
                    self.notify(&format!("\u{26A0} <b>Monitor error</b>\n<code>{e}</code>"))
                        .await;
                    tokio::time::sleep(retry).await;
                }
            }
        }
    }

    /// One full polling cycle.
    pub async fn cycle(&mut self) -> Result<()> {
        let snapshot = self.collect_snapshot().await;

        if let Err(e) = self.db.save_snapshot(&snapshot).await {
            // Historical queries degrade but the cycle can still decide.
            error!(error = %e, "Failed to persist snapshot");
        }

        self.sweep_stop_lines(&snapshot).await;

        let context = self.snapshot_context(&snapshot).await;
        let signals = self.engine.generate(&snapshot, &context);
        if !signals.is_empty() {
            info!(count = signals.len(), "Signals generated");
            let emitted = self.handle_signals(&snapshot, signals).await;
            if !emitted.is_empty() {
                let message = format::signal_message(
                    &snapshot,
                    &emitted,
                    &self.complexity,
                    self.source.name(),
                );
                self.notify(&message).await;
            }
        }

        self.fill_pending_backtests().await;
        Ok(())
    }

    /// Collects price, funding and long/short metrics for every enabled coin
    /// plus the shared sentiment reading. One coin's failure never blocks the
    /// others.
    async fn collect_snapshot(&self) -> MarketSnapshot {
        let fear_greed = match self.fear_greed.latest().await {
            Ok(reading) => reading,
            Err(e) => {
                warn!(error = %e, "Could not fetch fear & greed index");
                None
            }
        };
        if let Some(reading) = &fear_greed {
            info!(
                value = reading.value,
                classification = %reading.classification,
                "Fear & greed index"
            );
        }

        let mut coins = HashMap::new();
        for symbol in &self.enabled_coins {
            let price = self
                .source
                .spot_price(symbol)
                .await
                .unwrap_or_else(|e| {
                    warn!(symbol = %symbol, error = %e, "Spot price unavailable");
                    None
                });
            let funding_rate = self
                .source
                .funding_rate(symbol)
                .await
                .unwrap_or_else(|e| {
                    warn!(symbol = %symbol, error = %e, "Funding rate unavailable");
                    None
                });
            let long_short = self
                .source
                .long_short_ratio(symbol)
                .await
                .unwrap_or_else(|e| {
                    warn!(symbol = %symbol, error = %e, "Long/short ratio unavailable");
                    None
                });
            coins.insert(
                symbol.clone(),
                CoinMetrics {
                    price,
                    funding_rate,
                    long_short,
                },
            );
        }

        MarketSnapshot {
            timestamp: Utc::now(),
            fear_greed,
            coins,
        }
    }

    /// Pulls the history windows the engine scores against.
    async fn snapshot_context(&self, snapshot: &MarketSnapshot) -> SnapshotContext {
        let sentiment_history = self
            .db
            .sentiment_history(SENTIMENT_HISTORY_HOURS)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Sentiment history unavailable");
                Vec::new()
            });

        let mut funding_history = HashMap::new();
        for symbol in snapshot.coins.keys() {
            match self.db.funding_history(symbol, FUNDING_HISTORY_HOURS).await {
                Ok(history) => {
                    funding_history.insert(symbol.clone(), history);
                }
                Err(e) => warn!(symbol = %symbol, error = %e, "Funding history unavailable"),
            }
        }

        SnapshotContext {
            sentiment_history,
            funding_history,
        }
    }

    /// Ticks every tracked position with the snapshot prices and dispatches
    /// the resulting notifications.
    async fn sweep_stop_lines(&mut self, snapshot: &MarketSnapshot) {
        let prices: HashMap<Symbol, Decimal> = snapshot
            .coins
            .iter()
            .filter_map(|(symbol, metrics)| metrics.price.map(|p| (symbol.clone(), p)))
            .collect();
        if prices.is_empty() {
            return;
        }

        let events = self.tracker.update_prices(&prices, snapshot.timestamp);
        self.persist_positions();

        for event in &events.new_highs {
            self.notify(&format::new_high_message(event)).await;
        }
        for event in &events.stop_line_raised {
            self.notify(&format::stop_raised_message(event)).await;
        }
        if self.settings.risk.notify_on_stop {
            for event in &events.stopped {
                warn!(symbol = %event.symbol, "Dispatching stop notification");
                self.notify(&format::stop_message(event)).await;
            }
        }
    }

    /// Applies position bookkeeping to a fresh signal batch: a BUY against an
    /// open position either upgrades to a pyramiding ADD or is dropped.
    async fn handle_signals(
        &mut self,
        snapshot: &MarketSnapshot,
        signals: Vec<Signal>,
    ) -> Vec<Signal> {
        let mut emitted = Vec::new();

        for mut signal in signals {
            if signal.kind == SignalKind::Buy {
                if let Some(position) = self.tracker.position(&signal.symbol) {
                    if position.status != PositionStatus::Open {
                        info!(symbol = %signal.symbol, "Asset already traded this run, skipping");
                        continue;
                    }
                    let pyramiding = &self.settings.position.pyramiding;
                    if !pyramiding.enabled {
                        info!(symbol = %signal.symbol, "Position already open, skipping");
                        continue;
                    }
                    let profit = position.return_pct();
                    if profit < pyramiding.min_profit_pct {
                        info!(
                            symbol = %signal.symbol,
                            profit,
                            "Unrealized profit below the add threshold, skipping"
                        );
                        continue;
                    }
                    signal.kind = SignalKind::Add;
                    signal
                        .reasons
                        .push(format!("pyramiding add (unrealized {profit:.1}%)"));
                }
            }

            if let Err(e) = self.db.save_signal(&signal).await {
                error!(symbol = %signal.symbol, error = %e, "Failed to persist signal");
            }
            info!(
                symbol = %signal.symbol,
                kind = %signal.kind,
                strength = %signal.strength,
                tags = signal.tags.join(" "),
                "Signal emitted"
            );

            match signal.kind {
                SignalKind::Buy => {
                    if let Some(price) = signal.source_price {
                        self.tracker.open(
                            &signal.symbol,
                            price,
                            None,
                            signal.reasons.clone(),
                            snapshot.timestamp.date_naive(),
                        );
                    }
                }
                SignalKind::Add => {
                    if let Some(price) = signal.source_price {
                        self.tracker
                            .add_to_position(&signal.symbol, price, None, &signal.reasons);
                    }
                }
                SignalKind::Sell => {}
            }

            emitted.push(signal);
        }

        if !emitted.is_empty() {
            self.persist_positions();
        }
        emitted
    }

    /// Fills horizon returns for stored signals whose holding periods have
    /// matured, using daily candles from the exchange.
    async fn fill_pending_backtests(&self) {
        let pending = match self.db.pending_backtest_signals().await {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "Could not list pending backtest signals");
                return;
            }
        };
        if pending.is_empty() {
            return;
        }
        info!(count = pending.len(), "Backtesting stored signals");

        for signal in &pending {
            match self.backtest_signal(signal).await {
                Ok(Some(fill)) => {
                    if let Err(e) = self.db.update_backtest_results(signal.id, &fill).await {
                        error!(id = signal.id, error = %e, "Failed to store backtest results");
                    }
                }
                Ok(None) => {}
                Err(e) => error!(id = signal.id, error = %e, "Signal backtest failed"),
            }
        }
    }

    /// Computes the matured horizon returns for one stored signal.
    async fn backtest_signal(&self, signal: &PendingSignal) -> Result<Option<BacktestFill>> {
        let entry = signal.price.to_f64().unwrap_or(0.0);
        if entry <= 0.0 {
            return Ok(None);
        }

        let mut fill = BacktestFill::default();
        let mut any = false;

        for days in &self.settings.backtest.hold_days {
            let target = signal.timestamp + chrono::Duration::days(*days as i64);
            let candles = self
                .source
                .historical_candles(
                    &signal.symbol,
                    "1D",
                    target - chrono::Duration::hours(1),
                    target + chrono::Duration::hours(1),
                )
                .await?;
            let Some(close) = candles.last().map(|c| c.close.to_f64().unwrap_or(0.0)) else {
                continue;
            };
            if close <= 0.0 {
                continue;
            }

            let return_pct = match signal.kind {
                SignalKind::Sell => (entry - close) / entry * 100.0,
                _ => (close - entry) / entry * 100.0,
            };

            // Only the standard horizons have columns in the store.
            match *days {
                7 => {
                    fill.price_7d = Some(close);
                    fill.return_7d = Some(return_pct);
                }
                14 => {
                    fill.price_14d = Some(close);
                    fill.return_14d = Some(return_pct);
                }
                30 => {
                    fill.price_30d = Some(close);
                    fill.return_30d = Some(return_pct);
                }
                _ => continue,
            }
            any = true;
        }

        if let Some(return_7d) = fill.return_7d {
            fill.is_successful = Some(return_7d > 0.0);
        }

        Ok(any.then_some(fill))
    }

    fn persist_positions(&self) {
        if let Err(e) = self.position_store.save(&self.tracker.snapshot(), Utc::now()) {
            error!(error = %e, "Failed to persist positions");
        }
    }

    async fn notify(&self, message: &str) {
        if let Some(notifier) = &self.notifier {
            if !notifier.send(message).await {
                error!("Notification delivery failed");
            }
        }
    }
}
