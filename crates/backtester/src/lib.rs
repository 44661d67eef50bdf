// In crates/backtester/src/lib.rs

pub mod simulate;
pub mod types;

use std::collections::HashMap;

use analytics::{
    AnalyticsEngine, BacktestReport, ExitReason, HorizonReturn, SignalOutcome, ValidationReport,
};
use chrono::NaiveDate;
use core_types::{PriceSeries, Signal, SignalKind, Symbol};
use risk::{RiskSettings, StopLine};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use tracing::{debug, info};

pub use types::BacktestSettings;

/// The outcome of one full backtest run.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub outcomes: Vec<SignalOutcome>,
    pub report: BacktestReport,
    pub validation: Option<ValidationReport>,
}

/// Replays historical buy signals day-by-day through the same stop-line logic
/// the live tracker uses, producing cost-adjusted returns per signal.
pub struct Backtester {
    settings: BacktestSettings,
    risk: RiskSettings,
}

impl Backtester {
    pub fn new(settings: BacktestSettings, risk: RiskSettings) -> Self {
        Self { settings, risk }
    }

    /// Runs the replay over all BUY signals and aggregates the report.
    ///
    /// Signals for assets without a price series, and signals with no forward
    /// prices at all, are omitted rather than failing the run.
    pub fn run(
        &self,
        signals: &[Signal],
        prices: &HashMap<Symbol, PriceSeries>,
    ) -> anyhow::Result<BacktestRun> {
        let mut outcomes = Vec::new();

        for signal in signals {
            if signal.kind != SignalKind::Buy {
                continue;
            }
            let Some(entry_price) = signal.source_price else {
                continue;
            };
            let Some(series) = prices.get(&signal.symbol) else {
                debug!(symbol = %signal.symbol, "No price series for signal, skipping");
                continue;
            };
            let signal_date = signal.timestamp.date_naive();
            if let Some(outcome) = self.walk_signal(&signal.symbol, signal_date, entry_price, series)
            {
                outcomes.push(outcome);
            }
        }

        info!(
            signals = signals.len(),
            replayed = outcomes.len(),
            "Backtest replay finished"
        );

        let engine = AnalyticsEngine::new();
        let report = engine.report(&outcomes, &self.settings.hold_days);
        let validation = if self.settings.validate_out_of_sample {
            engine.validate(&outcomes, self.settings.train_test_split)
        } else {
            None
        };

        Ok(BacktestRun {
            outcomes,
            report,
            validation,
        })
    }

    /// Walks one signal forward day-by-day up to the longest horizon.
    fn walk_signal(
        &self,
        symbol: &Symbol,
        signal_date: NaiveDate,
        entry_price: Decimal,
        series: &PriceSeries,
    ) -> Option<SignalOutcome> {
        let max_hold = self.settings.max_hold_days();
        if max_hold == 0 || entry_price.is_zero() {
            return None;
        }
        let total_cost = self.settings.total_cost_pct();

        let mut stop = StopLine::new(&self.risk, entry_price);
        let mut max_drawdown = 0.0_f64;
        let mut horizon_returns: Vec<HorizonReturn> = Vec::new();
        let mut exit: Option<(u32, Decimal, ExitReason)> = None;
        let mut last_seen: Option<(u32, Decimal)> = None;

        for day in 1..=max_hold {
            // A day without a price is omitted, not an error.
            let Some(price) = series.close_after(signal_date, day as i64) else {
                continue;
            };

            let line = stop.observe(price);
            let drawdown = stop.drawdown_pct(price);
            if drawdown < max_drawdown {
                max_drawdown = drawdown;
            }

            if price <= line {
                // Intraday prices are unavailable in a daily replay; the stop
                // line itself is the approximate fill.
                exit = Some((day, line, ExitReason::StopLoss));
                break;
            }

            if self.settings.hold_days.contains(&day) {
                let gross = pct_return(entry_price, price);
                horizon_returns.push(HorizonReturn {
                    days: day,
                    gross_pct: gross,
                    net_pct: gross - total_cost,
                });
            }

            last_seen = Some((day, price));
        }

        let (exit_day, exit_price, exit_reason) = match exit {
            Some(exit) => exit,
            // Walked the whole window without stopping: exit at the last
            // price the series offered.
            None => {
                let (day, price) = last_seen?;
                (day, price, ExitReason::Hold)
            }
        };

        let gross = pct_return(entry_price, exit_price);
        Some(SignalOutcome {
            symbol: symbol.clone(),
            signal_date,
            entry_price,
            horizon_returns,
            exit_reason,
            exit_price,
            exit_day,
            gross_return_pct: gross,
            net_return_pct: gross - total_cost,
            max_drawdown_pct: max_drawdown,
            total_cost_pct: total_cost,
        })
    }
}

fn pct_return(entry: Decimal, price: Decimal) -> f64 {
    if entry.is_zero() {
        return 0.0;
    }
    ((price - entry) / entry).to_f64().unwrap_or(0.0) * 100.0
}

/// Prints the run report in a readable format.
pub fn print_report(run: &BacktestRun) {
    let report = &run.report;
    println!("\n--- Backtest Report ---");
    println!("------------------------------------");
    println!("Signals replayed:      {}", report.signal_count);
    println!(
        "Stop-loss exits:       {} ({:.1}%)",
        report.stop_count, report.stop_rate_pct
    );
    println!("Win rate:              {:.1}%", report.win_rate_pct);
    println!(
        "Net return:            avg {:+.2}% | min {:+.2}% | max {:+.2}%",
        report.avg_net_return_pct, report.min_net_return_pct, report.max_net_return_pct
    );
    println!(
        "Gross return:          avg {:+.2}% | min {:+.2}% | max {:+.2}%",
        report.avg_gross_return_pct, report.min_gross_return_pct, report.max_gross_return_pct
    );
    println!("Cost drag:             {:.2}%", report.cost_drag_pct);
    println!("Avg max drawdown:      {:.2}%", report.avg_max_drawdown_pct);

    if !report.horizons.is_empty() {
        println!("------------------------------------");
        for horizon in &report.horizons {
            println!(
                "{:>3}d hold: avg {:+.2}% | win rate {:.1}% ({} samples)",
                horizon.days, horizon.avg_net_pct, horizon.win_rate_pct, horizon.sample_size
            );
        }
    }

    if let Some(validation) = &run.validation {
        println!("------------------------------------");
        println!("Walk-forward validation ({} train / {} test):", validation.train_count, validation.test_count);
        println!(
            "  Avg return:  train {:+.2}% -> test {:+.2}% (degradation {:+.2}%)",
            validation.train_avg_return_pct,
            validation.test_avg_return_pct,
            validation.degradation_pct
        );
        println!(
            "  Win rate:    train {:.1}% -> test {:.1}% (drop {:+.1} pts)",
            validation.train_win_rate_pct, validation.test_win_rate_pct, validation.win_rate_drop_pct
        );
        println!("  Overfitting risk: {}", validation.risk);
        if validation.win_rate_flag {
            println!("  Warning: win rate degrades sharply out of sample");
        }
    }
    println!("------------------------------------");
}
