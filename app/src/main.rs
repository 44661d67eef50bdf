// In app/src/main.rs

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

use api_client::{FearGreedClient, PriceHistoryClient};
use app_config::Settings;
use backtester::simulate::simulate_buy_signals;
use backtester::{Backtester, print_report};
use core_types::{PriceSeries, Symbol};
use database::overfitting_warnings;
use engine::Monitor;
use signals::{ReversalDetector, StrategyComplexity};

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "A crypto sentiment monitor with signal backtesting.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the live monitoring loop.
    Run,

    /// Runs a historical backtest of the sentiment strategy.
    Backtest {
        /// How many days of history to replay.
        #[arg(long, default_value_t = 365)]
        days: usize,

        /// Coins to backtest (e.g. "BTC"); defaults to the configured coins.
        #[arg(short, long)]
        coins: Vec<String>,

        /// Force the walk-forward train/test validation on.
        #[arg(long)]
        validate: bool,
    },

    /// Shows stored signal statistics and overfitting warnings.
    Stats,
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::filter::Targets::new()
            .with_target("sqlx::query", tracing::Level::WARN) // Disable sqlx query debug logs
            .with_default(tracing::Level::INFO),
    );
    tracing_subscriber::registry().with(fmt_layer).init();

    // Parse command-line arguments.
    let cli = Cli::parse();

    tracing::info!("Starting sentiment monitor");

    let settings = app_config::load_settings()?;

    match cli.command {
        Commands::Run => {
            let mut monitor = Monitor::new(settings).await?;
            monitor.run().await?;
        }
        Commands::Backtest {
            days,
            coins,
            validate,
        } => {
            run_backtest(settings, days, coins, validate).await?;
        }
        Commands::Stats => {
            show_statistics(settings).await?;
        }
    }

    Ok(())
}

/// Fetches sentiment and price history, simulates the signals the strategy
/// would have produced, and replays them through the cost-aware simulator.
async fn run_backtest(
    mut settings: Settings,
    days: usize,
    coins: Vec<String>,
    validate: bool,
) -> Result<()> {
    if validate {
        settings.backtest.validate_out_of_sample = true;
    }
    let coins = if coins.is_empty() {
        settings.enabled_coins()
    } else {
        coins
    };

    println!("\n=== Historical backtest ===");
    println!("  Fear buy threshold:  < {}", settings.thresholds.fear_buy);
    println!(
        "  Reversal periods:    {}",
        settings.reversal.consecutive_periods
    );
    println!(
        "  Stop loss:           {:?} {}%",
        settings.risk.stop_loss_type, settings.risk.stop_loss_pct
    );
    println!("  Hold days:           {:?}", settings.backtest.hold_days);
    println!("  Coins:               {}", coins.join(", "));

    let sentiment_client = FearGreedClient::new();
    let sentiment = sentiment_client.history(days).await?;
    anyhow::ensure!(!sentiment.is_empty(), "no sentiment history available");
    tracing::info!(days = sentiment.len(), "Sentiment history fetched");

    let price_client = PriceHistoryClient::new();
    let mut prices: HashMap<Symbol, PriceSeries> = HashMap::new();
    for coin in &coins {
        let symbol = Symbol::new(coin.to_uppercase());
        match price_client.daily_series(&symbol, days).await {
            Ok(series) if !series.is_empty() => {
                tracing::info!(symbol = %symbol, days = series.len(), "Price history fetched");
                prices.insert(symbol, series);
            }
            Ok(_) => tracing::warn!(symbol = %symbol, "No price history, skipping coin"),
            Err(e) => tracing::warn!(symbol = %symbol, error = %e, "Price fetch failed, skipping coin"),
        }
        // Be polite to the free endpoint.
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    anyhow::ensure!(!prices.is_empty(), "no price history available");

    let detector = ReversalDetector::new(settings.reversal.clone());
    let signals = simulate_buy_signals(&sentiment, &prices, &settings.thresholds, &detector);
    println!(
        "\nSimulated {} buy signals over {} days",
        signals.len(),
        sentiment.len()
    );

    let backtester = Backtester::new(settings.backtest.clone(), settings.risk.clone());
    let run = backtester.run(&signals, &prices)?;
    print_report(&run);

    let report = serde_json::json!({
        "report": run.report,
        "validation": run.validation,
        "outcomes": run.outcomes,
    });
    std::fs::write("backtest_report.json", serde_json::to_string_pretty(&report)?)?;
    println!("\nReport saved to backtest_report.json");

    Ok(())
}

/// Prints the stored per-coin statistics and the overfitting analysis.
async fn show_statistics(settings: Settings) -> Result<()> {
    let db = database::connect(&settings.database).await?;
    let stats = db.signal_statistics().await?;
    let warnings = overfitting_warnings(&stats);

    println!("\n=== Signal backtest statistics (7-day returns) ===");
    if stats.is_empty() {
        println!("\nNo backtest data yet; run the monitor to collect signals.");
        return Ok(());
    }

    let mut keys: Vec<&String> = stats.keys().collect();
    keys.sort();
    for key in keys {
        let s = &stats[key];
        println!("\n[{key}]");
        println!("  Signals:     {}", s.total);
        println!("  Wins/losses: {} / {}", s.wins, s.losses);
        println!("  Win rate:    {:.1}%", s.win_rate_pct);
        println!("  Avg return:  {:+.2}%", s.avg_return_pct);
        println!("  Best:        {:+.2}%", s.max_return_pct);
        println!("  Worst:       {:+.2}%", s.min_return_pct);
        println!("  Volatility:  {:.1}%", s.volatility_pct);
    }

    println!("\n=== Overfitting analysis ===");
    if warnings.warnings.is_empty() {
        println!("No obvious overfitting problems found.");
    } else {
        for warning in &warnings.warnings {
            println!("  ! {warning}");
        }
    }
    println!("Risk score: {}", warnings.risk_level);

    let complexity = StrategyComplexity::assess(&settings.strategy);
    println!("\n{}", complexity.summary());

    Ok(())
}
