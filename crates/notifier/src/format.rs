// In crates/notifier/src/format.rs

use chrono::{DateTime, Utc};
use core_types::{MarketSnapshot, Signal, SignalKind};
use events::{NewHighEvent, StopEvent, StopRaisedEvent};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use signals::StrategyComplexity;

/// Formats a price for display, with thousands separators above $1000.
pub fn format_price(price: Option<Decimal>) -> String {
    let Some(price) = price else {
        return "N/A".to_string();
    };
    let value = price.to_f64().unwrap_or(0.0);
    let formatted = format!("{value:.2}");
    if value < 1000.0 {
        return format!("${formatted}");
    }
    let (whole, cents) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    let mut digits = whole.to_string();
    let mut grouped = String::new();
    while digits.len() > 3 {
        let tail = digits.split_off(digits.len() - 3);
        grouped = format!(",{tail}{grouped}");
    }
    format!("${digits}{grouped}.{cents}")
}

/// Formats a percentage with an explicit sign on gains.
pub fn format_percentage(value: f64) -> String {
    if value > 0.0 {
        format!("+{value:.2}%")
    } else {
        format!("{value:.2}%")
    }
}

/// The alert message for a batch of freshly generated signals.
pub fn signal_message(
    snapshot: &MarketSnapshot,
    signals: &[Signal],
    complexity: &StrategyComplexity,
    exchange: &str,
) -> String {
    let mut msg = String::from("<b>\u{1F6A8} Sentiment alert</b>\n");
    msg.push_str(&format!(
        "\u{23F0} {}\n",
        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S")
    ));
    msg.push_str(&format!("\u{1F4E1} Exchange: {}\n", exchange.to_uppercase()));
    msg.push_str(&format!("\u{1F3AF} Strategy risk: {}\n\n", complexity.grade));

    for signal in signals {
        let action = match signal.kind {
            SignalKind::Buy => "\u{1F4C8} Buy",
            SignalKind::Add => "\u{2795} Add",
            SignalKind::Sell => "\u{1F4C9} Sell",
        };
        msg.push_str(&format!("<b>{action} signal - {}</b>\n", signal.symbol));
        msg.push_str(&format!("Strength: {}\n", signal.strength));
        msg.push_str(&format!("Price: {}\n", format_price(signal.source_price)));
        msg.push_str("Reasons:\n");
        for reason in &signal.reasons {
            msg.push_str(&format!("  \u{2022} {reason}\n"));
        }
        msg.push_str(&format!("Tags: {}\n\n", signal.tags.join(" ")));
    }

    if let Some(fear_greed) = &snapshot.fear_greed {
        msg.push_str("<b>\u{1F4CA} Market overview</b>\n");
        msg.push_str(&format!(
            "Fear & greed index: {:.0} ({})\n\n",
            fear_greed.value, fear_greed.classification
        ));
    }

    msg.push_str("<b>\u{1F4B0} Prices</b>\n");
    let mut coins: Vec<_> = snapshot.coins.iter().collect();
    coins.sort_by(|a, b| a.0.cmp(b.0));
    for (symbol, metrics) in coins {
        if metrics.price.is_some() {
            msg.push_str(&format!("{symbol}: {}\n", format_price(metrics.price)));
        }
    }

    msg
}

/// The alert message for a triggered stop loss.
pub fn stop_message(event: &StopEvent) -> String {
    format!(
        "\u{1F6D1} <b>Stop loss triggered</b>\n\n\
         Coin: {}\n\
         Entry: {}\n\
         Stop: {}\n\
         Return: {}\n\
         Peak: {}\n\
         Drawdown: {:.1}%\n\n\
         \u{26A0} Consider closing the position",
        event.symbol,
        format_price(Some(event.entry_price)),
        format_price(Some(event.stop_price)),
        format_percentage(event.return_pct),
        format_price(Some(event.max_price)),
        event.drawdown_pct,
    )
}

/// Notification for a position clearing its entry price for the first time.
pub fn new_high_message(event: &NewHighEvent) -> String {
    format!(
        "\u{1F680} <b>{} back above entry</b>\nPrice: {} ({})",
        event.symbol,
        format_price(Some(event.price)),
        format_percentage(event.return_pct),
    )
}

/// Notification for a meaningfully raised trailing stop.
pub fn stop_raised_message(event: &StopRaisedEvent) -> String {
    format!(
        "\u{1F512} <b>{} stop line raised</b>\n{} \u{2192} {} (+{:.1}%)",
        event.symbol,
        format_price(Some(event.previous_line)),
        format_price(Some(event.new_line)),
        event.raised_pct,
    )
}

/// The startup banner, including the strategy-complexity summary.
pub fn startup_message(
    exchange: &str,
    coins: &[String],
    check_interval_secs: u64,
    started_at: DateTime<Utc>,
    complexity: &StrategyComplexity,
) -> String {
    format!(
        "\u{1F916} <b>Sentiment monitor started</b>\n\n\
         \u{1F4E1} Exchange: {}\n\
         \u{1F4B0} Coins: {}\n\
         \u{23F1} Check interval: {} min\n\
         \u{23F0} Started: {}\n\n{}",
        exchange.to_uppercase(),
        coins.join(", "),
        check_interval_secs / 60,
        started_at.format("%Y-%m-%d %H:%M:%S"),
        complexity.summary(),
    )
}
