// In crates/database/src/lib.rs

use std::collections::HashMap;
use std::str::FromStr;

use app_config::DatabaseSettings;
use chrono::NaiveDateTime;
use core_types::{MarketSnapshot, SentimentSample, Signal, SignalKind, Symbol};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

pub mod error;
pub mod positions;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use positions::JsonPositionStore;
pub use types::{
    BacktestFill, OverfittingReport, PendingSignal, SignalStatistics, overfitting_warnings,
};

/// The text timestamp format used throughout the store.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A wrapper around the `sqlx` connection pool.
#[derive(Debug, Clone)]
pub struct Db(SqlitePool);

/// Opens (creating if necessary) the SQLite database and ensures the schema.
pub async fn connect(settings: &DatabaseSettings) -> Result<Db> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .map_err(Error::OperationFailed)?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    let db = Db(pool);
    db.init_schema().await?;
    Ok(db)
}

impl Db {
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS market_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                fear_greed_index REAL,
                coins_data TEXT
            )
            "#,
        )
        .execute(&self.0)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                coin_symbol TEXT,
                signal_type TEXT,
                strength TEXT,
                price_at_signal REAL,
                fear_greed_at_signal REAL,
                reasons TEXT,
                tags TEXT,

                price_7d REAL,
                price_14d REAL,
                price_30d REAL,
                return_7d REAL,
                return_14d REAL,
                return_30d REAL,
                is_successful BOOLEAN
            )
            "#,
        )
        .execute(&self.0)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_market_timestamp ON market_data(timestamp)")
            .execute(&self.0)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_signal_timestamp ON signals(timestamp)")
            .execute(&self.0)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_signal_coin ON signals(coin_symbol)")
            .execute(&self.0)
            .await?;

        debug!("Database schema ready");
        Ok(())
    }

    /// Persists one market snapshot. Coin metrics are stored as a JSON blob.
    pub async fn save_snapshot(&self, snapshot: &MarketSnapshot) -> Result<()> {
        let coins_json = serde_json::to_string(&snapshot.coins)?;
        sqlx::query(
            "INSERT INTO market_data (timestamp, fear_greed_index, coins_data) VALUES (?1, ?2, ?3)",
        )
        .bind(snapshot.timestamp.format(TIMESTAMP_FORMAT).to_string())
        .bind(snapshot.fear_greed.as_ref().map(|f| f.value))
        .bind(coins_json)
        .execute(&self.0)
        .await?;
        Ok(())
    }

    /// Persists one signal together with the snapshot context it came from.
    pub async fn save_signal(&self, signal: &Signal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO signals (
                timestamp, coin_symbol, signal_type, strength,
                price_at_signal, fear_greed_at_signal, reasons, tags
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(signal.timestamp.format(TIMESTAMP_FORMAT).to_string())
        .bind(&signal.symbol.0)
        .bind(signal.kind.as_str())
        .bind(signal.strength.as_str())
        .bind(signal.source_price.and_then(|p| p.to_f64()))
        .bind(signal.source_sentiment)
        .bind(serde_json::to_string(&signal.reasons)?)
        .bind(serde_json::to_string(&signal.tags)?)
        .execute(&self.0)
        .await?;
        Ok(())
    }

    /// Sentiment readings from the last `hours` hours, oldest first.
    ///
    /// Timestamps come back in their raw text form; consumers decide how to
    /// treat rows that do not parse.
    pub async fn sentiment_history(&self, hours: u32) -> Result<Vec<SentimentSample>> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, fear_greed_index FROM market_data
            WHERE fear_greed_index IS NOT NULL
              AND timestamp >= datetime('now', ?1)
            ORDER BY timestamp
            "#,
        )
        .bind(format!("-{hours} hours"))
        .fetch_all(&self.0)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SentimentSample {
                timestamp: row.get::<String, _>("timestamp"),
                value: row.get::<f64, _>("fear_greed_index"),
            })
            .collect())
    }

    /// Funding-rate history for one coin from the last `hours` hours,
    /// oldest first. Rows whose JSON blob does not parse are skipped.
    pub async fn funding_history(&self, symbol: &Symbol, hours: u32) -> Result<Vec<f64>> {
        let rows = sqlx::query(
            "SELECT coins_data FROM market_data WHERE timestamp >= datetime('now', ?1) ORDER BY timestamp",
        )
        .bind(format!("-{hours} hours"))
        .fetch_all(&self.0)
        .await?;

        let mut rates = Vec::new();
        for row in rows {
            let blob: String = row.get("coins_data");
            let Ok(coins) = serde_json::from_str::<serde_json::Value>(&blob) else {
                continue;
            };
            if let Some(rate) = coins
                .get(&symbol.0)
                .and_then(|c| c.get("funding_rate"))
                .and_then(serde_json::Value::as_f64)
            {
                rates.push(rate);
            }
        }
        Ok(rates)
    }

    /// Stored signals that have no 7-day return yet, oldest first.
    ///
    /// Rows with malformed timestamps or unknown kinds are dropped, never
    /// coerced.
    pub async fn pending_backtest_signals(&self) -> Result<Vec<PendingSignal>> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, coin_symbol, signal_type, price_at_signal
            FROM signals
            WHERE return_7d IS NULL AND price_at_signal IS NOT NULL
            ORDER BY timestamp
            "#,
        )
        .fetch_all(&self.0)
        .await?;

        let mut pending = Vec::new();
        for row in rows {
            let raw_timestamp: String = row.get("timestamp");
            let Ok(naive) = NaiveDateTime::parse_from_str(&raw_timestamp, TIMESTAMP_FORMAT) else {
                warn!(timestamp = %raw_timestamp, "Skipping signal with malformed timestamp");
                continue;
            };
            let kind_text: String = row.get("signal_type");
            let Ok(kind) = kind_text.parse::<SignalKind>() else {
                warn!(kind = %kind_text, "Skipping signal with unknown kind");
                continue;
            };
            let Some(price) = Decimal::from_f64(row.get::<f64, _>("price_at_signal")) else {
                continue;
            };
            pending.push(PendingSignal {
                id: row.get("id"),
                timestamp: naive.and_utc(),
                symbol: Symbol(row.get("coin_symbol")),
                kind,
                price,
            });
        }
        Ok(pending)
    }

    /// Writes horizon prices/returns back onto a stored signal.
    pub async fn update_backtest_results(&self, signal_id: i64, fill: &BacktestFill) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE signals SET
                price_7d = ?1, price_14d = ?2, price_30d = ?3,
                return_7d = ?4, return_14d = ?5, return_30d = ?6,
                is_successful = ?7
            WHERE id = ?8
            "#,
        )
        .bind(fill.price_7d)
        .bind(fill.price_14d)
        .bind(fill.price_30d)
        .bind(fill.return_7d)
        .bind(fill.return_14d)
        .bind(fill.return_30d)
        .bind(fill.is_successful)
        .bind(signal_id)
        .execute(&self.0)
        .await?;
        Ok(())
    }

    /// Aggregate 7-day statistics per coin/kind, keyed `SYMBOL_KIND`.
    pub async fn signal_statistics(&self) -> Result<HashMap<String, SignalStatistics>> {
        let rows = sqlx::query(
            r#"
            SELECT
                COUNT(*) as total,
                SUM(CASE WHEN is_successful = 1 THEN 1 ELSE 0 END) as wins,
                AVG(return_7d) as avg_return,
                MIN(return_7d) as min_return,
                MAX(return_7d) as max_return,
                coin_symbol,
                signal_type
            FROM signals
            WHERE return_7d IS NOT NULL
            GROUP BY coin_symbol, signal_type
            "#,
        )
        .fetch_all(&self.0)
        .await?;

        let mut stats = HashMap::new();
        for row in rows {
            let total: i64 = row.get("total");
            let wins: i64 = row.get::<Option<i64>, _>("wins").unwrap_or(0);
            let avg_return: f64 = row.get::<Option<f64>, _>("avg_return").unwrap_or(0.0);
            let min_return: f64 = row.get::<Option<f64>, _>("min_return").unwrap_or(0.0);
            let max_return: f64 = row.get::<Option<f64>, _>("max_return").unwrap_or(0.0);
            let symbol: String = row.get("coin_symbol");
            let kind: String = row.get("signal_type");

            stats.insert(
                format!("{symbol}_{kind}"),
                SignalStatistics {
                    total,
                    wins,
                    losses: total - wins,
                    win_rate_pct: if total > 0 {
                        wins as f64 / total as f64 * 100.0
                    } else {
                        0.0
                    },
                    avg_return_pct: avg_return,
                    min_return_pct: min_return,
                    max_return_pct: max_return,
                    volatility_pct: (max_return - min_return) / 2.0,
                },
            );
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_types::{CoinMetrics, SentimentReading, Strength};
    use rust_decimal_macros::dec;

    async fn test_db() -> (Db, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = connect(&DatabaseSettings {
            url: format!("sqlite://{}", path.display()),
        })
        .await
        .unwrap();
        (db, dir)
    }

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            timestamp: Utc::now(),
            fear_greed: Some(SentimentReading {
                value: 22.0,
                classification: "Extreme Fear".to_string(),
                timestamp: Utc::now(),
            }),
            coins: [(
                Symbol::new("BTC"),
                CoinMetrics {
                    price: Some(dec!(50_000)),
                    funding_rate: Some(-0.012),
                    long_short: None,
                },
            )]
            .into_iter()
            .collect(),
        }
    }

    #[tokio::test]
    async fn snapshots_feed_the_history_queries() {
        let (db, _dir) = test_db().await;
        db.save_snapshot(&snapshot()).await.unwrap();
        db.save_snapshot(&snapshot()).await.unwrap();

        let sentiment = db.sentiment_history(72).await.unwrap();
        assert_eq!(sentiment.len(), 2);
        assert!((sentiment[0].value - 22.0).abs() < 1e-9);

        let funding = db.funding_history(&Symbol::new("BTC"), 168).await.unwrap();
        assert_eq!(funding.len(), 2);
        assert!((funding[0] - (-0.012)).abs() < 1e-9);

        // An unknown coin simply has no history.
        let none = db.funding_history(&Symbol::new("SOL"), 168).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn signals_round_trip_through_the_backtest_queue() {
        let (db, _dir) = test_db().await;
        let signal = Signal {
            symbol: Symbol::new("BTC"),
            kind: core_types::SignalKind::Buy,
            strength: Strength::Strong,
            reasons: vec!["fear & greed index at 20".to_string()],
            tags: vec!["#dip-buy".to_string()],
            source_price: Some(dec!(48_000)),
            source_sentiment: Some(20.0),
            timestamp: Utc::now(),
        };
        db.save_signal(&signal).await.unwrap();

        let pending = db.pending_backtest_signals().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].symbol, Symbol::new("BTC"));
        assert_eq!(pending[0].kind, core_types::SignalKind::Buy);

        db.update_backtest_results(
            pending[0].id,
            &BacktestFill {
                price_7d: Some(50_400.0),
                return_7d: Some(5.0),
                is_successful: Some(true),
                ..BacktestFill::default()
            },
        )
        .await
        .unwrap();

        // The signal is no longer pending, and shows up in the statistics.
        assert!(db.pending_backtest_signals().await.unwrap().is_empty());
        let stats = db.signal_statistics().await.unwrap();
        let s = &stats["BTC_BUY"];
        assert_eq!(s.total, 1);
        assert_eq!(s.wins, 1);
        assert!((s.avg_return_pct - 5.0).abs() < 1e-9);
    }
}
