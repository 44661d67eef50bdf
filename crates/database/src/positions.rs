// In crates/database/src/positions.rs

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use risk::PositionRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// The single JSON document the tracked positions are persisted as.
#[derive(Debug, Serialize, Deserialize)]
struct PositionsDocument {
    updated_at: DateTime<Utc>,
    positions: Vec<PositionRecord>,
}

/// Persists the position list as one JSON document on disk.
///
/// Serialization happens only here, at the storage boundary; the tracker
/// itself works on in-memory positions.
#[derive(Debug, Clone)]
pub struct JsonPositionStore {
    path: PathBuf,
}

impl JsonPositionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Loads all persisted positions. A missing file is an empty store.
    pub fn load(&self) -> Result<Vec<PositionRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let document: PositionsDocument = serde_json::from_str(&content)?;
        debug!(count = document.positions.len(), "Positions loaded");
        Ok(document.positions)
    }

    /// Writes the full position list, replacing the previous document.
    pub fn save(&self, positions: &[PositionRecord], updated_at: DateTime<Utc>) -> Result<()> {
        let document = PositionsDocument {
            updated_at,
            positions: positions.to_vec(),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&document)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Symbol;
    use risk::{Position, PositionStatus};
    use rust_decimal_macros::dec;

    #[test]
    fn round_trips_the_persisted_record_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPositionStore::new(dir.path().join("positions.json"));

        let mut position = Position::open(
            Symbol::new("BTC"),
            dec!(50_000),
            dec!(1),
            "2024-01-01".parse().unwrap(),
            vec!["panic reversal confirmed".to_string()],
        );
        position.tick(dec!(55_000));
        let records = vec![PositionRecord::from(&position)];

        store.save(&records, Utc::now()).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, records);
        assert_eq!(loaded[0].status, PositionStatus::Open);
        assert_eq!(loaded[0].max_price, dec!(55_000));
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPositionStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn persisted_json_uses_the_documented_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPositionStore::new(dir.path().join("positions.json"));
        let position = Position::open(
            Symbol::new("ETH"),
            dec!(3_000),
            dec!(2),
            "2024-02-01".parse().unwrap(),
            vec![],
        );
        store
            .save(&[PositionRecord::from(&position)], Utc::now())
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join("positions.json")).unwrap();
        for field in [
            "\"asset\"",
            "\"entryPrice\"",
            "\"entryDate\"",
            "\"signalReasons\"",
            "\"maxPrice\"",
            "\"currentPrice\"",
            "\"status\"",
            "\"stopTriggeredAt\"",
            "\"stopPrice\"",
        ] {
            assert!(raw.contains(field), "missing field {field}");
        }
    }
}
