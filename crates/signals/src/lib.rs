// In crates/signals/src/lib.rs

pub mod complexity;
pub mod engine;
pub mod percentile;
pub mod reversal;
pub mod types;

pub use complexity::{ComplexityGrade, StrategyComplexity};
pub use engine::{SignalEngine, SnapshotContext};
pub use percentile::PercentileScorer;
pub use reversal::ReversalDetector;
pub use types::{
    ResonanceSettings, ReversalSettings, SignalSettings, StrategyToggles, ThresholdSettings,
};
