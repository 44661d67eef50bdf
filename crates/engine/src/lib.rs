// In crates/engine/src/lib.rs

pub mod monitor;

pub use monitor::Monitor;

/// How much sentiment history the reversal check looks at.
pub const SENTIMENT_HISTORY_HOURS: u32 = 72;

/// How much funding-rate history the percentile score looks at (7 days).
pub const FUNDING_HISTORY_HOURS: u32 = 168;
