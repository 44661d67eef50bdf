// In crates/risk/src/lib.rs

use core_types::Symbol;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub mod error;
pub mod position;
pub mod stop;
pub mod tracker;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use position::{Position, PositionRecord, PositionStatus};
pub use stop::StopLine;
pub use tracker::{PositionTracker, PriceUpdateEvents, TrackerStatus};
pub use types::{PositionSettings, PyramidingSettings, RiskSettings, StopPolicy};

/// Decides how large a fill should be when a signal opens or extends a
/// position.
///
/// Real position sizing (a percentage of capital, volatility targeting, ...)
/// is an external decision this crate does not make; the default policy simply
/// assigns one unit per fill.
pub trait SizingPolicy: Send + Sync {
    /// The name of the sizing policy.
    fn name(&self) -> &'static str;

    /// The amount to fill for `symbol` at `price`.
    fn amount(&self, symbol: &Symbol, price: Decimal) -> Decimal;
}

/// One unit per fill, regardless of asset or price.
#[derive(Debug, Clone)]
pub struct FixedUnitSizing {
    unit: Decimal,
}

impl FixedUnitSizing {
    pub fn new(unit: Decimal) -> Self {
        Self { unit }
    }
}

impl Default for FixedUnitSizing {
    fn default() -> Self {
        Self { unit: dec!(1) }
    }
}

impl SizingPolicy for FixedUnitSizing {
    fn name(&self) -> &'static str {
        "FixedUnitSizing"
    }

    fn amount(&self, _symbol: &Symbol, _price: Decimal) -> Decimal {
        self.unit
    }
}
