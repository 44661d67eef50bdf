// In crates/core-types/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown signal kind: {0}")]
    UnknownSignalKind(String),

    #[error("Unknown signal strength: {0}")]
    UnknownStrength(String),
}

pub type Result<T> = std::result::Result<T, Error>;
