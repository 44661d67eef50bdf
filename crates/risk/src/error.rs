// In crates/risk/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("A position for {0} is already open")]
    AlreadyOpen(String),

    #[error("No open position for {0}")]
    NotOpen(String),

    #[error("Invalid risk parameters: {0}")]
    InvalidParameters(String),
}

pub type Result<T> = std::result::Result<T, Error>;
