use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, CoreError>;
