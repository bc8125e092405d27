use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error(transparent)]
    Core(#[from] permseek_core::error::CoreError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("lock contention persisted after {attempts} attempts: {last}")]
    LockContention { attempts: u32, last: libsql::Error },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    BadStatus(u16),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, QueueError>;
