#![forbid(unsafe_code)]

pub mod error;

pub mod distributor;
pub mod retry;
pub mod runner;
pub mod store;

// Re-exports: stable API surface
pub use distributor::PackDistributor;
pub use runner::{DrainReport, drain};
pub use store::SqliteQueue;
