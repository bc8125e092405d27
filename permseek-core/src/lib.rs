#![forbid(unsafe_code)]

pub mod error;

pub mod cancel;
pub mod codec;
pub mod config;
pub mod digest;
pub mod domain;
pub mod generate;
pub mod plan;
pub mod progress;
pub mod search;
pub mod sink;

// Re-exports: stable API surface
pub use cancel::CancelToken;
pub use codec::{array_to_index, compare_arrays, index_to_array, space_size};
pub use config::Config;
pub use digest::{DigestProvider, NamedDigest, StandardDigests};
pub use domain::{FoundMatch, PermutationRange, decode_csv, encode_csv};
pub use plan::{plan_package, total_packages};
pub use search::{SearchOptions, SearchReport, search_range, search_single};
pub use sink::{FileSink, MatchSink, VecSink};
