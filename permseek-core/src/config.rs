use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_db_path() -> String {
    "permutations.db".to_string()
}
fn default_match_file() -> String {
    "found_matches.txt".to_string()
}
fn default_pack_base_url() -> String {
    "https://example.com".to_string()
}
fn default_report_interval_secs() -> u64 {
    60
}
fn default_channel_capacity() -> usize {
    10_000
}
fn default_batch_size() -> u32 {
    100
}

/// Generation- and search-time sizing, read from a JSON file. Not
/// persisted with the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub num_workers: usize,
    /// Target digest as a hex string.
    pub existing_hash: String,
    pub max_permutations_per_line: u64,
    pub max_ranges_per_segment: u64,
    pub max_segments_per_package: u64,

    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_match_file")]
    pub match_file: String,
    #[serde(default = "default_pack_base_url")]
    pub pack_base_url: String,
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let cfg: Config = serde_json::from_str(&text)
            .map_err(|e| CoreError::Config(format!("bad config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(CoreError::Config("num_workers must be >= 1".to_string()));
        }
        if self.max_permutations_per_line == 0
            || self.max_ranges_per_segment == 0
            || self.max_segments_per_package == 0
        {
            return Err(CoreError::Config(
                "line/segment/package sizes must be >= 1".to_string(),
            ));
        }
        if self.existing_hash.is_empty() {
            return Err(CoreError::Config("existing_hash is empty".to_string()));
        }
        hex::decode(self.existing_hash.trim())
            .map_err(|e| CoreError::Config(format!("existing_hash is not hex: {e}")))?;
        if self.channel_capacity == 0 || self.batch_size == 0 {
            return Err(CoreError::Config(
                "channel_capacity and batch_size must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
