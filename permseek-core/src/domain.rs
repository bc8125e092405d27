use crate::codec::{compare_arrays, count_inclusive};
use crate::error::{CoreError, Result};
use num_bigint::BigUint;
use std::cmp::Ordering;
use time::OffsetDateTime;

/// One queued work unit: an inclusive run of consecutive byte arrays.
///
/// Created once per line by the planner, deleted by a worker after its
/// array range is fully enumerated, match or not. No intermediate
/// "claimed" state is persisted; a crash mid-unit leaves the row queued
/// and the next run reprocesses it from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationRange {
    pub id: String,
    pub start_array: Vec<u8>,
    pub end_array: Vec<u8>,
    pub package_name: String,
    pub segment_name: String,
    pub array_length: usize,
    pub number_of_permutations: BigUint,
    pub processed: bool,
    pub reported_to_api: bool,
}

impl PermutationRange {
    /// Check the row invariants before handing the range to the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.array_length == 0 {
            return Err(CoreError::Validation(
                "array length must be positive".to_string(),
            ));
        }
        if self.start_array.len() != self.array_length
            || self.end_array.len() != self.array_length
        {
            return Err(CoreError::Validation(format!(
                "range {}: bound lengths {}/{} do not match array length {}",
                self.id,
                self.start_array.len(),
                self.end_array.len(),
                self.array_length
            )));
        }
        if compare_arrays(&self.start_array, &self.end_array) == Ordering::Greater {
            return Err(CoreError::Validation(format!(
                "range {}: start bound exceeds end bound",
                self.id
            )));
        }
        let span = count_inclusive(&self.start_array, &self.end_array);
        if span != self.number_of_permutations {
            return Err(CoreError::Invariant(format!(
                "range {}: recorded count {} differs from bound span {}",
                self.id, self.number_of_permutations, span
            )));
        }
        Ok(())
    }
}

/// A preimage hit. Append-only: never mutated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundMatch {
    pub byte_array: Vec<u8>,
    pub algorithm: String,
    pub digest_hex: String,
    pub discovered_at: OffsetDateTime,
}

/// Encode bytes as comma-separated decimal text, e.g. `"12,7,255,0"`.
///
/// This is the on-disk queue format; keep it stable for interop with
/// existing stores.
pub fn encode_csv(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of `encode_csv`. Rejects empty input, empty fields and values
/// outside 0..=255.
pub fn decode_csv(text: &str) -> Result<Vec<u8>> {
    if text.trim().is_empty() {
        return Err(CoreError::Validation(
            "empty byte-array text".to_string(),
        ));
    }
    text.split(',')
        .map(|field| {
            field.trim().parse::<u8>().map_err(|e| {
                CoreError::Validation(format!("bad byte field {field:?}: {e}"))
            })
        })
        .collect()
}
