use crate::cancel::CancelToken;
use crate::digest::DigestProvider;
use crate::domain::{FoundMatch, PermutationRange};
use crate::error::{CoreError, Result};
use crate::generate::generate;
use crate::progress::{self, SharedCounters};
use crate::sink::MatchSink;
use crossbeam_channel::bounded;
use num_bigint::BigUint;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::OffsetDateTime;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub num_workers: usize,
    /// Bounded-channel capacity between the feeder and the workers;
    /// backpressure so generation cannot run far ahead of hashing.
    pub channel_capacity: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            num_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            channel_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    /// Arrays actually hashed. Equals the unit's inclusive count unless a
    /// match cancelled the run early.
    pub visited: BigUint,
    pub matches_found: usize,
    pub cancelled: bool,
}

/// Enumerate and hash every array in `range`, comparing each digest
/// against `target_hex`.
///
/// A feeder thread streams candidates over a bounded channel to
/// `num_workers` hashing threads. On any digest equality a `FoundMatch`
/// goes to the sink and the shared token is cancelled: a soft stop, so
/// candidates already dequeued still finish and later matches are still
/// recorded. First-match ordering across workers is not guaranteed.
/// Absent a match, every array in the range is visited exactly once.
pub fn search_range(
    range: &PermutationRange,
    provider: &dyn DigestProvider,
    target_hex: &str,
    opts: &SearchOptions,
    counters: &SharedCounters,
    sink: &dyn MatchSink,
) -> Result<SearchReport> {
    range.validate()?;
    let target = target_hex.trim().to_ascii_lowercase();
    if target.is_empty() {
        return Err(CoreError::Validation("target hash is empty".to_string()));
    }

    let cancel = CancelToken::new();
    let (tx, rx) = bounded::<Vec<u8>>(opts.channel_capacity.max(1));
    let matches_found = AtomicUsize::new(0);

    let visited = std::thread::scope(|s| -> Result<u64> {
        let feeder = {
            let cancel = cancel.clone();
            let start = &range.start_array;
            let stop = &range.end_array;
            s.spawn(move || generate(start, stop, &tx, &cancel))
        };

        let mut workers = Vec::with_capacity(opts.num_workers.max(1));
        for _ in 0..opts.num_workers.max(1) {
            let rx = rx.clone();
            let cancel = cancel.clone();
            let target = target.as_str();
            let matches_found = &matches_found;
            workers.push(s.spawn(move || -> Result<u64> {
                let mut visited = 0u64;
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let candidate = match rx.recv() {
                        Ok(c) => c,
                        Err(_) => break, // feeder done, channel drained
                    };
                    for d in provider.digests(&candidate) {
                        if d.hex.eq_ignore_ascii_case(target) {
                            let m = FoundMatch {
                                byte_array: candidate.clone(),
                                algorithm: d.algorithm.to_string(),
                                digest_hex: d.hex,
                                discovered_at: OffsetDateTime::now_utc(),
                            };
                            sink.record(&m)?;
                            matches_found.fetch_add(1, Ordering::Relaxed);
                            cancel.cancel();
                        }
                    }
                    visited += 1;
                    progress::lock(counters).record_processed();
                }
                Ok(visited)
            }));
        }
        drop(rx);

        let mut visited = 0u64;
        for w in workers {
            match w.join() {
                Ok(r) => visited += r?,
                Err(p) => std::panic::resume_unwind(p),
            }
        }
        match feeder.join() {
            Ok(r) => r?,
            Err(p) => std::panic::resume_unwind(p),
        }
        Ok(visited)
    })?;

    Ok(SearchReport {
        visited: BigUint::from(visited),
        matches_found: matches_found.load(Ordering::Relaxed),
        cancelled: cancel.is_cancelled(),
    })
}

/// Fast path for collapsed units (`number_of_permutations == 1`): hash one
/// array without spinning up the pipeline.
pub fn search_single(
    array: &[u8],
    provider: &dyn DigestProvider,
    target_hex: &str,
    counters: &SharedCounters,
    sink: &dyn MatchSink,
) -> Result<SearchReport> {
    if array.is_empty() {
        return Err(CoreError::Validation(
            "array length must be positive".to_string(),
        ));
    }
    let target = target_hex.trim().to_ascii_lowercase();
    let mut matches_found = 0usize;
    for d in provider.digests(array) {
        if d.hex.eq_ignore_ascii_case(&target) {
            sink.record(&FoundMatch {
                byte_array: array.to_vec(),
                algorithm: d.algorithm.to_string(),
                digest_hex: d.hex,
                discovered_at: OffsetDateTime::now_utc(),
            })?;
            matches_found += 1;
        }
    }
    progress::lock(counters).record_processed();
    Ok(SearchReport {
        visited: BigUint::from(1u32),
        matches_found,
        cancelled: false,
    })
}
