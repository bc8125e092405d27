use crate::error::Result;
use crate::store::SqliteQueue;
use num_bigint::BigUint;
use num_traits::One;
use permseek_core::config::Config;
use permseek_core::digest::DigestProvider;
use permseek_core::progress::{self, ProgressReporter};
use permseek_core::search::{SearchOptions, search_range, search_single};
use permseek_core::sink::MatchSink;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub ranges_processed: u64,
    pub matches_found: usize,
}

/// Run the queue to empty: pull unprocessed units, enumerate and hash each
/// one on the blocking pool, then delete it (the ack).
///
/// A unit that fails validation or search is logged and skipped for this
/// run; its row stays queued and the next run retries it from scratch
/// (at-least-once, idempotent recomputation). A match stops the drain
/// after the current unit is acked.
pub async fn drain(
    queue: &SqliteQueue,
    config: &Config,
    provider: Arc<dyn DigestProvider>,
    sink: Arc<dyn MatchSink>,
    singles_only: bool,
) -> Result<DrainReport> {
    let remaining = queue.remaining_permutations().await?;
    let counters = progress::new_shared(remaining);
    let reporter = ProgressReporter::start(
        counters.clone(),
        Duration::from_secs(config.report_interval_secs.max(1)),
    );

    let opts = SearchOptions {
        num_workers: config.num_workers,
        channel_capacity: config.channel_capacity,
    };
    let target = config.existing_hash.clone();
    let mut report = DrainReport::default();
    let mut skipped: HashSet<String> = HashSet::new();

    'drain: loop {
        // Widen the fetch window past the rows skipped this run so a
        // cluster of failing rows at the head of the scan order cannot
        // starve the units behind them.
        let fetch_limit = config.batch_size.saturating_add(skipped.len() as u32);
        let batch = if singles_only {
            queue.get_single_permutations(fetch_limit).await?
        } else {
            queue.get_unprocessed(fetch_limit).await?
        };
        let batch: Vec<_> = batch
            .into_iter()
            .filter(|r| !skipped.contains(&r.id))
            .collect();
        if batch.is_empty() {
            break;
        }

        for range in batch {
            let id = range.id.clone();
            let outcome = {
                let provider = provider.clone();
                let sink = sink.clone();
                let counters = counters.clone();
                let target = target.clone();
                let opts = opts.clone();
                tokio::task::spawn_blocking(move || {
                    // Row invariants are checked before picking a path;
                    // a malformed single row must not silently under-visit.
                    range.validate()?;
                    if range.number_of_permutations == BigUint::one() {
                        search_single(
                            &range.start_array,
                            provider.as_ref(),
                            &target,
                            &counters,
                            sink.as_ref(),
                        )
                    } else {
                        search_range(
                            &range,
                            provider.as_ref(),
                            &target,
                            &opts,
                            &counters,
                            sink.as_ref(),
                        )
                    }
                })
                .await?
            };

            match outcome {
                Ok(r) => {
                    queue.delete(&id).await?;
                    report.ranges_processed += 1;
                    report.matches_found += r.matches_found;
                    if r.matches_found > 0 {
                        info!(range = %id, matches = r.matches_found, "preimage found; stopping drain");
                        break 'drain;
                    }
                }
                Err(e) => {
                    // Left queued: reprocessed from scratch on the next run.
                    warn!(range = %id, error = %e, "skipping unit after search failure");
                    skipped.insert(id);
                }
            }
        }
    }

    reporter.stop();
    info!(
        ranges = report.ranges_processed,
        matches = report.matches_found,
        "queue drained"
    );
    Ok(report)
}
