use permseek_core::config::Config;
use permseek_core::digest::{CountingProvider, StandardDigests};
use permseek_core::plan::plan_package;
use permseek_core::sink::VecSink;
use permseek_queue::store::SqliteQueue;
use sha2::{Digest, Sha256};
use std::sync::Arc;

fn config(existing_hash: &str) -> Config {
    serde_json::from_value(serde_json::json!({
        "num_workers": 2,
        "existing_hash": existing_hash,
        "max_permutations_per_line": 64,
        "max_ranges_per_segment": 2,
        "max_segments_per_package": 2,
        "report_interval_secs": 60,
        "batch_size": 3
    }))
    .unwrap()
}

async fn seeded_queue(dir: &tempfile::TempDir, cfg: &Config) -> SqliteQueue {
    let queue = SqliteQueue::open(&dir.path().join("queue.db")).await.unwrap();
    queue.init().await.unwrap();
    // One package of L=1 covers [0,256) with the sizes above.
    let ranges = plan_package(1, 1, cfg).unwrap();
    queue.insert_batch(&ranges).await.unwrap();
    queue
}

#[tokio::test]
async fn drain_without_match_visits_everything_and_empties_queue() {
    let cfg = config("ff"); // matches no digest
    let dir = tempfile::tempdir().unwrap();
    let queue = seeded_queue(&dir, &cfg).await;

    let provider = CountingProvider::new(StandardDigests);
    let calls = provider.clone();
    let sink = Arc::new(VecSink::new());

    let report = permseek_queue::runner::drain(
        &queue,
        &cfg,
        Arc::new(provider),
        sink.clone(),
        false,
    )
    .await
    .unwrap();

    assert_eq!(report.matches_found, 0);
    assert_eq!(report.ranges_processed, 4);
    assert_eq!(calls.calls(), 256);
    assert!(sink.snapshot().is_empty());
    assert!(queue.get_unprocessed(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn drain_records_match_and_acks_matched_unit() {
    let target = hex::encode(Sha256::digest([7u8]));
    let cfg = config(&target);
    let dir = tempfile::tempdir().unwrap();
    let queue = seeded_queue(&dir, &cfg).await;

    let sink = Arc::new(VecSink::new());
    let report = permseek_queue::runner::drain(
        &queue,
        &cfg,
        Arc::new(StandardDigests),
        sink.clone(),
        false,
    )
    .await
    .unwrap();

    assert!(report.matches_found >= 1);
    let matches = sink.snapshot();
    assert!(matches.iter().any(|m| m.byte_array == vec![7]));
    assert_eq!(matches[0].digest_hex, target);

    // The matched unit ([0,64) holds byte 7) must be acked even though
    // the drain stopped early.
    let left = queue.get_unprocessed(10).await.unwrap();
    assert!(left.iter().all(|r| r.start_array != vec![0]));
}

#[tokio::test]
async fn failing_rows_at_head_of_scan_do_not_starve_later_units() {
    let cfg = config("ff");
    let dir = tempfile::tempdir().unwrap();
    let queue = SqliteQueue::open(&dir.path().join("queue.db")).await.unwrap();
    queue.init().await.unwrap();

    // Three malformed rows (inverted bounds) inserted ahead of one valid
    // unit, with batch_size equal to the malformed cluster size.
    let template = plan_package(1, 1, &cfg).unwrap()[0].clone();
    let mut rows = Vec::new();
    for i in 0..3 {
        let mut bad = template.clone();
        bad.id = format!("bad-{i}");
        bad.start_array = vec![5];
        bad.end_array = vec![4];
        bad.number_of_permutations = 2u32.into();
        rows.push(bad);
    }
    let mut good = template.clone();
    good.id = "good-1".to_string();
    good.start_array = vec![10];
    good.end_array = vec![20];
    good.number_of_permutations = 11u32.into();
    rows.push(good);
    queue.insert_batch(&rows).await.unwrap();

    let provider = CountingProvider::new(StandardDigests);
    let calls = provider.clone();
    let report = permseek_queue::runner::drain(
        &queue,
        &cfg,
        Arc::new(provider),
        Arc::new(VecSink::new()),
        false,
    )
    .await
    .unwrap();

    // The valid unit behind the failing cluster was fully searched.
    assert_eq!(report.ranges_processed, 1);
    assert_eq!(calls.calls(), 11);
    // Malformed rows stay queued for a later run; the good one is acked.
    let left = queue.get_unprocessed(10).await.unwrap();
    assert_eq!(left.len(), 3);
    assert!(left.iter().all(|r| r.id.starts_with("bad-")));
}

#[tokio::test]
async fn malformed_single_row_is_rejected_not_under_visited() {
    let cfg = config("ff");
    let dir = tempfile::tempdir().unwrap();
    let queue = SqliteQueue::open(&dir.path().join("queue.db")).await.unwrap();
    queue.init().await.unwrap();

    // Claims to be collapsed but spans six arrays.
    let mut row = plan_package(1, 1, &cfg).unwrap()[0].clone();
    row.id = "wide-single".to_string();
    row.start_array = vec![0];
    row.end_array = vec![5];
    row.number_of_permutations = 1u32.into();
    queue.insert_batch(std::slice::from_ref(&row)).await.unwrap();

    let provider = CountingProvider::new(StandardDigests);
    let calls = provider.clone();
    let report = permseek_queue::runner::drain(
        &queue,
        &cfg,
        Arc::new(provider),
        Arc::new(VecSink::new()),
        true,
    )
    .await
    .unwrap();

    assert_eq!(report.ranges_processed, 0);
    assert_eq!(report.matches_found, 0);
    assert_eq!(calls.calls(), 0);
    // Left queued rather than half-searched.
    assert_eq!(queue.get_unprocessed(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn singles_mode_only_touches_collapsed_rows() {
    let target = hex::encode(Sha256::digest([9u8]));
    let cfg = config(&target);
    let dir = tempfile::tempdir().unwrap();
    let queue = seeded_queue(&dir, &cfg).await;

    let mut single = plan_package(1, 1, &cfg).unwrap()[0].clone();
    single.id = "single-nine".to_string();
    single.start_array = vec![9];
    single.end_array = vec![9];
    single.number_of_permutations = 1u32.into();
    queue.insert_batch(std::slice::from_ref(&single)).await.unwrap();

    let sink = Arc::new(VecSink::new());
    let report = permseek_queue::runner::drain(
        &queue,
        &cfg,
        Arc::new(StandardDigests),
        sink.clone(),
        true,
    )
    .await
    .unwrap();

    assert_eq!(report.ranges_processed, 1);
    assert_eq!(report.matches_found, 1);
    assert_eq!(sink.snapshot()[0].byte_array, vec![9]);
    // The wide rows were never the singles path's business.
    assert_eq!(queue.get_unprocessed(10).await.unwrap().len(), 4);
}
