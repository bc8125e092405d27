use crate::error::{QueueError, Result};
use crate::retry::{RetryError, retry_locked};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use permseek_core::domain::{PermutationRange, decode_csv, encode_csv};
use permseek_core::error::CoreError;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

pub const MAX_LOCK_RETRIES: u32 = 100;
pub const LOCK_RETRY_DELAY: Duration = Duration::from_secs(1);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS permutations (
    id TEXT PRIMARY KEY,
    start_array TEXT NOT NULL,
    end_array TEXT NOT NULL,
    package_name TEXT NOT NULL,
    perm_name TEXT NOT NULL,
    reported_to_api INTEGER NOT NULL DEFAULT 0,
    processed INTEGER NOT NULL DEFAULT 0,
    array_length INTEGER NOT NULL,
    number_of_permutations INTEGER NOT NULL
)";

const INSERT: &str = "INSERT INTO permutations \
    (id, start_array, end_array, package_name, perm_name, \
     reported_to_api, processed, array_length, number_of_permutations) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const SELECT_COLS: &str = "SELECT id, start_array, end_array, package_name, perm_name, \
    reported_to_api, processed, array_length, number_of_permutations FROM permutations";

/// Transient SQLite lock-contention error class; everything else is
/// surfaced immediately.
fn is_lock_contention(err: &libsql::Error) -> bool {
    let msg = err.to_string().to_ascii_lowercase();
    msg.contains("database is locked") || msg.contains("busy")
}

/// Durable work queue over a local SQLite-class database.
///
/// All writes are serialized behind a client-side mutex: the store has
/// single-writer semantics and concurrent writers would only trade
/// throughput for busy errors. A server-based (Postgres-class) backend
/// would expose the same surface and rely on the engine's own
/// concurrency control instead.
pub struct SqliteQueue {
    // Held so the connection outlives the handle it came from.
    _db: libsql::Database,
    conn: libsql::Connection,
    write_lock: Mutex<()>,
}

impl SqliteQueue {
    pub async fn open(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| QueueError::Connection(format!("{}: {e}", path.display())))?;
        let conn = db
            .connect()
            .map_err(|e| QueueError::Connection(e.to_string()))?;
        Ok(Self {
            _db: db,
            conn,
            write_lock: Mutex::new(()),
        })
    }

    /// Idempotent schema creation.
    pub async fn init(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.conn.execute(SCHEMA, ()).await?;
        Ok(())
    }

    pub async fn insert_batch(&self, ranges: &[PermutationRange]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        for range in ranges {
            let count = count_i64(range)?;
            self.conn.execute(INSERT, row_params(range, count)).await?;
        }
        debug!(rows = ranges.len(), "inserted range batch");
        Ok(())
    }

    /// Insert one row, retrying lock contention up to `MAX_LOCK_RETRIES`
    /// times with a fixed 1 s backoff. Any other error fails immediately.
    pub async fn insert_with_retry(&self, range: &PermutationRange) -> Result<()> {
        let count = count_i64(range)?;
        let _guard = self.write_lock.lock().await;
        let result = retry_locked(
            MAX_LOCK_RETRIES,
            LOCK_RETRY_DELAY,
            is_lock_contention,
            || self.conn.execute(INSERT, row_params(range, count)),
        )
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(RetryError::Exhausted { attempts, last }) => {
                Err(QueueError::LockContention { attempts, last })
            }
            Err(RetryError::Fatal(e)) => Err(QueueError::Database(e)),
        }
    }

    /// Rows not yet consumed, oldest insertion order first.
    pub async fn get_unprocessed(&self, limit: u32) -> Result<Vec<PermutationRange>> {
        let sql = format!("{SELECT_COLS} WHERE processed = 0 LIMIT ?1");
        self.query_ranges(&sql, limit).await
    }

    /// Fast path: rows already collapsed to a single array, where
    /// enumeration can be skipped entirely.
    pub async fn get_single_permutations(&self, limit: u32) -> Result<Vec<PermutationRange>> {
        let sql =
            format!("{SELECT_COLS} WHERE processed = 0 AND number_of_permutations = 1 LIMIT ?1");
        self.query_ranges(&sql, limit).await
    }

    async fn query_ranges(&self, sql: &str, limit: u32) -> Result<Vec<PermutationRange>> {
        let mut rows = self.conn.query(sql, libsql::params![limit as i64]).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(row_to_range(&row)?);
        }
        Ok(out)
    }

    /// Sum of permutation counts across unconsumed rows, for the progress
    /// reporter's remaining-work figure.
    pub async fn remaining_permutations(&self) -> Result<BigUint> {
        let mut rows = self
            .conn
            .query(
                "SELECT number_of_permutations FROM permutations WHERE processed = 0",
                (),
            )
            .await?;
        let mut total = BigUint::default();
        while let Some(row) = rows.next().await? {
            let n: i64 = row.get(0)?;
            total += BigUint::from(n.max(0) as u64);
        }
        Ok(total)
    }

    /// The ack: a unit is deleted after its array range is fully
    /// enumerated, whether or not a match occurred.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.conn
            .execute("DELETE FROM permutations WHERE id = ?1", libsql::params![id])
            .await?;
        Ok(())
    }

    pub async fn delete_processed(&self) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let n = self
            .conn
            .execute("DELETE FROM permutations WHERE processed = 1", ())
            .await?;
        Ok(n)
    }

    /// Reclaim storage released by deleted rows.
    pub async fn compact(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.conn.execute("VACUUM", ()).await?;
        Ok(())
    }
}

fn count_i64(range: &PermutationRange) -> Result<i64> {
    range.number_of_permutations.to_i64().ok_or_else(|| {
        QueueError::Core(CoreError::Validation(format!(
            "range {}: permutation count {} exceeds the bigint column",
            range.id, range.number_of_permutations
        )))
    })
}

fn row_params(range: &PermutationRange, count: i64) -> impl libsql::params::IntoParams {
    libsql::params![
        range.id.clone(),
        encode_csv(&range.start_array),
        encode_csv(&range.end_array),
        range.package_name.clone(),
        range.segment_name.clone(),
        range.reported_to_api as i64,
        range.processed as i64,
        range.array_length as i64,
        count
    ]
}

fn row_to_range(row: &libsql::Row) -> Result<PermutationRange> {
    let id: String = row.get(0)?;
    let start_text: String = row.get(1)?;
    let end_text: String = row.get(2)?;
    let package_name: String = row.get(3)?;
    let segment_name: String = row.get(4)?;
    let reported_to_api: i64 = row.get(5)?;
    let processed: i64 = row.get(6)?;
    let array_length: i64 = row.get(7)?;
    let count: i64 = row.get(8)?;

    if array_length <= 0 || count < 0 {
        return Err(QueueError::Core(CoreError::Invariant(format!(
            "row {id}: non-positive array_length or count"
        ))));
    }

    Ok(PermutationRange {
        id,
        start_array: decode_csv(&start_text).map_err(QueueError::Core)?,
        end_array: decode_csv(&end_text).map_err(QueueError::Core)?,
        package_name,
        segment_name,
        array_length: array_length as usize,
        number_of_permutations: BigUint::from(count as u64),
        processed: processed != 0,
        reported_to_api: reported_to_api != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use permseek_core::config::Config;
    use permseek_core::plan::plan_package;

    fn config() -> Config {
        serde_json::from_value(serde_json::json!({
            "num_workers": 1,
            "existing_hash": "00",
            "max_permutations_per_line": 100,
            "max_ranges_per_segment": 2,
            "max_segments_per_package": 1
        }))
        .unwrap()
    }

    async fn open_queue(dir: &tempfile::TempDir) -> SqliteQueue {
        let q = SqliteQueue::open(&dir.path().join("queue.db")).await.unwrap();
        q.init().await.unwrap();
        q
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let q = open_queue(&dir).await;
        q.init().await.unwrap();
        q.init().await.unwrap();
    }

    #[tokio::test]
    async fn insert_query_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let q = open_queue(&dir).await;

        let planned = plan_package(1, 1, &config()).unwrap();
        q.insert_batch(&planned).await.unwrap();

        let fetched = q.get_unprocessed(10).await.unwrap();
        assert_eq!(fetched.len(), 2);
        for r in &fetched {
            r.validate().unwrap();
        }
        // Textual byte-array format survives the round trip.
        let first = fetched
            .iter()
            .find(|r| r.start_array == vec![0])
            .unwrap();
        assert_eq!(first.end_array, vec![99]);
        assert_eq!(first.number_of_permutations, BigUint::from(100u32));

        q.delete(&first.id).await.unwrap();
        assert_eq!(q.get_unprocessed(10).await.unwrap().len(), 1);

        q.compact().await.unwrap();
        assert_eq!(q.get_unprocessed(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn insert_with_retry_round_trips_a_row() {
        let dir = tempfile::tempdir().unwrap();
        let q = open_queue(&dir).await;
        let planned = plan_package(1, 2, &config()).unwrap();
        for r in &planned {
            q.insert_with_retry(r).await.unwrap();
        }
        let fetched = q.get_unprocessed(10).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].start_array, vec![200]);
        assert_eq!(fetched[0].end_array, vec![255]);
    }

    #[tokio::test]
    async fn singles_fast_path_returns_only_collapsed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let q = open_queue(&dir).await;

        let mut wide = plan_package(1, 1, &config()).unwrap();
        let mut single = wide[0].clone();
        single.id = "single-row".to_string();
        single.start_array = vec![7];
        single.end_array = vec![7];
        single.number_of_permutations = BigUint::from(1u32);
        wide.push(single);
        q.insert_batch(&wide).await.unwrap();

        let singles = q.get_single_permutations(10).await.unwrap();
        assert_eq!(singles.len(), 1);
        assert_eq!(singles[0].id, "single-row");
        assert_eq!(singles[0].start_array, vec![7]);
    }

    #[tokio::test]
    async fn remaining_permutations_sums_unprocessed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let q = open_queue(&dir).await;
        q.insert_batch(&plan_package(1, 1, &config()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            q.remaining_permutations().await.unwrap(),
            BigUint::from(200u32)
        );
    }

    #[tokio::test]
    async fn duplicate_plan_runs_produce_duplicate_rows() {
        let dir = tempfile::tempdir().unwrap();
        let q = open_queue(&dir).await;
        q.insert_batch(&plan_package(1, 1, &config()).unwrap())
            .await
            .unwrap();
        q.insert_batch(&plan_package(1, 1, &config()).unwrap())
            .await
            .unwrap();
        // Seeded twice: duplicate coverage, distinct ids. Documented
        // at-least-once behaviour, not deduplicated here.
        assert_eq!(q.get_unprocessed(10).await.unwrap().len(), 4);
    }
}
