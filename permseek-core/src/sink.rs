use crate::domain::{FoundMatch, encode_csv};
use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// Destination for preimage hits. Implementations must be safe to call
/// from several workers at once.
pub trait MatchSink: Send + Sync {
    fn record(&self, m: &FoundMatch) -> Result<()>;
}

/// Append-only text file, one line per match:
/// `Match found: <csv-bytes>, Hash Name: <algo>, Byte Array: <hex>`.
///
/// The line format is the interop contract with older tooling; change it
/// and the downstream report scripts break.
pub struct FileSink {
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    pub fn open(path: &Path) -> Result<Self> {
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(f)),
        })
    }
}

impl MatchSink for FileSink {
    fn record(&self, m: &FoundMatch) -> Result<()> {
        let mut w = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(
            w,
            "Match found: {}, Hash Name: {}, Byte Array: {}",
            encode_csv(&m.byte_array),
            m.algorithm,
            hex::encode(&m.byte_array)
        )?;
        // Matches are rare and precious; flush each one immediately.
        w.flush()?;
        Ok(())
    }
}

/// In-memory sink for tests and embedding.
#[derive(Default)]
pub struct VecSink {
    matches: Mutex<Vec<FoundMatch>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<FoundMatch> {
        self.matches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl MatchSink for VecSink {
    fn record(&self, m: &FoundMatch) -> Result<()> {
        self.matches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(m.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample() -> FoundMatch {
        FoundMatch {
            byte_array: vec![12, 7, 255, 0],
            algorithm: "sha512".to_string(),
            digest_hex: "ab".repeat(64),
            discovered_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn file_sink_appends_exact_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches.txt");
        let sink = FileSink::open(&path).unwrap();
        sink.record(&sample()).unwrap();
        sink.record(&sample()).unwrap();
        drop(sink);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "Match found: 12,7,255,0, Hash Name: sha512, Byte Array: 0c07ff00"
        );
    }

    #[test]
    fn file_sink_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches.txt");
        FileSink::open(&path).unwrap().record(&sample()).unwrap();
        FileSink::open(&path).unwrap().record(&sample()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn vec_sink_collects_matches() {
        let sink = VecSink::new();
        sink.record(&sample()).unwrap();
        assert_eq!(sink.snapshot().len(), 1);
        assert_eq!(sink.snapshot()[0].byte_array, vec![12, 7, 255, 0]);
    }
}
