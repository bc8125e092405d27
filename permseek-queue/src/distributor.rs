use crate::error::{QueueError, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
// Per-read, not whole-transfer: a large pack on a slow link is fine,
// a stalled body is not.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Downloads precomputed work packages as remote 7z archives and extracts
/// them locally. An alternate, file-based supply path for work units that
/// feeds the same generation/search contract as the queue.
pub struct PackDistributor {
    client: reqwest::Client,
    base_url: String,
    dest_dir: PathBuf,
}

/// Deterministic URL of pack `n`: `<base>/downloads/packs/PACK_<n>.7z`.
pub fn pack_url(base_url: &str, pack_number: u64) -> String {
    format!(
        "{}/downloads/packs/PACK_{}.7z",
        base_url.trim_end_matches('/'),
        pack_number
    )
}

/// Byte offset to resume from: the size of any partial local file.
pub async fn resume_offset(path: &Path) -> u64 {
    tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

impl PackDistributor {
    pub fn new(base_url: &str, dest_dir: &Path) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            dest_dir: dest_dir.to_path_buf(),
        })
    }

    /// Resumable download of pack `pack_number`, then extraction next to
    /// the archive. Returns the local archive path.
    ///
    /// A 206 response appends to the partial file; a 200 means the server
    /// ignored the `Range` header and the file is rewritten from scratch;
    /// anything else is `BadStatus`.
    pub async fn download_and_extract(&self, pack_number: u64) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dest_dir).await?;
        let archive = self.dest_dir.join(format!("PACK_{pack_number}.7z"));
        let offset = resume_offset(&archive).await;
        let url = pack_url(&self.base_url, pack_number);

        info!(%url, offset, "fetching pack");
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::RANGE, format!("bytes={offset}-"))
            .send()
            .await?;

        let mut file = match response.status().as_u16() {
            206 => OpenOptions::new().append(true).create(true).open(&archive).await?,
            200 => {
                if offset > 0 {
                    warn!(path = %archive.display(), "server ignored range; restarting download");
                }
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&archive)
                    .await?
            }
            status => return Err(QueueError::BadStatus(status)),
        };

        let mut stream = response.bytes_stream();
        let mut received = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
        }
        file.flush().await?;
        info!(bytes = received, path = %archive.display(), "pack downloaded");

        self.extract(&archive).await?;
        Ok(archive)
    }

    // Extraction goes through the external 7z tool; the archive format is
    // not this crate's business.
    async fn extract(&self, archive: &Path) -> Result<()> {
        let status = Command::new("7z")
            .arg("x")
            .arg("-y")
            .arg(format!("-o{}", self.dest_dir.display()))
            .arg(archive)
            .status()
            .await
            .map_err(|e| QueueError::Extraction(format!("failed to launch 7z: {e}")))?;
        if !status.success() {
            return Err(QueueError::Extraction(format!(
                "7z exited with {status} for {}",
                archive.display()
            )));
        }
        Ok(())
    }
}
