use sha2::{Digest, Sha256, Sha512};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// One named hex digest of a candidate array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedDigest {
    pub algorithm: &'static str,
    pub hex: String,
}

/// Black-box digest contract: byte array in, named hex digests out.
///
/// The search never looks inside an algorithm; it only compares the hex
/// strings against the target.
pub trait DigestProvider: Send + Sync {
    fn digests(&self, bytes: &[u8]) -> Vec<NamedDigest>;
}

/// Default provider: SHA-256, SHA-512 and BLAKE3.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDigests;

impl DigestProvider for StandardDigests {
    fn digests(&self, bytes: &[u8]) -> Vec<NamedDigest> {
        vec![
            NamedDigest {
                algorithm: "sha256",
                hex: hex::encode(Sha256::digest(bytes)),
            },
            NamedDigest {
                algorithm: "sha512",
                hex: hex::encode(Sha512::digest(bytes)),
            },
            NamedDigest {
                algorithm: "blake3",
                hex: blake3::hash(bytes).to_hex().to_string(),
            },
        ]
    }
}

/// Wraps another provider and counts invocations. Exists so tests can
/// assert that a search visited every array in a unit.
#[derive(Clone)]
pub struct CountingProvider<P> {
    inner: P,
    calls: Arc<AtomicU64>,
}

impl<P: DigestProvider> CountingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl<P: DigestProvider> DigestProvider for CountingProvider<P> {
    fn digests(&self, bytes: &[u8]) -> Vec<NamedDigest> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.digests(bytes)
    }
}
