//! Byte sources for tile payloads.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::LoadError;

/// Fetches raw bytes for a URI.
///
/// Implementations should return promptly with [`LoadError::Cancelled`]
/// once `cancel` fires; the loaders also stop waiting on their own.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, uri: &str, cancel: &CancellationToken) -> Result<Bytes, LoadError>;
}

/// In-memory fetcher serving preloaded payloads.
///
/// Unknown URIs resolve to [`LoadError::NotFound`]. An optional latency
/// makes in-flight behaviour observable.
#[derive(Default)]
pub struct MemoryFetcher {
    payloads: RwLock<HashMap<String, Bytes>>,
    latency: Option<Duration>,
    fetches: AtomicU64,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Serve `bytes` for `uri`.
    pub fn insert(&self, uri: impl Into<String>, bytes: impl Into<Bytes>) {
        let mut payloads = self
            .payloads
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        payloads.insert(uri.into(), bytes.into());
    }

    /// Number of fetches issued so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TileFetcher for MemoryFetcher {
    async fn fetch(&self, uri: &str, cancel: &CancellationToken) -> Result<Bytes, LoadError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(uri = %uri, "Fetching from memory");

        if let Some(latency) = self.latency {
            tokio::select! {
                _ = cancel.cancelled() => return Err(LoadError::Cancelled),
                _ = tokio::time::sleep(latency) => {}
            }
        }

        let payloads = self
            .payloads
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        payloads
            .get(uri)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(uri.to_string()))
    }
}
