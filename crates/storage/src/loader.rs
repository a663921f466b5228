//! Memoized loading with cancellation.

use std::future::Future;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::LoadError;
use crate::memoize::Memoized;

/// A memoized loader whose in-flight loads can all be aborted at once.
///
/// Each load runs under the loader's current [`CancellationToken`].
/// [`abort`](Self::abort) cancels that token, evicts the unfinished
/// entries and installs a fresh token, so loads started afterwards are not
/// cancelled and the same keys load again.
pub struct AbortableLoader<T: Clone + Send + Sync + 'static> {
    cache: Memoized<T>,
    token: Mutex<CancellationToken>,
}

impl<T: Clone + Send + Sync + 'static> AbortableLoader<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Memoized::new(capacity),
            token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Load `key` with `fetch`, sharing an existing load for the same key.
    ///
    /// `fetch` receives the token of the current generation. If the token
    /// is cancelled before `fetch` completes, the result is
    /// [`LoadError::Cancelled`] and the entry is evicted.
    pub async fn load<F, Fut>(&self, key: &str, fetch: F) -> Result<T, LoadError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, LoadError>> + Send + 'static,
    {
        let token = self.token.lock().await.clone();
        self.cache
            .get_or_load(key, move || {
                let fetch = fetch(token.clone());
                async move {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => Err(LoadError::Cancelled),
                        result = fetch => result,
                    }
                }
            })
            .await
    }

    /// Cancel every in-flight load and start a new generation.
    pub async fn abort(&self) {
        let previous = {
            let mut token = self.token.lock().await;
            std::mem::replace(&mut *token, CancellationToken::new())
        };
        previous.cancel();
        let evicted = self.cache.evict_pending().await;
        info!(evicted, "Aborted in-flight loads");
    }

    /// The token loads started now would run under.
    pub async fn current_token(&self) -> CancellationToken {
        self.token.lock().await.clone()
    }

    /// The underlying cache.
    pub fn cache(&self) -> &Memoized<T> {
        &self.cache
    }

    /// Forget every cached result.
    pub async fn clear(&self) {
        self.cache.clear().await;
    }
}

impl<T: Clone + Send + Sync + 'static> Default for AbortableLoader<T> {
    fn default() -> Self {
        Self {
            cache: Memoized::default(),
            token: Mutex::new(CancellationToken::new()),
        }
    }
}
