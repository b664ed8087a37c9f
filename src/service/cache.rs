// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-through document cache.

use crate::domain::{ConfigDocument, ConfigError, Coordinates, Result};
use crate::ports::SourceRepository;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::debug;

/// A fetch outcome shared by every request for the same coordinates.
/// `None` records that no document exists.
type Slot = Arc<OnceCell<Option<ConfigDocument>>>;

struct CacheEntry {
    created: Instant,
    slot: Slot,
}

/// Entries plus the time expired ones were last swept out.
struct CacheState {
    entries: HashMap<Coordinates, CacheEntry>,
    last_prune: Instant,
}

impl CacheState {
    /// Drops expired entries, at most once per `ttl`.
    fn prune(&mut self, now: Instant, ttl: Duration) {
        if now.duration_since(self.last_prune) < ttl {
            return;
        }
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.created) < ttl);
        self.last_prune = now;
        let pruned = before - self.entries.len();
        if pruned > 0 {
            debug!(pruned, remaining = self.entries.len(), "Pruned expired cache entries");
        }
    }
}

/// A [`SourceRepository`] decorator that caches fetched documents.
///
/// Entries expire after the TTL and are swept out on a later miss, so the
/// cache holds at most the entries created within roughly two TTLs.
/// Concurrent requests for the same
/// coordinates wait on a single fetch. Both found and not-found outcomes are
/// cached; errors are not, so the next request fetches again. A TTL of zero
/// passes every request straight through.
///
/// # Examples
///
/// ```rust
/// use cfgserver::adapters::InMemoryStore;
/// use cfgserver::service::{CachingRepository, StoreRepository};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let store = Arc::new(InMemoryStore::new());
/// let cache = CachingRepository::new(
///     Arc::new(StoreRepository::new(store)),
///     Duration::from_secs(30),
/// );
/// cache.invalidate_all();
/// assert_eq!(cache.len(), 0);
/// ```
pub struct CachingRepository {
    inner: Arc<dyn SourceRepository>,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl CachingRepository {
    /// Wraps `inner` with a cache whose entries live for `ttl`.
    pub fn new(inner: Arc<dyn SourceRepository>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                last_prune: Instant::now(),
            }),
        }
    }

    /// Drops every cached entry.
    pub fn invalidate_all(&self) {
        let mut state = self.state();
        let dropped = state.entries.len();
        state.entries.clear();
        debug!(dropped, "Invalidated document cache");
    }

    /// Drops the cached entries of one application.
    pub fn invalidate_application(&self, application: &str) {
        self.state()
            .entries
            .retain(|coordinates, _| coordinates.application() != application);
        debug!(application, "Invalidated cached documents for application");
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    /// Returns `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the live slot for `coordinates`, replacing an expired one.
    fn slot(&self, coordinates: &Coordinates) -> Slot {
        let mut state = self.state();
        let now = Instant::now();
        if let Some(entry) = state.entries.get(coordinates) {
            if now.duration_since(entry.created) < self.ttl {
                return Arc::clone(&entry.slot);
            }
        }
        state.prune(now, self.ttl);
        let slot: Slot = Arc::new(OnceCell::new());
        state.entries.insert(
            coordinates.clone(),
            CacheEntry {
                created: now,
                slot: Arc::clone(&slot),
            },
        );
        slot
    }
}

#[async_trait]
impl SourceRepository for CachingRepository {
    async fn fetch(&self, coordinates: &Coordinates) -> Result<ConfigDocument> {
        if self.ttl.is_zero() {
            return self.inner.fetch(coordinates).await;
        }

        let slot = self.slot(coordinates);
        if slot.initialized() {
            debug!(coordinates = %coordinates, "Document cache hit");
        }

        let outcome = slot
            .get_or_try_init(|| async {
                match self.inner.fetch(coordinates).await {
                    Ok(document) => Ok(Some(document)),
                    Err(ConfigError::NotFound { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await?;

        match outcome {
            Some(document) => Ok(document.clone()),
            None => Err(ConfigError::NotFound {
                coordinates: coordinates.clone(),
            }),
        }
    }
}
