//! Boundary protection: per-identity rate limiting and the shutdown gate
//!
//! Counters live behind the [`RateLimitStore`] trait so the core never owns
//! global state. Increments are serialized per key; independent keys never
//! contend.

use crate::errors::{Result, TeleburnError};
use crate::metrics::metrics;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Counter state of one identity inside its current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u32,
    /// Time until the window resets
    pub resets_in: Duration,
}

/// Storage backend for rate-limit counters, keyed by identity
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Current count, `None` when the key has no live window
    async fn get(&self, key: &str) -> Option<WindowCount>;

    /// Count one request, opening a new window of length `window` if needed
    async fn increment(&self, key: &str, window: Duration) -> WindowCount;

    async fn reset(&self, key: &str);
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    length: Duration,
    count: u32,
}

impl Window {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.started) >= self.length
    }

    fn snapshot(&self, now: Instant) -> WindowCount {
        WindowCount {
            count: self.count,
            resets_in: self.length.saturating_sub(now.duration_since(self.started)),
        }
    }
}

/// Map size above which `increment` sweeps expired windows first
pub const DEFAULT_PURGE_THRESHOLD: usize = 1024;

/// Fixed-window counters in a `DashMap`; the entry lock serializes each key.
///
/// Expired windows are swept whenever the map grows past the purge
/// threshold, so identities that stop calling do not accumulate.
#[derive(Debug)]
pub struct InMemoryRateLimitStore {
    windows: DashMap<String, Window>,
    purge_threshold: usize,
}

impl Default for InMemoryRateLimitStore {
    fn default() -> Self {
        Self {
            windows: DashMap::new(),
            purge_threshold: DEFAULT_PURGE_THRESHOLD,
        }
    }
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_purge_threshold(mut self, threshold: usize) -> Self {
        self.purge_threshold = threshold;
        self
    }

    /// Drop expired windows
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.expired(now));
        debug!(
            purged = before.saturating_sub(self.windows.len()),
            remaining = self.windows.len(),
            "Purged expired rate-limit windows"
        );
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn get(&self, key: &str) -> Option<WindowCount> {
        let now = Instant::now();
        self.windows
            .get(key)
            .filter(|w| !w.expired(now))
            .map(|w| w.snapshot(now))
    }

    async fn increment(&self, key: &str, window: Duration) -> WindowCount {
        // Sweep before taking the entry lock; `retain` locks every shard
        if self.windows.len() >= self.purge_threshold && !self.windows.contains_key(key) {
            self.purge_expired();
        }
        let now = Instant::now();
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            length: window,
            count: 0,
        });
        if entry.expired(now) {
            *entry = Window {
                started: now,
                length: window,
                count: 0,
            };
        }
        entry.count = entry.count.saturating_add(1);
        entry.snapshot(now)
    }

    async fn reset(&self, key: &str) {
        self.windows.remove(key);
    }
}

/// Allows `max_requests` per identity per `window`
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_requests: u32,
    window: Duration,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, max_requests: u32, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    pub fn in_memory(max_requests: u32, window: Duration) -> Self {
        Self::new(Arc::new(InMemoryRateLimitStore::new()), max_requests, window)
    }

    /// Count a request for `identity`, rejecting it once the window is full
    pub async fn check(&self, identity: &str) -> Result<()> {
        let current = self.store.increment(identity, self.window).await;
        if current.count > self.max_requests {
            // Round up so a caller retrying after the hint is admitted
            let retry_after_secs = current.resets_in.as_millis().div_ceil(1000) as u64;
            return Err(TeleburnError::RateLimited {
                identity: identity.to_string(),
                retry_after_secs: retry_after_secs.max(1),
            });
        }
        Ok(())
    }

    pub async fn reset(&self, identity: &str) {
        self.store.reset(identity).await;
    }
}

/// Process-wide flag rejecting new work once shutdown begins
#[derive(Debug, Clone, Default)]
pub struct ShutdownGate {
    closed: Arc<AtomicBool>,
}

impl ShutdownGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Shutdown gate closed; rejecting new requests");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_closed() {
            Err(TeleburnError::ShutdownActive)
        } else {
            Ok(())
        }
    }
}

/// Admission check run before any core operation
#[derive(Debug, Clone)]
pub struct BoundaryGuard {
    shutdown: ShutdownGate,
    limiter: RateLimiter,
}

impl BoundaryGuard {
    pub fn new(shutdown: ShutdownGate, limiter: RateLimiter) -> Self {
        Self { shutdown, limiter }
    }

    pub fn shutdown_gate(&self) -> &ShutdownGate {
        &self.shutdown
    }

    /// Shutdown is checked first, so a closing service does not consume quota
    pub async fn admit(&self, identity: &str) -> Result<()> {
        let result = match self.shutdown.check() {
            Ok(()) => self.limiter.check(identity).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            warn!(identity, reason = e.kind(), "Request rejected at boundary");
            metrics()
                .boundary_rejections
                .with_label_values(&[e.kind()])
                .inc();
        }
        result
    }
}
