//! Handle identity and lifetime tracking.
//!
//! # Responsibilities
//! - Generate unique handle IDs for tracing
//! - Count live socket and listener handles
//! - Publish the count as a gauge

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;

/// Global atomic counter for handle IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static HANDLE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a socket or listener handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

impl HandleId {
    /// Generate a new unique handle ID.
    pub fn new() -> Self {
        Self(HANDLE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sock-{}", self.0)
    }
}

/// Tracks live handles of one bridge.
#[derive(Debug, Clone, Default)]
pub struct HandleTracker {
    active_count: Arc<AtomicU64>,
}

impl HandleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new live handle. Returns a guard that decrements on drop.
    pub fn track(&self) -> HandleGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::handle_opened();
        HandleGuard {
            active_count: Arc::clone(&self.active_count),
            id: HandleId::new(),
        }
    }

    /// Get current live handle count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until every handle is dropped.
    pub async fn wait_idle(&self) {
        while self.active_count() > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// Guard that tracks a handle's lifetime.
/// Decrements the live count when dropped.
#[derive(Debug)]
pub struct HandleGuard {
    active_count: Arc<AtomicU64>,
    id: HandleId,
}

impl HandleGuard {
    /// Get this handle's ID.
    pub fn id(&self) -> HandleId {
        self.id
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::handle_closed();
        tracing::trace!(handle = %self.id, "Handle released");
    }
}
