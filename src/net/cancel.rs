//! Cooperative cancellation.
//!
//! Cancelling never produces an error. In-flight operations race their I/O
//! against the token and observe [`Outcome::Cancelled`], which they swallow.

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::sync::watch;

/// Shared cancellation flag.
///
/// Clones observe the same flag. Cancelling is idempotent.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// How an I/O step ended.
#[derive(Debug)]
pub enum Outcome<T> {
    Succeeded(T),
    Failed(io::Error),
    Cancelled,
}

impl<T> From<io::Result<T>> for Outcome<T> {
    fn from(result: io::Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Succeeded(value),
            Err(e) => Outcome::Failed(e),
        }
    }
}

/// Drive `fut` unless `cancel` fires first.
///
/// A failure observed after cancellation is reported as `Cancelled`: it is
/// the closed channel talking, not a real error.
pub async fn race<T, F>(cancel: &CancelToken, fut: F) -> Outcome<T>
where
    F: Future<Output = io::Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Outcome::Cancelled,
        result = fut => match result {
            Err(_) if cancel.is_cancelled() => Outcome::Cancelled,
            other => other.into(),
        },
    }
}
