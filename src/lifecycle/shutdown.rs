//! Shutdown coordination for the daemon.
//!
//! The coordinator lives on the runtime side (next to the signal handler);
//! listeners are held by whoever must stop, including the synchronous
//! scheduler thread, which polls instead of awaiting.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Coordinator for graceful shutdown.
///
/// Dropping the coordinator counts as a trigger for every listener.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Listen for the trigger. Listeners created after it has fired miss it.
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
            fired: false,
        }
    }

    /// Fire the trigger; returns how many listeners it reached.
    pub fn trigger(&self) -> usize {
        let reached = self.tx.send(()).unwrap_or(0);
        tracing::info!(listeners = reached, "Shutdown triggered");
        reached
    }

    /// Number of listeners still alive.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// One party's view of the shutdown trigger.
///
/// Once fired it stays fired.
pub struct ShutdownListener {
    rx: broadcast::Receiver<()>,
    fired: bool,
}

impl ShutdownListener {
    /// Non-blocking check, for loops that cannot await.
    pub fn is_triggered(&mut self) -> bool {
        if !self.fired {
            self.fired = !matches!(self.rx.try_recv(), Err(TryRecvError::Empty));
        }
        self.fired
    }

    /// Resolve once the trigger fires or the coordinator is dropped.
    pub async fn wait(&mut self) {
        if !self.fired {
            let _ = self.rx.recv().await;
            self.fired = true;
        }
    }
}
