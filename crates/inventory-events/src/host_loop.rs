//! # Host Loop
//!
//! Single-consumer task queue that confines listener execution to one thread.
//!
//! ## Scheduling Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Host Loop Scheduling                            │
//! │                                                                         │
//! │  any thread                     bounded mpsc                UI thread   │
//! │  ──────────                     ────────────                ─────────   │
//! │                                                                         │
//! │  bus.publish() ──► try_send ──► [task][task][task] ──► run_pending()   │
//! │  (returns at once)      │                              or run().await   │
//! │                         │                              or run_blocking()│
//! │                         ├── queue full  → HostLoopSaturated             │
//! │                         └── loop gone   → HostLoopClosed                │
//! │                                                                         │
//! │  Every task runs on whichever single thread drives the HostLoop, so    │
//! │  listeners never race each other.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};

use crate::error::{BusError, BusResult};

/// Unit of work run on the host loop.
pub type HostTask = Box<dyn FnOnce() + Send + 'static>;

/// Default queue capacity when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

// =============================================================================
// Host Loop (consumer)
// =============================================================================

/// Consumer side of the queue. Owned by the UI thread.
pub struct HostLoop {
    rx: mpsc::Receiver<HostTask>,
    capacity: usize,
}

/// Producer side of the queue. Cheap to clone, usable from any thread.
#[derive(Clone)]
pub struct HostLoopHandle {
    tx: mpsc::Sender<HostTask>,
    capacity: usize,
}

impl HostLoop {
    /// Creates a loop with room for `capacity` pending tasks.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> (Self, HostLoopHandle) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (
            HostLoop { rx, capacity },
            HostLoopHandle { tx, capacity },
        )
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Runs the tasks already queued, at most one queue's worth.
    ///
    /// Tasks queued by the tasks themselves wait for the next call, so a
    /// UI that pumps once per frame never stalls on a publish cascade.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while ran < self.capacity {
            match self.rx.try_recv() {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        if ran > 0 {
            debug!(tasks = ran, "Host loop drained pending tasks");
        }
        ran
    }

    /// Runs tasks until every handle is dropped.
    pub async fn run(mut self) {
        info!(capacity = self.capacity, "Host loop starting");
        while let Some(task) = self.rx.recv().await {
            task();
        }
        info!("Host loop stopped");
    }

    /// Same as [`run`](Self::run), blocking the current thread.
    ///
    /// Must not be called from inside an async runtime.
    pub fn run_blocking(mut self) {
        info!(capacity = self.capacity, "Host loop starting (blocking)");
        while let Some(task) = self.rx.blocking_recv() {
            task();
        }
        info!("Host loop stopped");
    }
}

impl HostLoopHandle {
    /// Queues `task` without blocking.
    pub fn schedule(&self, task: HostTask) -> BusResult<()> {
        self.tx.try_send(task).map_err(|e| match e {
            TrySendError::Full(_) => BusError::HostLoopSaturated {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => BusError::HostLoopClosed,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true once the consumer has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl std::fmt::Debug for HostLoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostLoopHandle")
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
