//! Work queue module
//!
//! A multi-producer, single-consumer FIFO between the workers and the
//! coordinator.
//!
//! # Overview
//!
//! - `put` never blocks; producers are throttled before they produce, by the
//!   pool's capacity gauge, not by a full queue
//! - `get` suspends the coordinator until an item arrives
//! - items from one producer keep their order; items from different
//!   producers interleave in arrival order

mod types;

pub use types::{
    GenerationCompleteSentinel, PartitionCompleteSentinel, QueueItem, StreamThreadError,
};

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::sync::mpsc;

/// Producer handle for the work queue
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<QueueItem>,
}

impl QueueSender {
    /// Push an item
    ///
    /// Fails only if the consumer has gone away.
    pub fn put(&self, item: QueueItem) -> Result<()> {
        self.tx.send(item).map_err(|_| Error::QueueClosed)
    }
}

/// Consumer side of the work queue
#[derive(Debug)]
pub struct WorkQueue {
    rx: mpsc::UnboundedReceiver<QueueItem>,
    tx: QueueSender,
}

impl WorkQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            rx,
            tx: QueueSender { tx },
        }
    }

    /// A producer handle for this queue
    pub fn sender(&self) -> QueueSender {
        self.tx.clone()
    }

    /// Wait for the next item
    pub async fn get(&mut self) -> Result<QueueItem> {
        self.rx.recv().await.ok_or(Error::QueueClosed)
    }

    /// Wait for the next item, failing if none arrives within `timeout`
    pub async fn get_timeout(&mut self, timeout: Duration) -> Result<QueueItem> {
        tokio::time::timeout(timeout, self.get())
            .await
            .map_err(|_| Error::QueueTimeout {
                timeout_secs: timeout.as_secs(),
            })?
    }

    /// Take an item if one is already waiting
    pub fn try_get(&mut self) -> Option<QueueItem> {
        self.rx.try_recv().ok()
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}
