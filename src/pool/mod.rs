//! Worker pool module
//!
//! Bounded execution of partition generation and partition reads.
//!
//! # Overview
//!
//! - `W` worker permits bound how many tasks run at once
//! - an in-flight counter (submitted, not finished) drives cooperative
//!   backpressure through `CapacityGauge`
//! - a panic that escapes a task is caught at the task boundary and stored
//!   as a fatal error, surfaced by `check_for_errors`

use crate::error::{panic_message, Error, Result, SharedError};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error};

#[derive(Debug, Default)]
struct PoolCounters {
    /// Submitted or reserved, not yet finished
    in_flight: usize,
    /// Holding a worker permit
    running: usize,
    peak_in_flight: usize,
    peak_running: usize,
    submitted: usize,
    finished: usize,
}

#[derive(Debug)]
struct PoolShared {
    counters: Mutex<PoolCounters>,
    max_concurrent_tasks: usize,
    capacity_freed: Notify,
    fatal: Mutex<Option<SharedError>>,
}

impl PoolShared {
    fn counters(&self) -> MutexGuard<'_, PoolCounters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fatal_error(&self) -> Option<SharedError> {
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_fatal(&self, err: Error) {
        let mut fatal = self.fatal.lock().unwrap_or_else(PoisonError::into_inner);
        if fatal.is_none() {
            error!(error = %err, "Fatal worker pool error");
            *fatal = Some(Arc::new(err));
        }
    }

    fn add_in_flight(&self) {
        let mut c = self.counters();
        c.in_flight += 1;
        c.peak_in_flight = c.peak_in_flight.max(c.in_flight);
    }

    fn task_started(&self) {
        let mut c = self.counters();
        c.running += 1;
        c.peak_running = c.peak_running.max(c.running);
    }

    fn task_stopped(&self) {
        self.counters().running -= 1;
    }

    fn task_finished(&self) {
        {
            let mut c = self.counters();
            c.in_flight -= 1;
            c.finished += 1;
        }
        self.capacity_freed.notify_waiters();
    }
}

/// Cloneable view of the pool's capacity for producers
#[derive(Debug, Clone)]
pub struct CapacityGauge {
    shared: Arc<PoolShared>,
}

impl CapacityGauge {
    /// Whether in-flight tasks meet or exceed the capacity threshold
    pub fn is_over_capacity(&self) -> bool {
        self.shared.counters().in_flight >= self.shared.max_concurrent_tasks
    }

    /// Wait until the pool is under capacity
    ///
    /// Wakes when a task finishes, and re-checks every `poll_interval` in
    /// case a wakeup was missed.
    pub async fn wait_for_capacity(&self, poll_interval: Duration) {
        loop {
            let freed = self.shared.capacity_freed.notified();
            if !self.is_over_capacity() {
                return;
            }
            tokio::select! {
                () = freed => {}
                () = tokio::time::sleep(poll_interval) => {}
            }
        }
    }

    /// Wait for capacity and claim one in-flight slot for a task not yet submitted
    ///
    /// The check and the claim happen under one lock, so concurrent producers
    /// cannot overshoot the threshold together. The slot is later consumed by
    /// `ThreadPoolManager::submit_reserved` or given back with
    /// `ThreadPoolManager::release_reserved`.
    pub async fn reserve_slot(&self, poll_interval: Duration) {
        loop {
            let freed = self.shared.capacity_freed.notified();
            {
                let mut c = self.shared.counters();
                if c.in_flight < self.shared.max_concurrent_tasks {
                    c.in_flight += 1;
                    c.peak_in_flight = c.peak_in_flight.max(c.in_flight);
                    return;
                }
            }
            tokio::select! {
                () = freed => {}
                () = tokio::time::sleep(poll_interval) => {}
            }
        }
    }

    /// Give back a slot claimed by `reserve_slot` without submitting a task
    pub fn release_slot(&self) {
        {
            let mut c = self.shared.counters();
            c.in_flight = c.in_flight.saturating_sub(1);
        }
        self.shared.capacity_freed.notify_waiters();
    }
}

/// Snapshot of pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Tasks submitted or reserved, not finished
    pub in_flight: usize,
    /// Tasks holding a worker permit
    pub running: usize,
    /// Highest in-flight count seen
    pub peak_in_flight: usize,
    /// Highest running count seen
    pub peak_running: usize,
    /// Tasks submitted
    pub submitted: usize,
    /// Tasks finished
    pub finished: usize,
}

/// Fixed-size worker pool with in-flight task accounting
#[derive(Debug)]
pub struct ThreadPoolManager {
    tasks: JoinSet<()>,
    workers: Arc<Semaphore>,
    num_workers: usize,
    shared: Arc<PoolShared>,
    accepting: bool,
}

impl ThreadPoolManager {
    /// Create a pool of `num_workers` workers
    ///
    /// `max_concurrent_tasks` is the in-flight threshold past which
    /// producers are throttled.
    pub fn new(num_workers: usize, max_concurrent_tasks: usize) -> Self {
        Self {
            tasks: JoinSet::new(),
            workers: Arc::new(Semaphore::new(num_workers)),
            num_workers,
            shared: Arc::new(PoolShared {
                counters: Mutex::new(PoolCounters::default()),
                max_concurrent_tasks,
                capacity_freed: Notify::new(),
                fatal: Mutex::new(None),
            }),
            accepting: true,
        }
    }

    /// Number of workers
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// In-flight threshold
    pub fn max_concurrent_tasks(&self) -> usize {
        self.shared.max_concurrent_tasks
    }

    /// A capacity handle for producers
    pub fn capacity_gauge(&self) -> CapacityGauge {
        CapacityGauge {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Whether in-flight tasks meet or exceed the capacity threshold
    pub fn is_over_capacity(&self) -> bool {
        self.capacity_gauge().is_over_capacity()
    }

    /// Tasks submitted or reserved, not yet finished
    pub fn in_flight(&self) -> usize {
        self.shared.counters().in_flight
    }

    /// Current counters
    pub fn stats(&self) -> PoolStats {
        let c = self.shared.counters();
        PoolStats {
            in_flight: c.in_flight,
            running: c.running,
            peak_in_flight: c.peak_in_flight,
            peak_running: c.peak_running,
            submitted: c.submitted,
            finished: c.finished,
        }
    }

    /// Schedule a task
    ///
    /// Fails fast with the stored error once the pool has been shut down.
    pub fn submit<F>(&mut self, name: impl Into<String>, task: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.ensure_accepting()?;
        self.shared.add_in_flight();
        self.spawn(name.into(), task);
        Ok(())
    }

    /// Schedule a task into a slot claimed by `CapacityGauge::reserve_slot`
    pub fn submit_reserved<F>(&mut self, name: impl Into<String>, task: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Err(e) = self.ensure_accepting() {
            self.release_reserved();
            return Err(e);
        }
        self.spawn(name.into(), task);
        Ok(())
    }

    /// Give back a slot claimed by `CapacityGauge::reserve_slot` without running a task
    pub fn release_reserved(&self) {
        self.capacity_gauge().release_slot();
    }

    fn ensure_accepting(&mut self) -> Result<()> {
        self.reap_finished();
        if let Some(err) = self.shared.fatal_error() {
            return Err(Error::PoolShutdown {
                message: err.to_string(),
            });
        }
        if !self.accepting {
            return Err(Error::PoolShutdown {
                message: "pool no longer accepts tasks".to_string(),
            });
        }
        Ok(())
    }

    fn spawn<F>(&mut self, name: String, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shared.counters().submitted += 1;
        let shared = Arc::clone(&self.shared);
        let workers = Arc::clone(&self.workers);

        self.tasks.spawn(async move {
            match workers.acquire_owned().await {
                Ok(_permit) => {
                    shared.task_started();
                    let outcome = AssertUnwindSafe(task).catch_unwind().await;
                    shared.task_stopped();
                    if let Err(payload) = outcome {
                        shared.record_fatal(Error::worker_panic(&name, panic_message(&*payload)));
                    }
                }
                Err(_) => debug!(task = %name, "Worker pool closed before task started"),
            }
            shared.task_finished();
        });
    }

    /// Drop join results of tasks that already finished
    fn reap_finished(&mut self) {
        while let Some(Some(joined)) = self.tasks.join_next().now_or_never() {
            if let Err(e) = joined {
                if !e.is_cancelled() {
                    self.shared
                        .record_fatal(Error::worker_panic("worker", e.to_string()));
                }
            }
        }
    }

    /// Record a fatal error and stop accepting new tasks
    ///
    /// Tasks already submitted keep running to completion.
    pub fn shutdown_on_error(&mut self, err: Error) {
        self.shared.record_fatal(err);
        self.accepting = false;
    }

    /// Surface an error that escaped a worker task
    pub fn check_for_errors(&mut self) -> Result<()> {
        self.reap_finished();
        match self.shared.fatal_error() {
            Some(err) => {
                self.accepting = false;
                Err(Error::Shared(err))
            }
            None => Ok(()),
        }
    }

    /// Wait for every submitted task to finish
    pub async fn wait_until_done(&mut self) -> Result<()> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                if !e.is_cancelled() {
                    self.shared
                        .record_fatal(Error::worker_panic("worker", e.to_string()));
                }
            }
        }
        self.check_for_errors()
    }

    /// Abort every remaining task and stop accepting new ones
    pub async fn shutdown(&mut self) {
        self.accepting = false;
        self.workers.close();
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
    }
}
