// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Cooperative task queue for host callbacks
//!
//! Network work runs on tokio tasks, but everything the host application
//! observes (ready-state changes, `load`/`error`/`abort` listeners, legacy
//! `onreadystatechange` handlers) is queued back here and executed one task
//! at a time on the task that drives [`EventLoop::run_until_idle`].

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// A unit of host work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Event loop shared by a window and the objects it creates
#[derive(Clone)]
pub struct EventLoop {
    inner: Arc<EventLoopInner>,
}

struct EventLoopInner {
    /// Tasks ready to run
    queue: Mutex<VecDeque<Task>>,
    /// Spawned network operations that have not queued their completion yet
    in_flight: AtomicUsize,
    completions_tx: mpsc::UnboundedSender<Task>,
    completions_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Task>>,
    /// Origin for event timestamps
    time_origin: Instant,
    /// Maximum tasks per drain to prevent runaway loops
    max_tasks: usize,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    /// Create a new event loop
    pub fn new() -> Self {
        Self::with_max_tasks(10_000)
    }

    /// Create with a custom limit on tasks run per drain
    pub fn with_max_tasks(max_tasks: usize) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(EventLoopInner {
                queue: Mutex::new(VecDeque::new()),
                in_flight: AtomicUsize::new(0),
                completions_tx,
                completions_rx: tokio::sync::Mutex::new(completions_rx),
                time_origin: Instant::now(),
                max_tasks,
            }),
        }
    }

    /// Milliseconds since the loop was created (event `timeStamp` clock)
    pub fn now(&self) -> f64 {
        self.inner.time_origin.elapsed().as_secs_f64() * 1000.0
    }

    /// Queue a task to run on the next drain
    pub fn queue_task(&self, task: impl FnOnce() + Send + 'static) {
        self.inner.queue.lock().push_back(Box::new(task));
    }

    /// Run `operation` on the tokio runtime and queue the task it yields
    ///
    /// If the operation panics its completion is dropped, so the loop never
    /// waits on it forever.
    pub fn spawn_io<F>(&self, operation: F) -> Result<()>
    where
        F: Future<Output = Task> + Send + 'static,
    {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::config(format!("no async runtime for network work: {}", e)))?;

        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let tx = self.inner.completions_tx.clone();
        handle.spawn(async move {
            let task: Task = match AssertUnwindSafe(operation).catch_unwind().await {
                Ok(task) => task,
                Err(_) => {
                    tracing::error!("network operation panicked; completion dropped");
                    Box::new(|| {})
                }
            };
            let _ = tx.send(task);
        });
        Ok(())
    }

    /// Number of queued tasks plus in-flight network operations
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len() + self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Run every task that is ready right now, without waiting on the network
    pub fn run_ready(&self) -> usize {
        let mut ran = 0;
        while ran < self.inner.max_tasks {
            let task = self.inner.queue.lock().pop_front();
            let Some(task) = task else { break };
            task();
            ran += 1;
        }
        ran
    }

    /// Drive the loop until no tasks are queued and no network work is in flight
    ///
    /// Returns the number of tasks run.
    pub async fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            ran += self.run_ready();
            if ran >= self.inner.max_tasks {
                tracing::warn!(max_tasks = self.inner.max_tasks, "event loop task limit reached");
                break;
            }

            if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                if self.inner.queue.lock().is_empty() {
                    break;
                }
                continue;
            }

            let completion = self.inner.completions_rx.lock().await.recv().await;
            match completion {
                Some(task) => {
                    self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                    self.inner.queue.lock().push_back(task);
                }
                None => break,
            }
        }
        ran
    }
}
