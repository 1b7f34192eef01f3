//! Bounded task pool that hands results back in completion order.
//!
//! Nothing in here knows about grids: a task is any `Fn(&K, T) -> R` over
//! items the caller owns or borrows for the duration of the call.

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

use crate::error::Result;

/// Shared flag a caller can flip to stop tasks that have not started yet.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Observer told about every finished task, on the collecting thread.
pub trait Progress {
    fn on_complete(&self, done: usize, total: usize);
}

/// Ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_complete(&self, _done: usize, _total: usize) {}
}

/// Heartbeat through `tracing` every `every` completions and on the last one.
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    pub every: usize,
}

impl Progress for LogProgress {
    fn on_complete(&self, done: usize, total: usize) {
        if done == total || (self.every > 0 && done % self.every == 0) {
            info!(done, total, "grids built {done}/{total}");
        }
    }
}

impl<F: Fn(usize, usize)> Progress for F {
    fn on_complete(&self, done: usize, total: usize) {
        self(done, total)
    }
}

/// How one task ended.
#[derive(Debug)]
pub enum TaskOutcome<K, R> {
    Done(K, R),
    /// The task panicked; the message is whatever the panic carried.
    Panicked(K, String),
    /// Skipped because the token was cancelled before it started.
    Cancelled(K),
}

impl<K, R> TaskOutcome<K, R> {
    pub fn key(&self) -> &K {
        match self {
            TaskOutcome::Done(k, _) | TaskOutcome::Panicked(k, _) | TaskOutcome::Cancelled(k) => k,
        }
    }
}

/// Fixed number of worker threads.
pub struct WorkerPool {
    pool:    ThreadPool,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("grid-worker-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` once per item and return outcomes as tasks finish.
    ///
    /// The returned order is completion order, not input order.
    pub fn map_unordered<K, T, R, F>(
        &self,
        items:    Vec<(K, T)>,
        task:     F,
        progress: &dyn Progress,
        cancel:   &CancelToken,
    ) -> Vec<TaskOutcome<K, R>>
    where
        K: Send,
        T: Send,
        R: Send,
        F: Fn(&K, T) -> R + Sync,
    {
        let total = items.len();
        let mut out = Vec::with_capacity(total);
        let (tx, rx) = crossbeam_channel::unbounded();
        let task = &task;

        self.pool.in_place_scope(|s| {
            for (key, item) in items {
                let tx = tx.clone();
                s.spawn(move |_| {
                    let outcome = if cancel.is_cancelled() {
                        TaskOutcome::Cancelled(key)
                    } else {
                        match catch_unwind(AssertUnwindSafe(|| task(&key, item))) {
                            Ok(r)  => TaskOutcome::Done(key, r),
                            Err(p) => TaskOutcome::Panicked(key, panic_message(p.as_ref())),
                        }
                    };
                    // receiver outlives the scope, so this cannot fail
                    let _ = tx.send(outcome);
                });
            }
            drop(tx);

            for (i, outcome) in rx.iter().enumerate() {
                progress.on_complete(i + 1, total);
                out.push(outcome);
            }
        });

        out
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
