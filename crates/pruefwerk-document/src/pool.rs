// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded worker pool for per-page work (rasterisation, transforms).
//
// Verification runs share one process-wide pool, so concurrent documents
// queue for the same fixed set of threads.

use std::sync::{Arc, OnceLock};

use pruefwerk_core::error::{PruefwerkError, Result};
use rayon::ThreadPool;
use tracing::debug;

static SHARED: OnceLock<WorkerPool> = OnceLock::new();

/// A shared, fixed-size rayon pool.
#[derive(Clone)]
pub struct WorkerPool {
    pool: Arc<ThreadPool>,
}

impl WorkerPool {
    /// Build a pool with `threads` workers (0 = one per available core).
    pub fn new(threads: usize) -> Result<Self> {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("pruefwerk-page-{index}"))
            .build()
            .map_err(|err| PruefwerkError::Backend(format!("failed to start worker pool: {err}")))?;
        debug!(threads, "Worker pool started");
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// The process-wide pool, started with `threads` workers on first use.
    ///
    /// Later calls return the pool from the first call whatever they ask for.
    pub fn shared(threads: usize) -> Result<Self> {
        if let Some(pool) = SHARED.get() {
            return Ok(pool.clone());
        }
        let pool = Self::new(threads)?;
        Ok(SHARED.get_or_init(|| pool).clone())
    }

    /// Whether both handles drive the same threads.
    pub fn is_same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pool, &other.pool)
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the pool so nested rayon iterators use its workers.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .finish()
    }
}
