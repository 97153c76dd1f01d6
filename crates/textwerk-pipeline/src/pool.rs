// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded pool for blocking and CPU-bound work.

use std::sync::Arc;

use textwerk_core::error::{Result, TextwerkError};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Runs blocking jobs on tokio's blocking threads, at most `size` at a time.
#[derive(Debug, Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl BlockingPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs that could start right now.
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Submit a job and await its result.
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.submit(job)
            .await
            .map_err(|err| TextwerkError::Processing(format!("blocking job was lost: {err}")))?
    }

    /// Submit a job; the handle resolves once it has run.
    pub fn submit<F, T>(&self, job: F) -> JoinHandle<Result<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| TextwerkError::Processing("blocking pool is closed".into()))?;
            tokio::task::spawn_blocking(job)
                .await
                .map_err(|err| TextwerkError::Processing(format!("blocking job panicked: {err}")))
        })
    }
}
