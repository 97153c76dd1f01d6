// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Processing queue — runs documents in the background with a cap on how many
// are processed at once. Documents beyond the cap wait for a permit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use textwerk_core::document::Document;
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::types::DocumentId;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span};

use crate::pipeline::ProgressCallback;
use crate::service::DocumentService;

type Tasks = HashMap<DocumentId, JoinHandle<Result<Document>>>;

pub struct ProcessingQueue {
    service: Arc<DocumentService>,
    permits: Arc<Semaphore>,
    capacity: usize,
    tasks: Mutex<Tasks>,
}

impl ProcessingQueue {
    /// `max_concurrent` of zero is treated as one.
    pub fn new(service: Arc<DocumentService>, max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            service,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn service(&self) -> &Arc<DocumentService> {
        &self.service
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Documents being processed right now.
    pub fn running(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Schedule a document. A document already queued keeps its first task.
    ///
    /// Finished tasks nobody waited for are dropped here; their outcome stays
    /// on the stored document.
    pub fn submit(&self, id: DocumentId, progress: Option<ProgressCallback>) -> Result<()> {
        let mut tasks = self.tasks.lock().map_err(poisoned)?;
        if tasks.get(&id).is_some_and(|task| !task.is_finished()) {
            debug!(%id, "document already queued");
            return Ok(());
        }
        let before = tasks.len();
        tasks.retain(|_, task| !task.is_finished());
        if tasks.len() < before {
            debug!(pruned = before - tasks.len(), "dropped finished tasks");
        }

        let service = Arc::clone(&self.service);
        let permits = Arc::clone(&self.permits);
        let task = tokio::spawn(
            async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| TextwerkError::Processing("processing queue closed".into()))?;
                service.process(id, progress).await
            }
            .instrument(info_span!("queued_document", %id)),
        );
        tasks.insert(id, task);
        Ok(())
    }

    /// Wait for a submitted document and return its final record.
    pub async fn wait(&self, id: DocumentId) -> Result<Document> {
        let task = self
            .tasks
            .lock()
            .map_err(poisoned)?
            .remove(&id)
            .ok_or_else(|| TextwerkError::DocumentNotFound(format!("{id} is not queued")))?;
        task.await
            .map_err(|err| TextwerkError::Processing(format!("processing task failed: {err}")))?
    }

    /// Tasks held for `wait` or `drain`, finished or not.
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Wait for every submitted document, in no particular order.
    pub async fn drain(&self) -> Vec<(DocumentId, Result<Document>)> {
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        let mut finished = Vec::with_capacity(tasks.len());
        for (id, task) in tasks {
            let outcome = task
                .await
                .map_err(|err| TextwerkError::Processing(format!("processing task failed: {err}")))
                .and_then(|outcome| outcome);
            finished.push((id, outcome));
        }
        finished
    }
}

fn poisoned<T>(_: PoisonError<T>) -> TextwerkError {
    TextwerkError::Processing("processing queue lock poisoned".into())
}
