// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// textwerk-pipeline — Everything between an uploaded file and its stored
// structured data: per-unit processors, structuring, the staged orchestrator,
// persistence contracts, and the document service with its processing queue.

pub mod pipeline;
pub mod pool;
pub mod processors;
pub mod queue;
pub mod repository;
pub mod service;
pub mod storage;
pub mod structure;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::{ExtractionPipeline, PipelineOutput, ProgressCallback, Stage};
pub use pool::BlockingPool;
pub use queue::ProcessingQueue;
pub use repository::{
    ContentBlockRepository, DocumentRepository, InMemoryContentBlockRepository,
    InMemoryDocumentRepository, InMemoryStructuredDataRepository, StructuredDataRepository,
};
pub use service::DocumentService;
pub use storage::{LocalStorage, RawStorage, hash_bytes};
