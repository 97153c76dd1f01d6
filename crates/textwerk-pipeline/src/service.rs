// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document service — upload, process, and delete documents, keeping the
// document lifecycle and the stored results in step.

use std::path::Path;
use std::sync::Arc;

use textwerk_core::config::PipelineConfig;
use textwerk_core::document::{Document, FileMetadata};
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::human_errors::humanize_error;
use textwerk_core::structured::{ContentBlock, StructuredData};
use textwerk_core::types::{ContentType, DocumentId, DocumentStatus};
use tracing::{info, instrument, warn};

use crate::pipeline::{ExtractionPipeline, PipelineOutput, ProgressCallback, Stage};
use crate::repository::{
    ContentBlockRepository, DocumentRepository, InMemoryContentBlockRepository,
    InMemoryDocumentRepository, InMemoryStructuredDataRepository, StructuredDataRepository,
};
use crate::storage::{LocalStorage, RawStorage, hash_bytes};

pub struct DocumentService {
    pipeline: ExtractionPipeline,
    storage: Arc<dyn RawStorage>,
    documents: Arc<dyn DocumentRepository>,
    blocks: Arc<dyn ContentBlockRepository>,
    structured: Arc<dyn StructuredDataRepository>,
    max_file_size: u64,
}

impl std::fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentService")
            .field("pipeline", &self.pipeline)
            .field("max_file_size", &self.max_file_size)
            .finish_non_exhaustive()
    }
}

impl DocumentService {
    pub fn new(
        pipeline: ExtractionPipeline,
        storage: Arc<dyn RawStorage>,
        documents: Arc<dyn DocumentRepository>,
        blocks: Arc<dyn ContentBlockRepository>,
        structured: Arc<dyn StructuredDataRepository>,
        max_file_size: u64,
    ) -> Self {
        Self {
            pipeline,
            storage,
            documents,
            blocks,
            structured,
            max_file_size,
        }
    }

    /// Pipeline from `config`, files under `config.upload_dir`, records in memory.
    pub fn in_memory(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(
            ExtractionPipeline::from_config(config)?,
            Arc::new(LocalStorage::new(&config.upload_dir)?),
            Arc::new(InMemoryDocumentRepository::default()),
            Arc::new(InMemoryContentBlockRepository::default()),
            Arc::new(InMemoryStructuredDataRepository::default()),
            config.max_file_size,
        ))
    }

    pub fn pipeline(&self) -> &ExtractionPipeline {
        &self.pipeline
    }

    /// Validate and store a file, and record it as `Uploaded`.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub fn upload(&self, data: &[u8], filename: &str) -> Result<Document> {
        if data.is_empty() {
            return Err(TextwerkError::ExtractionNotSupported(format!("{filename} is empty")));
        }
        let size = data.len() as u64;
        if size > self.max_file_size {
            return Err(TextwerkError::ExtractionNotSupported(format!(
                "{filename} is {size} bytes, the limit is {}",
                self.max_file_size
            )));
        }
        self.pipeline.registry().select(Path::new(filename))?;

        let path = self.storage.save(data, filename)?;
        let document = Document::new(FileMetadata::new(
            filename.to_owned(),
            path,
            size,
            hash_bytes(data),
        ));
        self.documents.save(&document)?;
        info!(document_id = %document.id, media_type = %document.file_metadata.media_type, "document uploaded");
        Ok(document)
    }

    /// Run the pipeline for a document and store its results.
    ///
    /// Earlier blocks and structured data are removed first. On failure the
    /// document ends `Failed` with a readable message and the error is
    /// returned.
    #[instrument(skip(self, progress), fields(%id))]
    pub async fn process(&self, id: DocumentId, progress: Option<ProgressCallback>) -> Result<Document> {
        let mut document = self.document(id)?;
        document.advance(DocumentStatus::Extracting);
        self.documents.save(&document)?;

        let cleared = self.blocks.delete_for_document(id)?;
        if self.structured.delete_for_document(id)? || cleared > 0 {
            info!(blocks = cleared, "previous results cleared");
        }

        let callback = self.status_callback(id, progress);
        let outcome = match self.pipeline.run(&document, Some(callback)).await {
            Ok(output) => self.persist(&output).map(|()| output),
            Err(err) => Err(err),
        };

        let mut document = self.document(id)?;
        match outcome {
            Ok(output) => {
                if document.file_metadata.title.is_none() {
                    document.file_metadata.title = output.title;
                }
                if document.file_metadata.author.is_none() {
                    document.file_metadata.author = output.author;
                }
                document.mark_completed();
                self.documents.save(&document)?;
                info!(blocks = output.content_blocks.len(), "document completed");
                Ok(document)
            }
            Err(err) => {
                let human = humanize_error(&err);
                warn!(error = %err, "document failed");
                document.mark_failed(human.summary());
                self.documents.save(&document)?;
                Err(err)
            }
        }
    }

    /// Remove a document, its results, and its file unless another document
    /// shares it.
    #[instrument(skip(self), fields(%id))]
    pub fn delete(&self, id: DocumentId) -> Result<()> {
        let document = self.document(id)?;
        self.blocks.delete_for_document(id)?;
        self.structured.delete_for_document(id)?;
        self.documents.delete(id)?;

        let path = &document.file_metadata.file_path;
        let shared = self
            .documents
            .list()?
            .iter()
            .any(|other| &other.file_metadata.file_path == path);
        if !shared {
            self.storage.delete(path)?;
        }
        info!("document deleted");
        Ok(())
    }

    pub fn document(&self, id: DocumentId) -> Result<Document> {
        self.documents
            .get(id)?
            .ok_or_else(|| TextwerkError::DocumentNotFound(id.to_string()))
    }

    pub fn documents(&self) -> Result<Vec<Document>> {
        self.documents.list()
    }

    pub fn content_blocks(&self, id: DocumentId) -> Result<Vec<ContentBlock>> {
        self.blocks.for_document(id)
    }

    pub fn blocks_by_type(&self, id: DocumentId, content_type: ContentType) -> Result<Vec<ContentBlock>> {
        self.blocks.by_type(id, content_type)
    }

    pub fn blocks_by_page(&self, id: DocumentId, page: u32) -> Result<Vec<ContentBlock>> {
        self.blocks.by_page(id, page)
    }

    pub fn structured_data(&self, id: DocumentId) -> Result<Option<StructuredData>> {
        self.structured.for_document(id)
    }

    /// Blocks and artifact are written together or not at all.
    fn persist(&self, output: &PipelineOutput) -> Result<()> {
        let document_id = output.structured.document_id;
        self.blocks.save_all(&output.content_blocks)?;
        if let Err(err) = self.structured.replace(&output.structured) {
            self.blocks.delete_for_document(document_id)?;
            return Err(err);
        }
        Ok(())
    }

    /// Advance the stored status at each milestone, then forward to the
    /// caller's callback.
    fn status_callback(&self, id: DocumentId, progress: Option<ProgressCallback>) -> ProgressCallback {
        let documents = Arc::clone(&self.documents);
        Arc::new(move |stage, value| {
            let statuses: &[DocumentStatus] = match stage {
                Stage::Extracting | Stage::Completed => &[],
                Stage::ProcessingImages => &[DocumentStatus::Extracted],
                Stage::Enriching => &[DocumentStatus::Enriching],
                Stage::Structuring => &[DocumentStatus::Enriched, DocumentStatus::Structuring],
            };
            if !statuses.is_empty()
                && let Some(mut document) = documents.get(id)?
            {
                for status in statuses {
                    document.advance(*status);
                }
                documents.save(&document)?;
            }
            match &progress {
                Some(callback) => callback(stage, value),
                None => Ok(()),
            }
        })
    }
}
