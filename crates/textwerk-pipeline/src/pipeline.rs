// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline orchestrator.
//
// One document runs through four strictly sequential stages:
//
//   extract      pick the extractor for the file and run it
//   images       describe every image, OCR it, feed the text back in
//   enrich       text enrichment and table normalization, side by side
//   structure    typed linked blocks, section tree, indices, statistics
//
// Units inside a stage fan out on the blocking pool and are collected back
// in input order. A stage failure aborts the run; nothing is persisted here.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde_json::{Map, Value};
use textwerk_core::config::PipelineConfig;
use textwerk_core::document::Document;
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::extraction::{ExtractionResult, TableBlock};
use textwerk_core::structured::{ContentBlock, StructuredData};
use textwerk_extract::ocr::{OcrService, TesseractLocator};
use textwerk_extract::selector::ExtractorRegistry;
use tracing::{info, instrument, warn};

use crate::pool::BlockingPool;
use crate::processors::metadata::{content_metadata, file_metadata, source_title_author};
use crate::processors::table_normalizer;
use crate::processors::{ImageStage, TextEnricher};
use crate::structure::{ContentStructurer, build_structured_data};

/// Progress milestones reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    ProcessingImages,
    Enriching,
    Structuring,
    Completed,
}

impl Stage {
    /// Fraction of the run done when the stage starts.
    pub fn progress(&self) -> f32 {
        match self {
            Self::Extracting => 0.1,
            Self::ProcessingImages => 0.25,
            Self::Enriching => 0.4,
            Self::Structuring => 0.7,
            Self::Completed => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracting => "extracting",
            Self::ProcessingImages => "processing_images",
            Self::Enriching => "enriching",
            Self::Structuring => "structuring",
            Self::Completed => "completed",
        }
    }
}

/// Best-effort progress sink. Errors and panics are logged and ignored.
pub type ProgressCallback = Arc<dyn Fn(Stage, f32) -> Result<()> + Send + Sync>;

/// Everything one successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Ordered and linked, same blocks as in `structured`.
    pub content_blocks: Vec<ContentBlock>,
    pub structured: StructuredData,
    /// As reported by the source document.
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    registry: Arc<ExtractorRegistry>,
    image_stage: ImageStage,
    enricher: TextEnricher,
    structurer: ContentStructurer,
    pool: BlockingPool,
}

impl ExtractionPipeline {
    pub fn new(
        registry: ExtractorRegistry,
        image_stage: ImageStage,
        enricher: TextEnricher,
        structurer: ContentStructurer,
        pool: BlockingPool,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            image_stage,
            enricher,
            structurer,
            pool,
        }
    }

    /// Default extractors, Tesseract when it can be found, and the configured
    /// NLP model.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let ocr = if config.ocr.enabled {
            let locator = TesseractLocator::from_settings(&config.ocr);
            OcrService::tesseract(config.ocr.clone(), &locator)?.map(Arc::new)
        } else {
            info!("OCR disabled by configuration");
            None
        };
        let enricher = TextEnricher::from_settings(&config.nlp)
            .map_err(TextwerkError::into_enrichment_failure)?;
        Ok(Self::new(
            ExtractorRegistry::default(),
            ImageStage::new(ocr),
            enricher,
            ContentStructurer::new(config.structure.parent_linking),
            BlockingPool::new(config.blocking_workers),
        ))
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    pub fn image_stage(&self) -> &ImageStage {
        &self.image_stage
    }

    pub fn pool(&self) -> &BlockingPool {
        &self.pool
    }

    /// Run every stage for one stored document.
    #[instrument(skip_all, fields(document_id = %document.id, file = %document.file_metadata.filename))]
    pub async fn run(
        &self,
        document: &Document,
        progress: Option<ProgressCallback>,
    ) -> Result<PipelineOutput> {
        let progress = progress.as_ref();

        report(progress, Stage::Extracting);
        let mut result = self.extract(document).await?;

        report(progress, Stage::ProcessingImages);
        let images = std::mem::take(&mut result.images);
        let (images, ocr_blocks) = self.image_stage.process_batch(&self.pool, images).await;
        result.images = images;
        result.text_blocks.extend(ocr_blocks);

        report(progress, Stage::Enriching);
        let text_blocks = std::mem::take(&mut result.text_blocks);
        let tables = std::mem::take(&mut result.tables);
        let (text_blocks, tables) = tokio::join!(
            self.enricher.enrich_batch(&self.pool, text_blocks),
            self.normalize_tables(tables),
        );
        result.text_blocks = text_blocks;
        result.tables = tables;

        report(progress, Stage::Structuring);
        let (title, author) = source_title_author(&result.raw_metadata);
        let structured = self.structure(document, result).await?;

        report(progress, Stage::Completed);
        info!(
            blocks = structured.data.statistics.total_blocks,
            pages = structured.data.statistics.total_pages,
            "pipeline completed"
        );
        Ok(PipelineOutput {
            content_blocks: structured.data.content_blocks.clone(),
            structured,
            title,
            author,
        })
    }

    async fn extract(&self, document: &Document) -> Result<ExtractionResult> {
        let path = document.file_metadata.file_path.clone();
        let extractor = self.registry.select(&path)?.clone();
        let result = self
            .pool
            .run(move || extractor.extract(&path))
            .await
            .and_then(|extracted| extracted)
            .map_err(TextwerkError::into_extraction_failure)?;
        if !result.has_content() {
            return Err(TextwerkError::ExtractionFailed(format!(
                "no content could be extracted from {}",
                document.file_metadata.filename
            )));
        }
        info!(
            text_blocks = result.text_blocks.len(),
            tables = result.tables.len(),
            images = result.images.len(),
            "extraction done"
        );
        Ok(result)
    }

    /// Normalize every table on the pool. A lost job keeps the raw table.
    async fn normalize_tables(&self, tables: Vec<TableBlock>) -> Vec<TableBlock> {
        let handles: Vec<_> = tables
            .into_iter()
            .map(|table| {
                let original = table.clone();
                (original, self.pool.submit(move || table_normalizer::normalize(table)))
            })
            .collect();
        let mut normalized = Vec::with_capacity(handles.len());
        for (original, handle) in handles {
            match handle.await {
                Ok(Ok(table)) => normalized.push(table),
                Ok(Err(err)) => {
                    warn!(error = %err, "table normalization failed");
                    normalized.push(original);
                }
                Err(err) => {
                    warn!(error = %err, "table normalization was lost");
                    normalized.push(original);
                }
            }
        }
        normalized
    }

    async fn structure(&self, document: &Document, result: ExtractionResult) -> Result<StructuredData> {
        let mut metadata = Map::new();
        metadata.insert("file".into(), Value::Object(file_metadata(document)));
        metadata.insert("content".into(), Value::Object(content_metadata(&result)));
        if !result.raw_metadata.is_empty() {
            metadata.insert("source".into(), Value::Object(result.raw_metadata.clone()));
        }
        if let Some(hints) = &result.structure {
            metadata.insert("structure_hints".into(), hints.clone());
        }

        let structurer = self.structurer;
        let document_id = document.id;
        self.pool
            .run(move || {
                let blocks = structurer.structure(document_id, &result);
                build_structured_data(document_id, blocks, metadata)
            })
            .await
            .map_err(TextwerkError::into_structuring_failure)
    }
}

fn report(progress: Option<&ProgressCallback>, stage: Stage) {
    let Some(callback) = progress else {
        return;
    };
    match std::panic::catch_unwind(AssertUnwindSafe(|| callback(stage, stage.progress()))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(stage = stage.as_str(), error = %err, "progress callback failed"),
        Err(_) => warn!(stage = stage.as_str(), "progress callback panicked"),
    }
}
