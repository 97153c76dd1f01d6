// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Textwerk.

use thiserror::Error;

/// Top-level error type for all Textwerk operations.
#[derive(Debug, Error)]
pub enum TextwerkError {
    // -- Extraction taxonomy --
    #[error("extraction not supported: {0}")]
    ExtractionNotSupported(String),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    // -- Processing taxonomy --
    #[error("enrichment failed: {0}")]
    Enrichment(String),

    #[error("structuring failed: {0}")]
    Structuring(String),

    #[error("processing failed: {0}")]
    Processing(String),

    // -- Library-level errors (wrapped at stage boundaries) --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("NLP analysis failed: {0}")]
    Nlp(String),

    #[error("office package error: {0}")]
    Package(String),

    // -- Storage / persistence --
    #[error("storage error: {0}")]
    Storage(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification used by callers deciding how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No extractor accepts the input. A caller input error.
    ExtractionNotSupported,
    /// An engine failed on a supported input.
    ExtractionFailed,
    /// Failure past extraction (enrichment, structuring, orchestration).
    Processing,
    /// Storage, repositories, configuration, raw I/O.
    Infrastructure,
}

impl TextwerkError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ExtractionNotSupported(_) => ErrorCategory::ExtractionNotSupported,
            Self::ExtractionFailed(_)
            | Self::PdfError(_)
            | Self::ImageError(_)
            | Self::OcrError(_)
            | Self::Package(_) => ErrorCategory::ExtractionFailed,
            Self::Enrichment(_) | Self::Structuring(_) | Self::Processing(_) | Self::Nlp(_) => {
                ErrorCategory::Processing
            }
            Self::Storage(_)
            | Self::Repository(_)
            | Self::DocumentNotFound(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Re-raise an error caught at the extraction stage boundary.
    ///
    /// Taxonomy errors pass through untouched; anything else becomes
    /// `ExtractionFailed` with the original detail kept in the message.
    pub fn into_extraction_failure(self) -> Self {
        match self {
            Self::ExtractionNotSupported(_) | Self::ExtractionFailed(_) => self,
            other => Self::ExtractionFailed(other.to_string()),
        }
    }

    /// Re-raise an error caught at the enrichment stage boundary.
    pub fn into_enrichment_failure(self) -> Self {
        match self {
            Self::Enrichment(_) => self,
            other => Self::Enrichment(other.to_string()),
        }
    }

    /// Re-raise an error caught at the structuring stage boundary.
    pub fn into_structuring_failure(self) -> Self {
        match self {
            Self::Structuring(_) => self,
            other => Self::Structuring(other.to_string()),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TextwerkError>;
