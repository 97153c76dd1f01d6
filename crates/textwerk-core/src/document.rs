// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The document entity and its lifecycle.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DocumentFormat, DocumentId, DocumentStatus};

/// Facts about the uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub file_path: PathBuf,
    /// Resolved MIME type, `application/octet-stream` when unknown.
    pub media_type: String,
    pub file_size: u64,
    /// SHA-256 of the file bytes, lowercase hex.
    pub sha256: String,
    pub uploaded_at: DateTime<Utc>,
    pub title: Option<String>,
    pub author: Option<String>,
}

impl FileMetadata {
    pub fn new(filename: String, file_path: PathBuf, file_size: u64, sha256: String) -> Self {
        let media_type = DocumentFormat::from_path(std::path::Path::new(&filename))
            .map(|f| f.mime_type().to_owned())
            .unwrap_or_else(|| "application/octet-stream".to_owned());
        Self {
            filename,
            file_path,
            media_type,
            file_size,
            sha256,
            uploaded_at: Utc::now(),
            title: None,
            author: None,
        }
    }
}

/// An uploaded document moving through the extraction lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub file_metadata: FileMetadata,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(file_metadata: FileMetadata) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new(),
            file_metadata,
            status: DocumentStatus::Uploaded,
            error_message: None,
            created_at: now,
            updated_at: now,
            processing_started_at: None,
            processing_completed_at: None,
        }
    }

    /// Move to an intermediate status. Starting extraction resets any
    /// earlier failure.
    pub fn advance(&mut self, status: DocumentStatus) {
        let now = Utc::now();
        if status == DocumentStatus::Extracting {
            self.processing_started_at = Some(now);
            self.processing_completed_at = None;
            self.error_message = None;
        }
        self.status = status;
        self.updated_at = now;
    }

    pub fn mark_completed(&mut self) {
        self.advance(DocumentStatus::Completed);
        self.processing_completed_at = Some(self.updated_at);
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.advance(DocumentStatus::Failed);
        self.error_message = Some(message.into());
        self.processing_completed_at = Some(self.updated_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::new(FileMetadata::new(
            "report.PDF".into(),
            PathBuf::from("/tmp/report.pdf"),
            10,
            "00".into(),
        ))
    }

    #[test]
    fn media_type_resolved_from_filename() {
        assert_eq!(sample().file_metadata.media_type, "application/pdf");
    }

    #[test]
    fn failure_then_retry_clears_message() {
        let mut doc = sample();
        doc.advance(DocumentStatus::Extracting);
        doc.mark_failed("We could not read this file.");
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert!(doc.status.is_terminal());
        assert!(doc.error_message.is_some());

        doc.advance(DocumentStatus::Extracting);
        assert!(doc.error_message.is_none());
        assert!(doc.processing_completed_at.is_none());
    }
}
