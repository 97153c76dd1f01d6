// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extractor selection: media-type resolution and registration-order dispatch.

use std::path::Path;

use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::extraction::ExtractionResult;
use textwerk_core::types::DocumentFormat;
use tracing::{debug, info, instrument};

use crate::image::extractor::ImageExtractor;
use crate::office::spreadsheet::SpreadsheetExtractor;
use crate::office::word::WordExtractor;
use crate::pdf::PdfExtractor;

/// Resolve a media type from a file path's extension.
pub fn resolve_media_type(path: &Path) -> Result<&'static str> {
    DocumentFormat::from_path(path)
        .map(|format| format.mime_type())
        .ok_or_else(|| {
            TextwerkError::ExtractionNotSupported(format!(
                "cannot determine the file type of {}",
                path.display()
            ))
        })
}

/// The closed set of format extractors.
#[derive(Debug, Clone)]
pub enum Extractor {
    Pdf(PdfExtractor),
    Spreadsheet(SpreadsheetExtractor),
    Word(WordExtractor),
    Image(ImageExtractor),
}

impl Extractor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pdf(_) => "pdf",
            Self::Spreadsheet(_) => "spreadsheet",
            Self::Word(_) => "word",
            Self::Image(_) => "image",
        }
    }

    /// Capability predicate over a media type.
    pub fn supports(&self, media_type: &str) -> bool {
        let Some(format) = DocumentFormat::from_mime_type(media_type) else {
            return false;
        };
        match self {
            Self::Pdf(_) => format == DocumentFormat::Pdf,
            Self::Spreadsheet(_) => format == DocumentFormat::Xlsx,
            Self::Word(_) => format == DocumentFormat::Docx,
            Self::Image(_) => format.is_image(),
        }
    }

    /// Run the extractor against a file. Blocking.
    pub fn extract(&self, path: &Path) -> Result<ExtractionResult> {
        let result = match self {
            Self::Pdf(extractor) => extractor.extract(path),
            Self::Spreadsheet(extractor) => extractor.extract(path),
            Self::Word(extractor) => extractor.extract(path),
            Self::Image(extractor) => extractor.extract(path),
        };
        result.map_err(TextwerkError::into_extraction_failure)
    }
}

/// Extractors in registration order. The first one accepting a media type wins.
#[derive(Debug, Clone)]
pub struct ExtractorRegistry {
    extractors: Vec<Extractor>,
}

impl Default for ExtractorRegistry {
    /// PDF, Spreadsheet, Word, Image.
    fn default() -> Self {
        Self {
            extractors: vec![
                Extractor::Pdf(PdfExtractor),
                Extractor::Spreadsheet(SpreadsheetExtractor),
                Extractor::Word(WordExtractor),
                Extractor::Image(ImageExtractor),
            ],
        }
    }
}

impl ExtractorRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    pub fn register(&mut self, extractor: Extractor) {
        debug!(extractor = extractor.name(), "extractor registered");
        self.extractors.push(extractor);
    }

    /// Pick the extractor for a file.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn select(&self, path: &Path) -> Result<&Extractor> {
        let media_type = resolve_media_type(path)?;
        let extractor = self
            .extractors
            .iter()
            .find(|extractor| extractor.supports(media_type))
            .ok_or_else(|| {
                TextwerkError::ExtractionNotSupported(format!(
                    "no extractor available for {media_type}"
                ))
            })?;
        info!(extractor = extractor.name(), media_type, "extractor selected");
        Ok(extractor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_by_registration_order() {
        let registry = ExtractorRegistry::default();
        assert_eq!(registry.select(Path::new("a.pdf")).unwrap().name(), "pdf");
        assert_eq!(registry.select(Path::new("b.XLSX")).unwrap().name(), "spreadsheet");
        assert_eq!(registry.select(Path::new("c.docx")).unwrap().name(), "word");
        assert_eq!(registry.select(Path::new("d.tif")).unwrap().name(), "image");
    }

    #[test]
    fn unknown_extension_is_not_supported() {
        let err = ExtractorRegistry::default()
            .select(Path::new("notes.txt"))
            .unwrap_err();
        assert!(matches!(err, TextwerkError::ExtractionNotSupported(_)));
    }

    #[test]
    fn legacy_binary_formats_resolve_but_are_not_supported() {
        assert_eq!(
            resolve_media_type(Path::new("old.doc")).unwrap(),
            "application/msword"
        );
        let err = ExtractorRegistry::default()
            .select(Path::new("old.xls"))
            .unwrap_err();
        assert!(matches!(err, TextwerkError::ExtractionNotSupported(_)));
    }

    #[test]
    fn earlier_registration_wins() {
        let mut registry = ExtractorRegistry::empty();
        registry.register(Extractor::Image(ImageExtractor));
        registry.register(Extractor::Pdf(PdfExtractor));
        assert_eq!(registry.select(Path::new("x.png")).unwrap().name(), "image");
        assert!(registry.select(Path::new("x.docx")).is_err());
    }
}
