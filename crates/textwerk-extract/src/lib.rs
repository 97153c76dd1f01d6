// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// textwerk-extract — Format extraction for the Textwerk pipeline.
//
// Resolves a file's media type to one of the registered extractors (PDF,
// spreadsheet, Word, image), runs the two PDF engines side by side and merges
// their output, and provides the OCR subsystem (preprocessing, multi-attempt
// recognition, post-correction) used by the pipeline's image stage.

pub mod image;
pub mod ocr;
pub mod office;
pub mod pdf;
pub mod selector;

pub use crate::image::{ImageExtractor, ImageProcessor};
pub use crate::ocr::{OcrEngine, OcrOutcome, OcrService, TesseractEngine, TesseractLocator};
pub use crate::office::{SpreadsheetExtractor, WordExtractor};
pub use crate::pdf::PdfExtractor;
pub use crate::selector::{Extractor, ExtractorRegistry, resolve_media_type};

#[cfg(feature = "ocrs")]
pub use crate::ocr::ocrs_engine::{OcrsConfig, OcrsTextEngine};
