// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR subsystem: engine contract, preprocessing strategies, multi-attempt
// recognition, and post-correction.

pub mod correct;
pub mod engine;
pub mod locate;
pub mod preprocess;
pub mod service;
pub mod tesseract;

#[cfg(feature = "ocrs")]
pub mod ocrs_engine;

pub use correct::OcrCorrector;
pub use engine::{OcrEngine, RecognitionRequest, RecognizedText};
pub use locate::TesseractLocator;
pub use service::{OcrOutcome, OcrService};
pub use tesseract::TesseractEngine;
