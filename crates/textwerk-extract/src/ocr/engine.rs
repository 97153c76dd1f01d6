// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine contract.

use textwerk_core::error::Result;
use textwerk_core::types::SegmentationMode;

/// Sentinel the engine reports for tokens without a confidence value.
pub const NO_CONFIDENCE: f32 = -1.0;

/// Parameters for one recognition call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionRequest {
    /// Language tag, e.g. `fra+eng`.
    pub language: String,
    pub mode: SegmentationMode,
    /// Engine mode (`--oem`).
    pub engine_mode: u8,
}

/// Raw engine output: text plus per-token confidences on a 0-100 scale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    pub confidences: Vec<f32>,
}

impl RecognizedText {
    /// Mean token confidence in [0, 1], ignoring no-confidence tokens.
    pub fn mean_confidence(&self) -> f32 {
        let scored: Vec<f32> = self
            .confidences
            .iter()
            .copied()
            .filter(|c| *c != NO_CONFIDENCE)
            .collect();
        if scored.is_empty() {
            return 0.0;
        }
        (scored.iter().sum::<f32>() / scored.len() as f32 / 100.0).clamp(0.0, 1.0)
    }
}

/// An OCR engine. Implementations block; callers offload them.
pub trait OcrEngine: Send + Sync {
    /// Version string, or an error when the engine cannot run.
    fn version(&self) -> Result<String>;

    /// Recognize text in PNG-encoded image bytes.
    fn recognize(&self, png: &[u8], request: &RecognitionRequest) -> Result<RecognizedText>;
}
