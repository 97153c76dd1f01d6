// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-unit processors run between extraction and structuring.

pub mod image;
pub mod metadata;
pub mod nlp;
pub mod table_normalizer;
pub mod text_enricher;

pub use image::ImageStage;
pub use nlp::{Analysis, MinimalAnalyzer, NlpAnalyzer, PatternAnalyzer, resolve_analyzer};
pub use text_enricher::TextEnricher;
