// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — image-file extraction, decoding and description.

pub mod extractor;
pub mod processor;

pub use extractor::ImageExtractor;
pub use processor::ImageProcessor;
