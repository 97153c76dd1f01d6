// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Textwerk — Core types, configuration, and error definitions shared across all crates.

pub mod config;
pub mod document;
pub mod error;
pub mod extraction;
pub mod human_errors;
pub mod structured;
pub mod types;

pub use config::PipelineConfig;
pub use document::{Document, FileMetadata};
pub use error::{Result, TextwerkError};
pub use extraction::*;
pub use structured::*;
pub use types::*;
