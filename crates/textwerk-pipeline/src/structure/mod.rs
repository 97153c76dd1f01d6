// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structuring: typed linked blocks, then the document-level artifact.

pub mod content;
pub mod document;
pub mod table;

pub use content::ContentStructurer;
pub use document::build_structured_data;
pub use table::{ColumnSchema, StructuredTable, structure_table, to_csv};
