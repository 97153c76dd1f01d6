// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Office Open XML extractors (Word and spreadsheet packages).

pub mod package;
pub mod spreadsheet;
pub mod word;

pub use package::OfficePackage;
pub use spreadsheet::SpreadsheetExtractor;
pub use word::WordExtractor;
