// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact files written for a processed document.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use textwerk_core::error::Result;
use textwerk_core::structured::StructuredData;
use textwerk_pipeline::structure::{structure_table, to_csv};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableFormat {
    /// One CSV file per table
    Csv,
    /// One JSON file per table: column schema plus row records
    Json,
}

/// Write `{stem}.json` and, when asked, one file per table. Returns the
/// paths written.
pub fn write_artifacts(
    out_dir: &Path,
    stem: &str,
    data: &StructuredData,
    tables: Option<TableFormat>,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;

    let main = out_dir.join(format!("{stem}.json"));
    std::fs::write(&main, serde_json::to_string_pretty(data)?)?;
    let mut written = vec![main];

    let Some(format) = tables else {
        return Ok(written);
    };
    let blocks = data.data.content_blocks.iter().filter_map(|block| block.as_table());
    for (n, table) in blocks.enumerate() {
        let (path, body) = match format {
            TableFormat::Csv => (out_dir.join(format!("{stem}.table-{}.csv", n + 1)), to_csv(&table)),
            TableFormat::Json => (
                out_dir.join(format!("{stem}.table-{}.json", n + 1)),
                serde_json::to_string_pretty(&structure_table(&table))?,
            ),
        };
        std::fs::write(&path, body)?;
        written.push(path);
    }
    Ok(written)
}
