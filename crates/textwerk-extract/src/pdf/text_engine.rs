// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text/table-fidelity PDF engine: page text plus tables detected from
// aligned text positions.

use serde_json::Value;
use textwerk_core::error::Result;
use textwerk_core::extraction::{ContentMetadata, ExtractionResult, TableBlock, TextBlock};
use textwerk_core::types::ExtractionMethod;
use tracing::{debug, instrument, warn};

use super::content::{group_lines, page_spans};
use super::reader::PdfReader;
use super::tables::detect_tables;

#[instrument(skip_all, fields(pages = reader.page_count()))]
pub fn extract(reader: &PdfReader) -> Result<ExtractionResult> {
    let mut result = ExtractionResult::default();

    for (page_number, page_id) in reader.pages() {
        let spans = page_spans(reader, page_id)?;
        let lines = group_lines(spans);

        let text = match reader.page_text(page_number) {
            Ok(text) => text,
            Err(err) => {
                warn!(page_number, %err, "font tables unreadable, using positioned text");
                lines
                    .iter()
                    .map(|line| line.text())
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        };
        let text = text.trim();
        if !text.is_empty() {
            let metadata = ContentMetadata::new(result.text_blocks.len() as u32)
                .with_page(page_number)
                .with_method(ExtractionMethod::PdfText);
            result.text_blocks.push(TextBlock::new(text, metadata));
        }

        for table in detect_tables(&lines) {
            let mut rows = table.rows.into_iter();
            let headers = rows.next().unwrap_or_default();
            let metadata = ContentMetadata::new(result.tables.len() as u32)
                .with_page(page_number)
                .with_method(ExtractionMethod::PdfText)
                .with_extra("top", f64::from(table.top));
            result.tables.push(TableBlock::from_raw(
                headers.into_iter().map(Some).collect(),
                rows.map(|row| row.into_iter().map(Some).collect()).collect(),
                metadata,
            ));
        }
    }

    result.raw_metadata = reader.info_metadata();
    result
        .raw_metadata
        .insert("page_count".into(), Value::from(reader.page_count()));
    result
        .raw_metadata
        .insert("engine".into(), Value::from("text"));

    debug!(
        text_blocks = result.text_blocks.len(),
        tables = result.tables.len(),
        "text engine done"
    );
    Ok(result)
}
