// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deterministic merge of the two PDF engines' results.

use std::collections::BTreeSet;

use textwerk_core::extraction::{ExtractionResult, TextBlock};

/// Combine the text/table engine's result with the structure/image engine's.
///
/// Tables come from the text engine and images from the structure engine.
/// Each page contributes one text block, the structure engine's when it
/// produced one for that page. Metadata is shallow-merged with the structure
/// engine winning on conflicts.
pub fn merge(text: ExtractionResult, structure: ExtractionResult) -> ExtractionResult {
    let mut seen_pages = BTreeSet::new();
    let mut text_blocks: Vec<TextBlock> = Vec::new();

    for block in structure.text_blocks.into_iter().chain(text.text_blocks) {
        let Some(page) = block.metadata.page_number else {
            continue;
        };
        if seen_pages.insert(page) {
            text_blocks.push(block);
        }
    }
    text_blocks.sort_by_key(|block| (block.metadata.page_or_zero(), block.metadata.order));

    let mut raw_metadata = text.raw_metadata;
    raw_metadata.extend(structure.raw_metadata);

    ExtractionResult {
        text_blocks,
        tables: text.tables,
        images: structure.images,
        structure: structure.structure.or(text.structure),
        raw_metadata,
    }
}
