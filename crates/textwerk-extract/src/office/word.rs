// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Word (.docx) extraction: paragraphs with heading styles, and tables, in
// body order.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::Value;
use textwerk_core::error::Result;
use textwerk_core::extraction::{ContentMetadata, ExtractionResult, TableBlock, TextBlock};
use textwerk_core::types::ExtractionMethod;
use tracing::{debug, instrument};

use super::package::{OfficePackage, attribute, xml_error};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";

#[derive(Debug, Clone, Copy, Default)]
pub struct WordExtractor;

impl WordExtractor {
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn extract(&self, path: &Path) -> Result<ExtractionResult> {
        let mut package = OfficePackage::open(path)?;
        extract_package(&mut package)
    }
}

pub(crate) fn extract_package<R: Read + Seek>(
    package: &mut OfficePackage<R>,
) -> Result<ExtractionResult> {
    let styles = match package.read_optional_part(STYLES_PART)? {
        Some(xml) => style_names(&xml)?,
        None => HashMap::new(),
    };
    let body = read_body(&package.read_part(DOCUMENT_PART)?)?;

    let mut result = ExtractionResult::default();
    let mut current_section: Option<String> = None;
    let mut order = 0u32;

    for item in body {
        match item {
            BodyItem::Paragraph { style, text } => {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                let style_name = style.map(|id| styles.get(&id).cloned().unwrap_or(id));
                let mut metadata = ContentMetadata::new(order).with_method(ExtractionMethod::Docx);
                match style_name.as_deref().and_then(heading_level) {
                    Some(level) => {
                        current_section = Some(text.to_owned());
                        metadata.section_level = Some(level);
                        metadata.section_title = Some(text.to_owned());
                        if let Some(name) = &style_name {
                            metadata = metadata.with_extra("style", name.as_str());
                        }
                    }
                    None => metadata.section_title = current_section.clone(),
                }
                result.text_blocks.push(TextBlock::new(text, metadata));
            }
            BodyItem::Table(rows) => {
                if rows.is_empty() {
                    continue;
                }
                let mut rows = rows.into_iter();
                let headers = rows.next().unwrap_or_default();
                let mut metadata = ContentMetadata::new(order).with_method(ExtractionMethod::Docx);
                metadata.section_title = current_section.clone();
                result.tables.push(TableBlock::from_raw(
                    headers.into_iter().map(Some).collect(),
                    rows.map(|row| row.into_iter().map(Some).collect()).collect(),
                    metadata,
                ));
            }
        }
        order += 1;
    }

    result.raw_metadata = package.core_properties()?;
    result
        .raw_metadata
        .insert("paragraph_count".into(), Value::from(result.text_blocks.len()));
    result
        .raw_metadata
        .insert("table_count".into(), Value::from(result.tables.len()));

    debug!(
        paragraphs = result.text_blocks.len(),
        tables = result.tables.len(),
        "word extraction done"
    );
    Ok(result)
}

/// Heading level of a paragraph style: `heading 2` is 2, an unnumbered
/// heading style is 1, `Title` is 1.
fn heading_level(style_name: &str) -> Option<u8> {
    let lower = style_name.to_lowercase();
    if lower == "title" {
        return Some(1);
    }
    if !lower.contains("heading") {
        return None;
    }
    let digits: String = lower
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    Some(digits.parse().unwrap_or(1))
}

/// Style id to display name from `styles.xml`.
fn style_names(xml: &str) -> Result<HashMap<String, String>> {
    let mut names = HashMap::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut current_id: Option<String> = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"style" => {
                current_id = attribute(&e, b"styleId");
            }
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"name" => {
                if let (Some(id), Some(name)) = (&current_id, attribute(&e, b"val")) {
                    names.insert(id.clone(), name);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"style" => current_id = None,
            Ok(Event::Eof) => break,
            Err(err) => return Err(xml_error(err)),
            _ => {}
        }
        buf.clear();
    }
    Ok(names)
}

#[derive(Debug, PartialEq)]
enum BodyItem {
    Paragraph { style: Option<String>, text: String },
    Table(Vec<Vec<String>>),
}

#[derive(Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

/// Walk `document.xml` into top-level paragraphs and tables. Nested tables
/// are flattened into the text of their enclosing cell.
fn read_body(xml: &str) -> Result<Vec<BodyItem>> {
    let mut items = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut table: Option<TableState> = None;
    let mut table_depth = 0usize;
    let mut paragraph: Option<(Option<String>, String)> = None;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        table = Some(TableState::default());
                    }
                }
                b"p" => paragraph = Some((None, String::new())),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"pStyle" => {
                    if let Some((style, _)) = paragraph.as_mut() {
                        *style = attribute(&e, b"val");
                    }
                }
                b"tab" => {
                    if let Some((_, text)) = paragraph.as_mut() {
                        text.push('\t');
                    }
                }
                b"br" | b"cr" => {
                    if let Some((_, text)) = paragraph.as_mut() {
                        text.push('\n');
                    }
                }
                b"p" => {
                    if table.is_none() {
                        items.push(BodyItem::Paragraph { style: None, text: String::new() });
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                if let Some((_, text)) = paragraph.as_mut() {
                    text.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some((style, text)) = paragraph.take() {
                        match table.as_mut() {
                            Some(state) => {
                                let text = text.trim();
                                if !text.is_empty() {
                                    if !state.cell.is_empty() {
                                        state.cell.push(' ');
                                    }
                                    state.cell.push_str(text);
                                }
                            }
                            None => items.push(BodyItem::Paragraph { style, text }),
                        }
                    }
                }
                b"tc" if table_depth == 1 => {
                    if let Some(state) = table.as_mut() {
                        let cell = std::mem::take(&mut state.cell);
                        state.row.push(cell);
                    }
                }
                b"tr" if table_depth == 1 => {
                    if let Some(state) = table.as_mut() {
                        let row = std::mem::take(&mut state.row);
                        state.rows.push(row);
                    }
                }
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0
                        && let Some(state) = table.take()
                    {
                        items.push(BodyItem::Table(state.rows));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(xml_error(err)),
            _ => {}
        }
        buf.clear();
    }
    Ok(items)
}


#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::fixtures::{build_docx, paragraph};
    use super::*;
    use textwerk_core::extraction::CellValue;

    fn extract_bytes(bytes: Vec<u8>) -> ExtractionResult {
        let mut package = OfficePackage::from_reader(Cursor::new(bytes)).unwrap();
        extract_package(&mut package).unwrap()
    }

    #[test]
    fn heading_levels() {
        assert_eq!(heading_level("heading 2"), Some(2));
        assert_eq!(heading_level("Heading"), Some(1));
        assert_eq!(heading_level("Title"), Some(1));
        assert_eq!(heading_level("Normal"), None);
    }

    #[test]
    fn headings_set_the_section_of_following_paragraphs() {
        let body = [
            paragraph(Some("Heading2"), "Contexte"),
            paragraph(Some("Heading2"), "Objectifs"),
            paragraph(Some("Heading2"), "Calendrier"),
            paragraph(None, "La livraison est prévue en mars."),
        ]
        .concat();
        let result = extract_bytes(build_docx(&body));

        assert_eq!(result.text_blocks.len(), 4);
        let heading = &result.text_blocks[2].metadata;
        assert_eq!(heading.section_level, Some(2));
        assert_eq!(heading.section_title.as_deref(), Some("Calendrier"));
        assert_eq!(heading.additional_metadata["style"], "heading 2");

        let body = &result.text_blocks[3].metadata;
        assert_eq!(body.section_level, None);
        assert_eq!(body.section_title.as_deref(), Some("Calendrier"));
        assert_eq!(body.order, 3);
        assert_eq!(body.extraction_method, Some(ExtractionMethod::Docx));
    }

    #[test]
    fn tables_keep_body_order_and_first_row_as_headers() {
        let table = r#"<w:tbl>
  <w:tr><w:tc><w:p><w:r><w:t>Nom</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Âge</w:t></w:r></w:p></w:tc></w:tr>
  <w:tr><w:tc><w:p><w:r><w:t>Ana</w:t></w:r></w:p></w:tc><w:tc><w:p/></w:tc></w:tr>
</w:tbl>"#;
        let body = [paragraph(None, "Avant"), table.to_owned(), paragraph(None, "Après")].concat();
        let result = extract_bytes(build_docx(&body));

        assert_eq!(result.tables.len(), 1);
        let table = &result.tables[0];
        assert_eq!(table.headers, vec!["Nom", "Âge"]);
        assert_eq!(table.rows, vec![vec![CellValue::from("Ana"), CellValue::from("")]]);
        assert_eq!(table.metadata.order, 1);
        assert_eq!(result.text_blocks[1].metadata.order, 2);
    }

    #[test]
    fn empty_paragraphs_are_skipped() {
        let body = ["<w:p/>".to_owned(), paragraph(None, "   "), paragraph(None, "Texte")].concat();
        let result = extract_bytes(build_docx(&body));
        assert_eq!(result.text_blocks.len(), 1);
        assert_eq!(result.text_blocks[0].metadata.order, 0);
    }
}
