// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spreadsheet (.xlsx) extraction: one table per non-empty sheet.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::Value;
use textwerk_core::error::Result;
use textwerk_core::extraction::{ContentMetadata, ExtractionResult, TableBlock};
use textwerk_core::types::ExtractionMethod;
use tracing::{debug, instrument, warn};

use super::package::{OfficePackage, attribute, xml_error};

#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetExtractor;

impl SpreadsheetExtractor {
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn extract(&self, path: &Path) -> Result<ExtractionResult> {
        let mut package = OfficePackage::open(path)?;
        extract_package(&mut package)
    }
}

/// A sheet as listed in the workbook, with its resolved part name.
#[derive(Debug, Clone, PartialEq)]
struct SheetRef {
    name: String,
    part: String,
}

pub(crate) fn extract_package<R: Read + Seek>(
    package: &mut OfficePackage<R>,
) -> Result<ExtractionResult> {
    let shared = match package.read_optional_part("xl/sharedStrings.xml")? {
        Some(xml) => shared_strings(&xml)?,
        None => Vec::new(),
    };
    let relationships = match package.read_optional_part("xl/_rels/workbook.xml.rels")? {
        Some(xml) => workbook_relationships(&xml)?,
        None => HashMap::new(),
    };
    let sheets = sheet_refs(&package.read_part("xl/workbook.xml")?, &relationships)?;

    let mut result = ExtractionResult::default();
    let mut sheet_names = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        sheet_names.push(Value::from(sheet.name.as_str()));
        let Some(xml) = package.read_optional_part(&sheet.part)? else {
            warn!(sheet = %sheet.name, part = %sheet.part, "sheet part missing");
            continue;
        };
        let mut rows = sheet_rows(&xml, &shared)?;
        rows.retain(|row| row.iter().any(|cell| cell.as_deref().is_some_and(|c| !c.trim().is_empty())));
        if rows.is_empty() {
            debug!(sheet = %sheet.name, "empty sheet skipped");
            continue;
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, None);
        }
        let mut rows = rows.into_iter();
        let headers = rows
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|cell| cell.map(|c| c.trim().to_owned()))
            .collect();
        let metadata = ContentMetadata::new(result.tables.len() as u32)
            .with_method(ExtractionMethod::Xlsx)
            .with_extra("sheet_name", sheet.name.as_str());
        result.tables.push(TableBlock::from_raw(
            headers,
            rows.map(|row| row.into_iter().map(|cell| cell.map(|c| c.trim().to_owned())).collect())
                .collect(),
            metadata,
        ));
    }

    result.raw_metadata = package.core_properties()?;
    result
        .raw_metadata
        .insert("sheet_count".into(), Value::from(sheet_names.len()));
    result
        .raw_metadata
        .insert("sheet_names".into(), Value::Array(sheet_names));

    debug!(tables = result.tables.len(), "spreadsheet extraction done");
    Ok(result)
}

/// The shared string table; rich-text runs are concatenated, phonetic
/// hints are ignored.
fn shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::Text(t)) if in_text && !in_phonetic => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(xml_error(err)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Relationship id to target part, from the workbook's rels part.
fn workbook_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut targets = HashMap::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id"), attribute(&e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(xml_error(err)),
            _ => {}
        }
        buf.clear();
    }
    Ok(targets)
}

fn sheet_refs(workbook_xml: &str, relationships: &HashMap<String, String>) -> Result<Vec<SheetRef>> {
    let mut sheets = Vec::new();
    let mut reader = Reader::from_str(workbook_xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let index = sheets.len() + 1;
                let name = attribute(&e, b"name").unwrap_or_else(|| format!("Sheet{index}"));
                let part = attribute(&e, b"id")
                    .and_then(|rid| relationships.get(&rid))
                    .map(|target| match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_owned(),
                        None => format!("xl/{target}"),
                    })
                    .unwrap_or_else(|| format!("xl/worksheets/sheet{index}.xml"));
                sheets.push(SheetRef { name, part });
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(xml_error(err)),
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

/// Zero-based column index of a cell reference such as `AB12`.
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let number = letters
        .iter()
        .fold(0usize, |acc, &b| acc * 26 + usize::from(b - b'A' + 1));
    Some(number - 1)
}

#[derive(Default)]
struct CellState {
    column: Option<usize>,
    kind: Option<String>,
    value: String,
}

/// Cell values of every row as strings, positioned by column; gaps are `None`.
fn sheet_rows(xml: &str, shared: &[String]) -> Result<Vec<Vec<Option<String>>>> {
    let mut rows = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut row: Option<Vec<Option<String>>> = None;
    let mut cell: Option<CellState> = None;
    let mut capture = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => row = Some(Vec::new()),
                b"c" => {
                    cell = Some(CellState {
                        column: attribute(&e, b"r").as_deref().and_then(column_index),
                        kind: attribute(&e, b"t"),
                        value: String::new(),
                    });
                }
                b"v" | b"t" => capture = cell.is_some(),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    if let Some(row) = row.as_mut() {
                        let column = attribute(&e, b"r")
                            .as_deref()
                            .and_then(column_index)
                            .unwrap_or(row.len());
                        place(row, column, None);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) if capture => {
                if let Some(state) = cell.as_mut() {
                    state.value.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    if let (Some(state), Some(row)) = (cell.take(), row.as_mut()) {
                        let column = state.column.unwrap_or(row.len());
                        place(row, column, cell_text(state, shared));
                    }
                }
                b"row" => rows.extend(row.take()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(xml_error(err)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

fn place(row: &mut Vec<Option<String>>, column: usize, value: Option<String>) {
    if row.len() <= column {
        row.resize(column + 1, None);
    }
    if value.is_some() {
        row[column] = value;
    }
}

fn cell_text(state: CellState, shared: &[String]) -> Option<String> {
    match state.kind.as_deref() {
        Some("s") => state
            .value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared.get(i).cloned()),
        Some("b") => Some(if state.value.trim() == "1" { "true" } else { "false" }.to_owned()),
        _ if state.value.is_empty() => None,
        _ => Some(state.value),
    }
}


#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::fixtures::build_xlsx;
    use super::*;
    use crate::office::package::fixtures::build_package;
    use textwerk_core::extraction::CellValue;

    fn extract_bytes(bytes: Vec<u8>) -> ExtractionResult {
        let mut package = OfficePackage::from_reader(Cursor::new(bytes)).unwrap();
        extract_package(&mut package).unwrap()
    }

    #[test]
    fn column_references() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("Z9"), Some(25));
        assert_eq!(column_index("AB12"), Some(27));
        assert_eq!(column_index("12"), None);
    }

    #[test]
    fn first_row_becomes_headers_and_gaps_become_empty() {
        let bytes = build_xlsx("Staff", &[&["Name", "Age"], &["Ana", "30"], &["Leo", ""]]);
        let result = extract_bytes(bytes);

        assert_eq!(result.tables.len(), 1);
        let table = &result.tables[0];
        assert_eq!(table.headers, vec!["Name", "Age"]);
        assert_eq!(
            table.rows,
            vec![
                vec![CellValue::from("Ana"), CellValue::from("30")],
                vec![CellValue::from("Leo"), CellValue::from("")],
            ]
        );
        assert_eq!(table.metadata.additional_metadata["sheet_name"], "Staff");
        assert_eq!(table.metadata.extraction_method, Some(ExtractionMethod::Xlsx));
        assert_eq!(result.raw_metadata["sheet_count"], 1);
    }

    #[test]
    fn empty_rows_are_dropped() {
        let bytes = build_xlsx("S", &[&["a", "b"], &["", ""], &["c", "d"]]);
        let table = &extract_bytes(bytes).tables[0];
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn shared_and_typed_cells() {
        let shared = r#"<sst><si><t>Ville</t></si><si><r><t>Pa</t></r><r><t>ris</t></r><rPh><t>x</t></rPh></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="b"><v>1</v></c></row>
<row r="2"><c r="A2" t="s"><v>1</v></c><c r="C2"><v>2.5</v></c></row>
</sheetData></worksheet>"#;
        let workbook = r#"<workbook><sheets><sheet name="Villes" sheetId="1"/></sheets></workbook>"#;
        let bytes = build_package(&[
            ("xl/workbook.xml", workbook),
            ("xl/sharedStrings.xml", shared),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        let table = &extract_bytes(bytes).tables[0];
        assert_eq!(table.headers, vec!["Ville", "", "true"]);
        assert_eq!(
            table.rows[0],
            vec![CellValue::from("Paris"), CellValue::from(""), CellValue::from("2.5")]
        );
    }
}
