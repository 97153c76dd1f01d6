// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table normalization: header detection, cell cleaning, column type
// inference, and cell coercion.

use chrono::NaiveDate;
use serde_json::Value;
use textwerk_core::extraction::{CellValue, TableBlock};
use textwerk_core::types::ColumnType;
use tracing::debug;

/// Share of non-empty values a type must strictly exceed to win a column.
pub const TYPE_THRESHOLD: f64 = 0.7;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

const TRUE_TOKENS: &[&str] = &["true", "oui", "yes", "vrai", "1"];
const FALSE_TOKENS: &[&str] = &["false", "non", "no", "faux", "0"];

/// Normalize one table. Never fails; cells that do not coerce keep their text.
pub fn normalize(table: TableBlock) -> TableBlock {
    let TableBlock {
        headers,
        rows,
        metadata,
        ..
    } = table;

    let mut rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.as_text().trim().to_owned()).collect())
        .filter(|row: &Vec<String>| row.iter().any(|cell| !cell.is_empty()))
        .collect();

    let headers = detect_headers(headers, &mut rows);
    let column_count = headers.len();

    let column_types: Vec<ColumnType> = (0..column_count)
        .map(|index| {
            infer_column_type(
                rows.iter()
                    .filter_map(|row| row.get(index))
                    .map(String::as_str),
            )
        })
        .collect();

    let rows: Vec<Vec<CellValue>> = rows
        .into_iter()
        .map(|row| {
            (0..column_count)
                .map(|index| {
                    let raw = row.get(index).map(String::as_str).unwrap_or_default();
                    coerce(raw, column_types[index])
                })
                .collect()
        })
        .collect();

    debug!(
        rows = rows.len(),
        columns = column_count,
        "table normalized"
    );

    let metadata = metadata
        .with_extra(
            "column_types",
            Value::Array(
                column_types
                    .iter()
                    .map(|t| Value::String(t.as_str().to_owned()))
                    .collect(),
            ),
        )
        .with_extra("row_count", rows.len())
        .with_extra("column_count", column_count)
        .with_extra("normalized", true);

    TableBlock {
        headers,
        rows,
        column_types,
        metadata,
    }
}

/// Reuse existing headers, promote a text-like first row, or synthesize
/// positional names. The column count is the widest of headers and rows.
fn detect_headers(headers: Vec<String>, rows: &mut Vec<Vec<String>>) -> Vec<String> {
    let mut headers: Vec<String> = headers.iter().map(|h| h.trim().to_owned()).collect();
    if headers.iter().all(String::is_empty) {
        headers.clear();
        if let Some(first) = rows.first() {
            let text_like = first
                .iter()
                .filter(|cell| !cell.is_empty() && parse_number(cell).is_none())
                .count();
            if !first.is_empty() && text_like * 2 > first.len() {
                headers = rows.remove(0);
            }
        }
    }

    let width = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);
    for (index, header) in headers.iter_mut().enumerate() {
        if header.is_empty() {
            *header = synthesized_name(index);
        }
    }
    for index in headers.len()..width {
        headers.push(synthesized_name(index));
    }
    headers
}

fn synthesized_name(index: usize) -> String {
    format!("column_{}", index + 1)
}

/// Date, then number, then boolean; text when none clears the threshold.
pub fn infer_column_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let values: Vec<&str> = values.filter(|v| !v.is_empty()).collect();
    if values.is_empty() {
        return ColumnType::Text;
    }
    let clears = |matches: fn(&str) -> bool| {
        let hits = values.iter().filter(|v| matches(v)).count();
        hits as f64 / values.len() as f64 > TYPE_THRESHOLD
    };
    if clears(|v| parse_date(v).is_some()) {
        ColumnType::Date
    } else if clears(|v| parse_number(v).is_some()) {
        ColumnType::Number
    } else if clears(|v| parse_bool(v).is_some()) {
        ColumnType::Boolean
    } else {
        ColumnType::Text
    }
}

/// Convert a cleaned cell to its column type.
pub fn coerce(raw: &str, column_type: ColumnType) -> CellValue {
    if raw.is_empty() {
        return CellValue::Empty;
    }
    let coerced = match column_type {
        ColumnType::Number => parse_number(raw).map(CellValue::Number),
        ColumnType::Boolean => parse_bool(raw).map(CellValue::Boolean),
        ColumnType::Date => parse_date(raw).map(|d| CellValue::Text(d.format("%Y-%m-%d").to_string())),
        ColumnType::Text => None,
    };
    coerced.unwrap_or_else(|| CellValue::Text(raw.to_owned()))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw.trim(), format).ok())
}

/// Accepts `1 234,5` style numbers as well as plain ones.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    let token = raw.trim().to_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}
