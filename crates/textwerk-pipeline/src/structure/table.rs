// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table structurer: column schema, row records, and CSV rendering.

use serde::Serialize;
use serde_json::{Map, Value};
use textwerk_core::extraction::{CellValue, TableBlock};
use textwerk_core::types::ColumnType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredTable {
    pub schema: Vec<ColumnSchema>,
    /// One map per row, keyed by column name.
    pub rows: Vec<Map<String, Value>>,
}

/// Column types default to text when the table was never normalized.
pub fn structure_table(table: &TableBlock) -> StructuredTable {
    let schema: Vec<ColumnSchema> = table
        .headers
        .iter()
        .enumerate()
        .map(|(index, name)| ColumnSchema {
            name: name.clone(),
            column_type: table.column_types.get(index).copied().unwrap_or(ColumnType::Text),
            index,
        })
        .collect();

    let rows = table
        .rows
        .iter()
        .map(|row| {
            schema
                .iter()
                .map(|column| {
                    let value = row
                        .get(column.index)
                        .map(cell_value)
                        .unwrap_or(Value::Null);
                    (column.name.clone(), value)
                })
                .collect()
        })
        .collect();

    StructuredTable { schema, rows }
}

fn cell_value(cell: &CellValue) -> Value {
    serde_json::to_value(cell).unwrap_or(Value::Null)
}

/// Render headers and rows as RFC 4180 CSV. Empty cells are empty fields.
pub fn to_csv(table: &TableBlock) -> String {
    let mut out = String::new();
    push_record(&mut out, table.headers.iter().map(String::as_str));
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(CellValue::as_text).collect();
        push_record(&mut out, cells.iter().map(String::as_str));
    }
    out
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let fields: Vec<String> = fields.map(escape_field).collect();
    out.push_str(&fields.join(","));
    out.push_str("\r\n");
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::table_normalizer::normalize;
    use textwerk_core::extraction::ContentMetadata;

    fn sample() -> TableBlock {
        normalize(TableBlock::from_raw(
            vec![Some("Nom".into()), Some("Montant".into())],
            vec![
                vec![Some("Dupont, Jean".into()), Some("12,5".into())],
                vec![Some("Leo \"le grand\"".into()), None],
            ],
            ContentMetadata::new(0),
        ))
    }

    #[test]
    fn schema_and_rows() {
        let structured = structure_table(&sample());
        assert_eq!(structured.schema[1].column_type, ColumnType::Number);
        assert_eq!(structured.schema[1].index, 1);
        assert_eq!(structured.rows[0]["Montant"], 12.5);
        assert_eq!(structured.rows[1]["Montant"], Value::Null);
        let json = serde_json::to_value(&structured.schema[0]).unwrap();
        assert_eq!(json["type"], "text");
    }

    #[test]
    fn csv_quotes_when_needed() {
        let csv = to_csv(&sample());
        assert_eq!(
            csv,
            "Nom,Montant\r\n\"Dupont, Jean\",12.5\r\n\"Leo \"\"le grand\"\"\",\r\n"
        );
    }
}
