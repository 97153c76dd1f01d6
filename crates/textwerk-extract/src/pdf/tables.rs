// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table detection from positioned text lines.
//
// A table is a run of consecutive lines that split into the same number of
// cells (at least two) whose left edges line up column by column.

use super::content::{TextLine, TextSpan};

/// Column starts closer than this merge into one column.
const MIN_COLUMN_GAP: f32 = 15.0;
/// Cells in the same column may drift this far horizontally.
const COLUMN_TOLERANCE: f32 = 5.0;
const MIN_ROWS: usize = 2;
const MIN_COLUMNS: usize = 2;

/// A detected grid of cells; the first row is the header row.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTable {
    pub rows: Vec<Vec<String>>,
    /// Baseline of the first row.
    pub top: f32,
}

#[derive(Debug, Clone)]
struct Cell {
    x: f32,
    text: String,
}

/// Split a line into cells at gaps of at least [`MIN_COLUMN_GAP`].
fn split_cells(line: &TextLine) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    let mut previous: Option<&TextSpan> = None;
    for span in &line.spans {
        let starts_cell = match previous {
            None => true,
            Some(prev) => span.x - prev.end_x() >= MIN_COLUMN_GAP,
        };
        if starts_cell {
            cells.push(Cell {
                x: span.x,
                text: span.text.trim().to_owned(),
            });
        } else if let Some(cell) = cells.last_mut() {
            if !cell.text.is_empty() {
                cell.text.push(' ');
            }
            cell.text.push_str(span.text.trim());
        }
        previous = Some(span);
    }
    cells
}

fn aligned(columns: &[f32], cells: &[Cell]) -> bool {
    columns.len() == cells.len()
        && columns
            .iter()
            .zip(cells)
            .all(|(x, cell)| (x - cell.x).abs() <= COLUMN_TOLERANCE)
}

/// Find every table among a page's lines (lines ordered top first).
pub fn detect_tables(lines: &[TextLine]) -> Vec<DetectedTable> {
    let mut tables = Vec::new();
    let mut run: Vec<Vec<Cell>> = Vec::new();
    let mut columns: Vec<f32> = Vec::new();
    let mut top = 0.0;

    let mut flush = |run: &mut Vec<Vec<Cell>>, top: f32| {
        if run.len() >= MIN_ROWS {
            tables.push(DetectedTable {
                rows: run
                    .drain(..)
                    .map(|row| row.into_iter().map(|cell| cell.text).collect())
                    .collect(),
                top,
            });
        }
        run.clear();
    };

    for line in lines {
        let cells = split_cells(line);
        if cells.len() < MIN_COLUMNS {
            flush(&mut run, top);
            columns.clear();
            continue;
        }
        if !run.is_empty() && aligned(&columns, &cells) {
            run.push(cells);
            continue;
        }
        flush(&mut run, top);
        columns = cells.iter().map(|cell| cell.x).collect();
        top = line.y;
        run.push(cells);
    }
    flush(&mut run, top);

    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::content::group_lines;

    fn span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan {
            text: text.into(),
            x,
            y,
            font_size: 10.0,
        }
    }

    #[test]
    fn aligned_rows_form_a_table() {
        let lines = group_lines(vec![
            span("Intro paragraph", 72.0, 760.0),
            span("Name", 72.0, 700.0),
            span("Age", 200.0, 700.0),
            span("Ana", 72.0, 685.0),
            span("30", 201.0, 685.0),
            span("Leo", 72.0, 670.0),
            span("41", 199.0, 670.0),
            span("Closing words", 72.0, 600.0),
        ]);
        let tables = detect_tables(&lines);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0], vec!["Name", "Age"]);
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(tables[0].top, 700.0);
    }

    #[test]
    fn a_single_multi_cell_row_is_not_a_table() {
        let lines = group_lines(vec![span("Left", 72.0, 700.0), span("Right", 300.0, 700.0)]);
        assert!(detect_tables(&lines).is_empty());
    }

    #[test]
    fn close_spans_stay_in_one_cell() {
        let lines = group_lines(vec![span("Total", 72.0, 700.0), span("due", 100.0, 700.0)]);
        let cells = split_cells(&lines[0]);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].text, "Total due");
    }
}
