//! Output formatting utilities for MCP tools.
//!
//! Query and view results are rendered as markdown tables, the format the
//! tools hand back to the assistant.

use crate::models::Cell;
use unicode_width::UnicodeWidthStr;

/// Cells longer than this many characters are truncated.
pub const MAX_CELL_CHARS: usize = 200;

const TRUNCATED_CHARS: usize = MAX_CELL_CHARS - 3;
const MIN_COLUMN_WIDTH: usize = 3;

/// Render one cell: `NULL` for absent values, pipes escaped, long values
/// cut to 197 characters plus `...`.
pub fn format_cell(value: Option<&str>) -> String {
    let Some(value) = value else {
        return "NULL".to_string();
    };
    let escaped = value.replace('|', "\\|");
    if escaped.chars().count() > MAX_CELL_CHARS {
        let mut truncated: String = escaped.chars().take(TRUNCATED_CHARS).collect();
        truncated.push_str("...");
        truncated
    } else {
        escaped
    }
}

/// Render rows as an aligned markdown table.
///
/// Missing trailing cells in a short row render as `NULL`.
pub fn format_as_markdown(columns: &[String], rows: &[Vec<Cell>]) -> String {
    if columns.is_empty() {
        return String::new();
    }

    let header: Vec<String> = columns.iter().map(|c| c.replace('|', "\\|")).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            (0..columns.len())
                .map(|i| format_cell(row.get(i).and_then(|cell| cell.as_deref())))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = header
        .iter()
        .map(|h| h.width().max(MIN_COLUMN_WIDTH))
        .collect();
    for row in &body {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let mut output = String::new();
    push_row(&mut output, &header, &widths);
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut output, &separator, &widths);
    for row in &body {
        push_row(&mut output, row, &widths);
    }
    output
}

fn push_row(output: &mut String, cells: &[String], widths: &[usize]) {
    output.push('|');
    for (cell, width) in cells.iter().zip(widths) {
        // Pad by display width; `{:<w$}` counts chars, not columns.
        let padding = width.saturating_sub(cell.width());
        output.push(' ');
        output.push_str(cell);
        output.push_str(&" ".repeat(padding));
        output.push_str(" |");
    }
    output.push('\n');
}
