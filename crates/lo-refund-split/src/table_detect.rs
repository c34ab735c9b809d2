use lopdf::Document;
use tracing::debug;

use crate::model::{RawTable, Row};
use crate::options::ExtractionStrategy;
use crate::pdf_reader::read_first_page_text;
use crate::table_parse::line_to_row;
use crate::text_runs::{TextRun, read_text_runs};

const MIN_TABLE_ROWS: usize = 2;
const MIN_TABLE_COLS: usize = 2;
const ROW_TOLERANCE_FACTOR: f32 = 0.4;
const MIN_ROW_TOLERANCE: f32 = 2.0;
const COLUMN_TOLERANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ColumnSpan {
    start: f32,
    end: f32,
}

fn cluster_rows(mut runs: Vec<TextRun>) -> Vec<Vec<TextRun>> {
    runs.sort_by(|left, right| {
        right
            .y
            .total_cmp(&left.y)
            .then_with(|| left.x.total_cmp(&right.x))
    });

    let mut rows: Vec<Vec<TextRun>> = Vec::new();
    for run in runs {
        let tolerance = (run.font_size * ROW_TOLERANCE_FACTOR).max(MIN_ROW_TOLERANCE);
        match rows.last_mut() {
            Some(row) if (row[0].y - run.y).abs() <= tolerance => row.push(run),
            _ => rows.push(vec![run]),
        }
    }

    for row in &mut rows {
        row.sort_by(|left, right| left.x.total_cmp(&right.x));
    }
    rows
}

/// Column intervals from merging the horizontal extents of runs in rows that
/// have at least two runs. Single-run rows (titles, footers) would otherwise
/// bridge unrelated columns.
fn column_spans(rows: &[Vec<TextRun>]) -> Vec<ColumnSpan> {
    let mut spans = rows
        .iter()
        .filter(|row| row.len() >= MIN_TABLE_COLS)
        .flatten()
        .map(|run| ColumnSpan {
            start: run.x,
            end: run.end(),
        })
        .collect::<Vec<_>>();
    spans.sort_by(|left, right| left.start.total_cmp(&right.start));

    let mut merged: Vec<ColumnSpan> = Vec::new();
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end + COLUMN_TOLERANCE => {
                last.end = last.end.max(span.end);
            }
            _ => merged.push(span),
        }
    }
    merged
}

fn column_for(x: f32, columns: &[ColumnSpan]) -> usize {
    columns
        .iter()
        .rposition(|column| column.start <= x + COLUMN_TOLERANCE)
        .unwrap_or(0)
}

pub(crate) fn grid_from_runs(runs: Vec<TextRun>) -> Option<RawTable> {
    let rows = cluster_rows(runs);
    let columns = column_spans(&rows);
    if rows.len() < MIN_TABLE_ROWS || columns.len() < MIN_TABLE_COLS {
        return None;
    }

    let grid = rows
        .into_iter()
        .map(|runs| {
            let mut cells: Row = vec![None; columns.len()];
            for run in runs {
                let text = run.text.trim();
                let cell = &mut cells[column_for(run.x, &columns)];
                match cell {
                    Some(existing) => {
                        existing.push(' ');
                        existing.push_str(text);
                    }
                    None => *cell = Some(text.to_string()),
                }
            }
            cells
        })
        .collect::<Vec<_>>();

    Some(RawTable::new(grid))
}

fn positioned_table(document: &Document) -> Option<RawTable> {
    let (_, &page_id) = document.get_pages().iter().next()?;
    let runs = read_text_runs(document, page_id);
    debug!(runs = runs.len(), "read positioned text runs from page 1");
    grid_from_runs(runs)
}

/// Contiguous multi-cell lines form candidate tables; the one with the most
/// rows wins, earliest on ties.
pub(crate) fn table_from_text(text: &str) -> Option<RawTable> {
    let mut best: Vec<Row> = Vec::new();
    let mut current: Vec<Row> = Vec::new();

    for line in text.lines() {
        if let Some(row) = line_to_row(line, MIN_TABLE_COLS) {
            current.push(row);
            continue;
        }
        if current.len() > best.len() {
            best = std::mem::take(&mut current);
        } else {
            current.clear();
        }
    }
    if current.len() > best.len() {
        best = current;
    }

    (best.len() >= MIN_TABLE_ROWS).then(|| RawTable::new(best))
}

fn text_gap_table(document: &Document, input_pdf: &[u8]) -> Option<RawTable> {
    let page = read_first_page_text(document, input_pdf)?;
    debug!(
        page = page.page_number,
        chars = page.text.len(),
        "read page text for gap splitting"
    );
    table_from_text(&page.text)
}

/// Reads a grid of cells from the first page using one strategy.
pub fn extract_first_page_table(
    document: &Document,
    input_pdf: &[u8],
    strategy: ExtractionStrategy,
) -> Option<RawTable> {
    match strategy {
        ExtractionStrategy::Positioned => positioned_table(document),
        ExtractionStrategy::TextGaps => text_gap_table(document, input_pdf),
    }
}

#[cfg(test)]
mod tests {
    use super::{grid_from_runs, table_from_text};
    use crate::text_runs::{TextRun, estimate_text_width};

    fn run(x: f32, y: f32, text: &str) -> TextRun {
        TextRun {
            x,
            y,
            width: estimate_text_width(text, 10.0),
            font_size: 10.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn builds_grid_with_absent_cells() {
        let runs = vec![
            run(50.0, 700.0, "Vendor"),
            run(170.0, 700.0, "LO"),
            run(290.0, 700.0, "Amount"),
            run(50.0, 680.0, "A"),
            run(170.0, 680.0, "016"),
            run(290.0, 680.0, "10.00"),
            run(50.0, 660.0, "D"),
            run(290.0, 660.5, "1.00"),
        ];

        let table = grid_from_runs(runs).expect("grid should be detected");
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.rows()[2],
            vec![Some("D".to_string()), None, Some("1.00".to_string())]
        );
    }

    #[test]
    fn title_row_does_not_merge_columns() {
        let runs = vec![
            run(50.0, 740.0, "LO REFUND DETAIL: 016 AND MORE TEXT"),
            run(50.0, 700.0, "Vendor"),
            run(170.0, 700.0, "LO"),
            run(50.0, 680.0, "A"),
            run(170.0, 680.0, "016"),
        ];

        let table = grid_from_runs(runs).expect("grid should be detected");
        assert_eq!(table.rows()[0][1], None);
        assert_eq!(table.rows()[1][1].as_deref(), Some("LO"));
    }

    #[test]
    fn single_column_text_is_not_a_table() {
        let runs = vec![run(50.0, 700.0, "one"), run(50.0, 680.0, "two")];
        assert_eq!(grid_from_runs(runs), None);
    }

    #[test]
    fn picks_largest_text_block() {
        let text = "Refund report.\nA  B\nC  D\nPrepared by staff.\nVendor  LO  Amount\nA  016  10.00\nB  017  5.00";
        let table = table_from_text(text).expect("table should be detected");
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0][1].as_deref(), Some("LO"));
    }
}
