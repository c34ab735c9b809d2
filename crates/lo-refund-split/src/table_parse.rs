use crate::model::Row;

pub(crate) fn split_line_into_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut whitespace_run = 0_usize;

    for ch in trimmed.chars() {
        if ch == '\t' {
            if !current.trim().is_empty() {
                cells.push(current.trim().to_string());
                current.clear();
            }
            whitespace_run = 0;
            continue;
        }

        if ch.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run >= 2 {
                if !current.trim().is_empty() {
                    cells.push(current.trim().to_string());
                    current.clear();
                }
                continue;
            }
            current.push(' ');
            continue;
        }

        whitespace_run = 0;
        current.push(ch);
    }

    if !current.trim().is_empty() {
        cells.push(current.trim().to_string());
    }

    cells
}

pub(crate) fn soft_split_line_into_cells(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Splits a text line into table cells, or `None` when the line reads as
/// prose or has fewer than `min_cols` cells.
///
/// Gap splitting is preferred. Single-space splitting is only trusted for
/// short lines or lines carrying digits, since those are usually data rows
/// whose column gaps collapsed during text extraction.
pub(crate) fn line_to_row(line: &str, min_cols: usize) -> Option<Row> {
    let mut cells = split_line_into_cells(line);
    if cells.len() < min_cols {
        let soft_cells = soft_split_line_into_cells(line);
        let has_numeric = soft_cells
            .iter()
            .any(|cell| cell.chars().any(|ch| ch.is_ascii_digit()));
        let looks_like_sentence = ['.', '!', '?']
            .iter()
            .any(|punctuation| line.trim_end().ends_with(*punctuation));
        if soft_cells.len() >= min_cols
            && !looks_like_sentence
            && (has_numeric || soft_cells.len() <= 6)
        {
            cells = soft_cells;
        }
    }

    if cells.len() < min_cols {
        return None;
    }

    Some(cells.into_iter().map(Some).collect())
}

#[cfg(test)]
mod tests {
    use super::{line_to_row, soft_split_line_into_cells, split_line_into_cells};

    #[test]
    fn splits_double_space_separated_cells() {
        let cells = split_line_into_cells("Acme Supply  016  10.00");
        assert_eq!(cells, vec!["Acme Supply", "016", "10.00"]);
    }

    #[test]
    fn splits_tab_separated_cells() {
        let cells = split_line_into_cells("Vendor\tLO\tAmount");
        assert_eq!(cells, vec!["Vendor", "LO", "Amount"]);
    }

    #[test]
    fn soft_splits_single_space_cells() {
        let cells = soft_split_line_into_cells("B 017 5.00");
        assert_eq!(cells, vec!["B", "017", "5.00"]);
    }

    #[test]
    fn line_to_row_wraps_cells_as_present() {
        let row = line_to_row("Vendor  LO  Amount", 2).expect("header line should split");
        assert_eq!(
            row,
            vec![
                Some("Vendor".to_string()),
                Some("LO".to_string()),
                Some("Amount".to_string()),
            ]
        );
    }

    #[test]
    fn line_to_row_rejects_sentences() {
        assert_eq!(line_to_row("Refunds are listed below.", 2), None);
        assert_eq!(line_to_row("Total", 2), None);
    }
}
