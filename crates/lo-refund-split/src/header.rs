use crate::model::{HeaderLocation, RawTable, Row};
use crate::options::LabelMatcher;

fn is_header_row(row: &Row, matcher: &LabelMatcher) -> bool {
    row.iter()
        .flatten()
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .any(|cell| matcher.matches(cell))
}

fn label_column(row: &Row, matcher: &LabelMatcher) -> Option<usize> {
    row.iter()
        .position(|cell| cell.as_deref().is_some_and(|value| matcher.matches(value)))
}

/// Finds the first row carrying the label and the first column holding it.
#[must_use]
pub fn locate_header(table: &RawTable, matcher: &LabelMatcher) -> Option<HeaderLocation> {
    let (row_index, row) = table
        .rows()
        .iter()
        .enumerate()
        .find(|(_, row)| is_header_row(row, matcher))?;

    let column_index = label_column(row, matcher)?;
    Some(HeaderLocation {
        row_index,
        column_index,
    })
}

#[cfg(test)]
mod tests {
    use super::locate_header;
    use crate::model::{HeaderLocation, RawTable};
    use crate::options::{LabelMatch, LabelMatcher};

    fn table(rows: &[&[Option<&str>]]) -> RawTable {
        RawTable::new(
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.map(str::to_string)).collect())
                .collect(),
        )
    }

    #[test]
    fn finds_header_below_preamble_rows() {
        let table = table(&[
            &[Some("Refund batch"), None],
            &[Some("Vendor"), Some(" LO "), Some("Amount")],
            &[Some("A"), Some("016"), Some("10.00")],
        ]);

        assert_eq!(
            locate_header(&table, &LabelMatcher::default()),
            Some(HeaderLocation {
                row_index: 1,
                column_index: 1,
            })
        );
    }

    #[test]
    fn first_matching_row_and_column_win() {
        let table = table(&[
            &[None, Some("LO"), Some("LO")],
            &[Some("LO"), Some("x"), Some("y")],
        ]);

        assert_eq!(
            locate_header(&table, &LabelMatcher::default()),
            Some(HeaderLocation {
                row_index: 0,
                column_index: 1,
            })
        );
    }

    #[test]
    fn reports_not_found_without_label() {
        let table = table(&[&[Some("Vendor"), Some("Loan"), Some("Amount")]]);
        assert_eq!(locate_header(&table, &LabelMatcher::default()), None);
        assert_eq!(locate_header(&RawTable::default(), &LabelMatcher::default()), None);
    }

    #[test]
    fn configurable_matcher_widens_the_search() {
        let table = table(&[&[Some("Vendor"), Some("LO Number"), Some("Amount")]]);
        assert_eq!(locate_header(&table, &LabelMatcher::default()), None);

        let matcher = LabelMatcher::new("LO", LabelMatch::Token);
        assert_eq!(
            locate_header(&table, &matcher).map(|location| location.column_index),
            Some(1)
        );
    }
}
