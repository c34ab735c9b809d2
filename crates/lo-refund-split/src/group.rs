use crate::model::{Cell, Groups, RawTable, cell_is_present};

/// Normalised identifier for a target-column cell, or `None` when the cell is
/// absent or not made purely of decimal digits.
///
/// Alphanumeric identifiers are rejected on purpose; stray numeric-looking
/// text elsewhere on the page is more common than non-numeric codes.
#[must_use]
pub fn clean_identifier(cell: &Cell) -> Option<String> {
    if !cell_is_present(cell) {
        return None;
    }

    let raw = cell.as_deref()?;
    let clean = raw.replace(['\r', '\n'], "").trim().to_string();
    if !clean.is_empty() && clean.chars().all(|ch| ch.is_ascii_digit()) {
        Some(clean)
    } else {
        None
    }
}

/// Groups every valid row after the header by its cleaned identifier.
#[must_use]
pub fn group_rows(table: &RawTable, header_row_index: usize, column_index: usize) -> Groups {
    let mut groups = Groups::default();

    for row in table.rows().iter().skip(header_row_index + 1) {
        if row.len() <= column_index {
            continue;
        }

        let Some(identifier) = clean_identifier(&row[column_index]) else {
            continue;
        };

        let mut admitted = row.clone();
        admitted[column_index] = Some(identifier.clone());
        groups.push_row(&identifier, admitted);
    }

    groups
}
