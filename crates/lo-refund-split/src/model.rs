use std::collections::HashMap;

/// A table cell as produced by extraction; `None` when the grid slot is empty.
pub type Cell = Option<String>;

pub type Row = Vec<Cell>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageText {
    pub page_number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    rows: Vec<Row>,
}

impl RawTable {
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn preview(&self, count: usize) -> Vec<Row> {
        self.rows.iter().take(count).cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLocation {
    pub row_index: usize,
    pub column_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub identifier: String,
    pub rows: Vec<Row>,
}

/// Identifier-keyed row groups in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Groups {
    groups: Vec<Group>,
    index: HashMap<String, usize>,
}

impl Groups {
    pub(crate) fn push_row(&mut self, identifier: &str, row: Row) {
        if let Some(&position) = self.index.get(identifier) {
            self.groups[position].rows.push(row);
            return;
        }

        self.index.insert(identifier.to_string(), self.groups.len());
        self.groups.push(Group {
            identifier: identifier.to_string(),
            rows: vec![row],
        });
    }

    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&Group> {
        self.index
            .get(identifier)
            .map(|&position| &self.groups[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    #[must_use]
    pub fn identifiers(&self) -> Vec<&str> {
        self.groups
            .iter()
            .map(|group| group.identifier.as_str())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|group| group.rows.len()).sum()
    }
}

impl<'a> IntoIterator for &'a Groups {
    type Item = &'a Group;
    type IntoIter = std::slice::Iter<'a, Group>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Result of building one identifier's output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    Built {
        identifier: String,
        file_name: String,
        row_count: usize,
        pdf: Vec<u8>,
    },
    Failed {
        identifier: String,
        reason: String,
    },
}

impl GroupOutcome {
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Built { identifier, .. } | Self::Failed { identifier, .. } => identifier,
        }
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        matches!(self, Self::Built { .. })
    }
}

#[must_use]
pub fn cell_text(cell: &Cell) -> &str {
    cell.as_deref().unwrap_or_default()
}

#[must_use]
pub fn cell_is_present(cell: &Cell) -> bool {
    cell.as_deref().is_some_and(|value| !value.is_empty())
}
