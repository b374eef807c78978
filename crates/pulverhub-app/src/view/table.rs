//! The list table model shared by all page modules.
//!
//! Each row carries its entity id (the data-attribute analogue) so
//! actions can look the record up later, plus a hidden flag driven by
//! the client-side filter. Rendering is left to the frontend.

use pulverhub_core::types::TableFilter;

/// One rendered table row.
#[derive(Debug, Clone)]
pub struct TableRow {
    /// The entity id behind this row.
    pub id: i64,
    /// Cell texts, in column order.
    pub cells: Vec<String>,
    /// Whether the active filter hides this row.
    pub hidden: bool,
    /// Whether the row shows a soft-deleted record.
    pub deleted: bool,
}

impl TableRow {
    /// Creates a visible row.
    pub fn new(id: i64, cells: Vec<String>) -> Self {
        Self {
            id,
            cells,
            hidden: false,
            deleted: false,
        }
    }

    /// Marks the row as showing a soft-deleted record.
    pub fn deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }
}

/// A filterable list table.
#[derive(Debug, Clone, Default)]
pub struct TableView {
    /// Column headers.
    pub columns: Vec<&'static str>,
    /// All loaded rows, including hidden ones.
    rows: Vec<TableRow>,
    /// The active filter.
    filter: TableFilter,
}

impl TableView {
    /// Creates an empty table with the given headers.
    pub fn new(columns: Vec<&'static str>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            filter: TableFilter::reset(),
        }
    }

    /// Replaces all rows (a full list reload) and re-applies the active
    /// filter.
    pub fn set_rows(&mut self, rows: Vec<TableRow>) {
        self.rows = rows;
        self.apply_current_filter();
    }

    /// Applies a new filter to the loaded rows.
    pub fn apply_filter(&mut self, filter: TableFilter) {
        self.filter = filter;
        self.apply_current_filter();
    }

    /// Clears the filter; every row becomes visible again.
    pub fn reset_filter(&mut self) {
        self.apply_filter(TableFilter::reset());
    }

    fn apply_current_filter(&mut self) {
        for row in &mut self.rows {
            row.hidden = !self.filter.matches(&row.cells);
        }
    }

    /// All rows, including hidden ones.
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// The rows the active filter keeps visible.
    pub fn visible_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter().filter(|row| !row.hidden)
    }

    /// Looks a row up by its entity id.
    pub fn row(&self, id: i64) -> Option<&TableRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// The active filter.
    pub fn filter(&self) -> &TableFilter {
        &self.filter
    }
}
