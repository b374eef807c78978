//! Client-side table filtering for the inventory view.
//!
//! Filtering never touches the server: it only decides which already
//! loaded rows stay visible. Matching is case-insensitive substring
//! containment, either in one selected column or across all searchable
//! columns when no column is selected.

use serde::{Deserialize, Serialize};

/// Searchable inventory table columns.
///
/// The numeric value of each column is its cell index in a rendered
/// inventory row (cell 0 is the id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterColumn {
    /// The carton barcode.
    Barcode,
    /// The article number.
    Artikelnummer,
    /// The manufacturer.
    Hersteller,
    /// The color.
    Farbe,
    /// The quality grade.
    Qualitaet,
    /// The surface finish.
    Oberflaeche,
    /// The application area.
    Anwendung,
}

impl FilterColumn {
    /// All searchable columns, in table order.
    pub const ALL: [FilterColumn; 7] = [
        FilterColumn::Barcode,
        FilterColumn::Artikelnummer,
        FilterColumn::Hersteller,
        FilterColumn::Farbe,
        FilterColumn::Qualitaet,
        FilterColumn::Oberflaeche,
        FilterColumn::Anwendung,
    ];

    /// The cell index of this column in a rendered inventory row.
    pub fn cell_index(self) -> usize {
        match self {
            FilterColumn::Barcode => 1,
            FilterColumn::Artikelnummer => 2,
            FilterColumn::Hersteller => 3,
            FilterColumn::Farbe => 4,
            FilterColumn::Qualitaet => 5,
            FilterColumn::Oberflaeche => 6,
            FilterColumn::Anwendung => 7,
        }
    }

    /// Parses a column name as used in the filter dropdown.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "barcode" => Some(FilterColumn::Barcode),
            "artikelnummer" => Some(FilterColumn::Artikelnummer),
            "hersteller" => Some(FilterColumn::Hersteller),
            "farbe" => Some(FilterColumn::Farbe),
            "qualitaet" => Some(FilterColumn::Qualitaet),
            "oberflaeche" => Some(FilterColumn::Oberflaeche),
            "anwendung" => Some(FilterColumn::Anwendung),
            _ => None,
        }
    }

    /// The dropdown name of this column.
    pub fn name(self) -> &'static str {
        match self {
            FilterColumn::Barcode => "barcode",
            FilterColumn::Artikelnummer => "artikelnummer",
            FilterColumn::Hersteller => "hersteller",
            FilterColumn::Farbe => "farbe",
            FilterColumn::Qualitaet => "qualitaet",
            FilterColumn::Oberflaeche => "oberflaeche",
            FilterColumn::Anwendung => "anwendung",
        }
    }
}

/// An active table filter: optional column plus query text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableFilter {
    /// The selected column, or `None` to search every searchable column.
    pub column: Option<FilterColumn>,
    /// The query text; leading/trailing whitespace is ignored.
    pub query: String,
}

impl TableFilter {
    /// Creates a filter over one column.
    pub fn new(column: Option<FilterColumn>, query: impl Into<String>) -> Self {
        Self {
            column,
            query: query.into(),
        }
    }

    /// An empty filter that keeps every row visible.
    pub fn reset() -> Self {
        Self::default()
    }

    /// Returns whether the filter keeps a row with the given cells visible.
    pub fn matches(&self, cells: &[String]) -> bool {
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        let cell_contains = |index: usize| {
            cells
                .get(index)
                .is_some_and(|cell| cell.to_lowercase().contains(&query))
        };

        match self.column {
            Some(column) => cell_contains(column.cell_index()),
            None => FilterColumn::ALL
                .iter()
                .any(|column| cell_contains(column.cell_index())),
        }
    }
}
