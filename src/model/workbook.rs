//! Workbook and sheet structures.

use super::{Cell, SheetMetadata};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A decoded worksheet (or chartsheet).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    /// Sheet name as declared in the workbook
    pub name: String,

    /// Cells keyed by coordinate ("A1"), in document order
    #[serde(default)]
    pub cells: IndexMap<String, Cell>,

    #[serde(default)]
    pub metadata: SheetMetadata,

    /// Set when the sheet part was missing or stopped parsing part-way;
    /// whatever was decoded before the failure is still present
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl Sheet {
    /// Create an empty sheet with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get a cell by coordinate.
    pub fn cell(&self, coordinate: &str) -> Option<&Cell> {
        self.cells.get(coordinate)
    }

    /// Whether the sheet is worth keeping after pruning.
    pub fn is_retained(&self) -> bool {
        !self.cells.is_empty() || !self.metadata.is_empty() || self.error.is_some()
    }
}

/// A decoded workbook: the final, self-contained snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    /// Sheets keyed by name, in the workbook's declared order
    #[serde(default)]
    pub sheets: IndexMap<String, Sheet>,

    /// Defined names mapped to their formula text
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub defined_names: IndexMap<String, String>,
}

impl Workbook {
    /// Create an empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet, keyed by its name.
    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.insert(sheet.name.clone(), sheet);
    }

    /// Get a sheet by name.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    /// Sheet names in declared order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(String::as_str).collect()
    }

    /// Total number of retained cells across all sheets.
    pub fn cell_count(&self) -> usize {
        self.sheets.values().map(|s| s.cells.len()).sum()
    }
}
