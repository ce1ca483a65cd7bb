//! Cell and compact style structures.

use serde::{Deserialize, Serialize};

/// Value substituted when a string pool reference cannot be resolved.
pub const STRING_LOOKUP_ERROR: &str = "ERROR_STRING_LOOKUP";

/// Fill facet of a compact style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillStyle {
    /// Pattern type (e.g., "solid", "gray125")
    pub pattern: String,

    /// Foreground color: ARGB hex, `theme:N` or `indexed:N`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<String>,
}

/// Border facet of a compact style. Only declared sides are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderStyle {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub left: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub right: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub top: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bottom: Option<String>,
}

impl BorderStyle {
    /// True when no side is declared.
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.top.is_none() && self.bottom.is_none()
    }
}

/// Font facet of a compact style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontStyle {
    #[serde(skip_serializing_if = "is_false", default)]
    pub bold: bool,

    #[serde(skip_serializing_if = "is_false", default)]
    pub italic: bool,

    /// Font family name
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// The facets of a cell format that differ from the document default.
///
/// A style with every facet absent is never attached to a cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactStyle {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fill: Option<FillStyle>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub border: Option<BorderStyle>,

    /// Resolved number format code
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub num_fmt: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub font: Option<FontStyle>,
}

impl CompactStyle {
    /// True when every facet is at its default.
    pub fn is_empty(&self) -> bool {
        self.fill.is_none() && self.border.is_none() && self.num_fmt.is_none() && self.font.is_none()
    }
}

/// A decoded worksheet cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Display value; string pool references are already resolved
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub value: String,

    /// Formula text without the leading `=`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub formula: Option<String>,

    /// Formula kind (`array`, `shared`, `dataTable`)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub formula_type: Option<String>,

    /// Range covered by an array or shared formula
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub formula_ref: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub style: Option<CompactStyle>,
}

impl Cell {
    /// Create a cell holding only a value.
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    /// Whether the cell carries a value, a formula or a non-default style.
    pub fn has_content(&self) -> bool {
        !self.value.is_empty()
            || self.formula.is_some()
            || self.style.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// Convert a 1-based column number into letters (1 -> "A", 28 -> "AB").
pub fn column_letters(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Split a coordinate like "AB12" into its 1-based (column, row).
pub fn parse_coordinate(coordinate: &str) -> Option<(u32, u32)> {
    let coordinate = coordinate.trim().trim_start_matches('$');
    let split = coordinate.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, digits) = coordinate.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut column: u32 = 0;
    for b in letters.bytes() {
        column = column
            .checked_mul(26)?
            .checked_add((b.to_ascii_uppercase() - b'A' + 1) as u32)?;
    }
    let row = digits.trim_start_matches('$').parse().ok()?;
    Some((column, row))
}
