//! Sheet-level metadata: validations, conditional formats, merges,
//! sparklines, drawing objects and view settings.

use super::{ChartDetails, Decoded, PivotDetails};
use serde::{Deserialize, Serialize};

/// A data validation rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    /// Validation type (e.g., "list", "whole", "decimal")
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub validation_type: Option<String>,

    /// Target range (space-separated sqref)
    #[serde(default)]
    pub range: String,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub formula1: String,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub formula2: String,
}

/// A conditional formatting rule, flattened with its target range.
///
/// `priority` is passed through exactly as stored; ties and duplicates are
/// left for consumers to interpret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalFormat {
    #[serde(default)]
    pub range: String,

    /// Rule type (e.g., "cellIs", "expression", "colorScale")
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub rule_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub priority: Option<String>,

    /// Differential format index
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dxf_id: Option<String>,

    /// First formula of the rule
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub formula: String,
}

/// A merged cell region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRange {
    pub range: String,
}

/// A single sparkline inside a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sparkline {
    /// Source data reference (e.g., "Sheet1!B2:F2")
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data_range: Option<String>,

    /// Cell hosting the sparkline
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
}

/// A group of sparklines sharing one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparklineGroup {
    /// "line", "column" or "stacked"
    #[serde(rename = "type")]
    pub sparkline_type: String,

    #[serde(default)]
    pub sparklines: Vec<Sparkline>,
}

/// An object placed on a sheet through a drawing or a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DrawingObject {
    /// A shape (text box, rectangle, ...)
    Shape { name: String },
    /// A connector line or arrow
    Connector { name: String },
    /// An embedded chart
    Chart {
        relationship_id: String,
        details: Decoded<ChartDetails>,
    },
    /// A pivot table attached to the sheet
    PivotTable {
        relationship_id: String,
        details: Decoded<PivotDetails>,
    },
    /// A drawing reference that could not be expanded
    DrawingRef {
        relationship_id: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error: Option<String>,
    },
    /// A legacy (VML) drawing reference, kept as-is
    LegacyDrawingRef { relationship_id: String },
}

/// Settings from the first sheet view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSettings {
    /// Whether this sheet is the selected tab
    pub active_tab: bool,
    pub show_gridlines: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub zoom: Option<String>,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            active_tab: false,
            show_gridlines: true,
            zoom: None,
        }
    }
}

/// Structural metadata of one sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetMetadata {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub validations: Vec<Validation>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub conditional_formats: Vec<ConditionalFormat>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub merge_cells: Vec<MergeRange>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sparkline_groups: Vec<SparklineGroup>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub drawings: Vec<DrawingObject>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub view_settings: Option<ViewSettings>,
}

impl SheetMetadata {
    /// True when no list carries an entry. View settings alone do not count.
    pub fn is_empty(&self) -> bool {
        self.validations.is_empty()
            && self.conditional_formats.is_empty()
            && self.merge_cells.is_empty()
            && self.sparkline_groups.is_empty()
            && self.drawings.is_empty()
    }

    /// Charts among the drawing objects.
    pub fn charts(&self) -> impl Iterator<Item = &Decoded<ChartDetails>> {
        self.drawings.iter().filter_map(|d| match d {
            DrawingObject::Chart { details, .. } => Some(details),
            _ => None,
        })
    }

    /// Pivot tables among the drawing objects.
    pub fn pivot_tables(&self) -> impl Iterator<Item = &Decoded<PivotDetails>> {
        self.drawings.iter().filter_map(|d| match d {
            DrawingObject::PivotTable { details, .. } => Some(details),
            _ => None,
        })
    }
}
