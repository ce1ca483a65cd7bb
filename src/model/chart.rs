//! Chart and pivot table structures.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Outcome of decoding a referenced part.
///
/// Lets a consumer tell "the part was absent" from "the part failed to parse"
/// without failing the whole workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Decoded<T> {
    /// The part could not be parsed
    Failed { error: String },
    /// The reference did not lead to a part in the package
    Missing { missing: String },
    /// The part was decoded
    Parsed(T),
}

impl<T> Decoded<T> {
    /// The decoded value, if any.
    pub fn parsed(&self) -> Option<&T> {
        match self {
            Decoded::Parsed(value) => Some(value),
            _ => None,
        }
    }

    /// Whether decoding failed or the part was missing.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Decoded::Parsed(_))
    }
}

/// Chart kinds, one per plot-area block type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Scatter,
    Bubble,
    Area,
    Radar,
    Stock,
}

impl ChartKind {
    /// Map a plot-area block element name to its kind.
    ///
    /// 3-D variants fold into their flat kind; doughnut and pie-of-pie count
    /// as pie.
    pub fn from_block_name(name: &[u8]) -> Option<Self> {
        match name {
            b"barChart" | b"bar3DChart" => Some(ChartKind::Bar),
            b"lineChart" | b"line3DChart" => Some(ChartKind::Line),
            b"pieChart" | b"pie3DChart" | b"doughnutChart" | b"ofPieChart" => Some(ChartKind::Pie),
            b"scatterChart" => Some(ChartKind::Scatter),
            b"bubbleChart" => Some(ChartKind::Bubble),
            b"areaChart" | b"area3DChart" => Some(ChartKind::Area),
            b"radarChart" => Some(ChartKind::Radar),
            b"stockChart" => Some(ChartKind::Stock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Bubble => "bubble",
            ChartKind::Area => "area",
            ChartKind::Radar => "radar",
            ChartKind::Stock => "stock",
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Val,
    Cat,
    Date,
}

/// Scaling and labelling of one chart axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub kind: AxisKind,
    /// Minimum bound, `"auto"` when not fixed
    pub min: String,
    /// Maximum bound, `"auto"` when not fixed
    pub max: String,
    /// `"minMax"` or `"maxMin"`
    pub orientation: String,
    /// Major unit, `"auto"` when not fixed
    pub major_unit: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title_formula: Option<String>,
}

impl Axis {
    /// An axis with every scaling facet at its default.
    pub fn new(kind: AxisKind) -> Self {
        Self {
            kind,
            min: "auto".to_string(),
            max: "auto".to_string(),
            orientation: "minMax".to_string(),
            major_unit: "auto".to_string(),
            title: None,
            title_formula: None,
        }
    }
}

/// One data series of a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    /// Literal name, or the name formula when only that is stored
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub value_range: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub category_range: String,
    /// Kind of the plot-area block the series belongs to
    pub kind: ChartKind,
}

/// Decoded chart part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartDetails {
    /// Every kind present in the plot area, in document order
    pub types: Vec<ChartKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_formula: Option<String>,
    /// Axes keyed by axis id
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub axes: IndexMap<String, Axis>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<Series>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_position: Option<String>,
}

/// A data field of a pivot table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    /// Display name (e.g., "Sum of Sales")
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    /// Index into the pivot's field list
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_field: Option<u32>,
    /// Field name behind `source_field`; absent when the index is out of range
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_field_name: Option<String>,
    /// Aggregation function (e.g., "sum", "count", "average")
    pub aggregation: String,
}

/// Decoded pivot table part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location_range: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub row_fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub col_fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_fields: Vec<DataField>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_kind_from_block_name() {
        assert_eq!(ChartKind::from_block_name(b"barChart"), Some(ChartKind::Bar));
        assert_eq!(ChartKind::from_block_name(b"bar3DChart"), Some(ChartKind::Bar));
        assert_eq!(ChartKind::from_block_name(b"doughnutChart"), Some(ChartKind::Pie));
        assert_eq!(ChartKind::from_block_name(b"plotArea"), None);
    }

    #[test]
    fn test_decoded_serialization() {
        let failed: Decoded<PivotDetails> = Decoded::Failed {
            error: "XML parse error".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&failed).unwrap(),
            r#"{"error":"XML parse error"}"#
        );

        let parsed = Decoded::Parsed(PivotDetails {
            location_range: "A3:C20".to_string(),
            ..Default::default()
        });
        assert_eq!(
            serde_json::to_string(&parsed).unwrap(),
            r#"{"location_range":"A3:C20"}"#
        );
        assert!(!parsed.is_degraded());
        assert!(failed.is_degraded());
    }

    #[test]
    fn test_axis_defaults() {
        let axis = Axis::new(AxisKind::Val);
        assert_eq!(axis.min, "auto");
        assert_eq!(axis.max, "auto");
        assert_eq!(axis.orientation, "minMax");
        assert_eq!(axis.major_unit, "auto");
    }
}
