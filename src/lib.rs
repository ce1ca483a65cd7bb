//! # unsheet
//!
//! Structural decoding of Excel (.xlsx) workbooks.
//!
//! A workbook package is a zip of cross-referencing XML parts. This library
//! resolves those references and produces a single self-contained
//! [`Workbook`]: cell values and formulas, compact cell styles, validations,
//! conditional formats, merged ranges, sparklines, drawings, charts and
//! pivot tables. Empty cells and sheets are pruned so the result stays
//! small.
//!
//! ## Quick Start
//!
//! ```no_run
//! use unsheet::parse_file;
//!
//! let workbook = parse_file("budget.xlsx")?;
//! for (name, sheet) in &workbook.sheets {
//!     println!("{}: {} cells", name, sheet.cells.len());
//! }
//!
//! // Straight to JSON
//! let json = unsheet::to_json("budget.xlsx")?;
//! std::fs::write("budget.json", json)?;
//! # Ok::<(), unsheet::Error>(())
//! ```
//!
//! ## Errors
//!
//! Only a package that cannot be opened fails the decode. Missing or
//! malformed parts inside it are logged through the `log` facade and marked
//! on the affected sheet, chart or pivot table.
//!
//! ## Features
//!
//! - `parallel` (default): decode sheets concurrently with rayon

pub mod container;
pub mod error;
pub mod model;
pub mod rels;
pub mod render;
pub mod xlsx;

// Re-exports
pub use container::Package;
pub use error::{Error, Result};
pub use model::{
    Axis, AxisKind, BorderStyle, Cell, ChartDetails, ChartKind, CompactStyle, ConditionalFormat,
    DataField, Decoded, DrawingObject, FillStyle, FontStyle, MergeRange, PivotDetails, Series,
    Sheet, SheetMetadata, Sparkline, SparklineGroup, Validation, ViewSettings, Workbook,
};
pub use render::JsonFormat;
pub use xlsx::{DecodeOptions, XlsxParser};

use std::path::Path;

/// Decode a workbook file.
///
/// # Example
///
/// ```no_run
/// use unsheet::parse_file;
///
/// let workbook = parse_file("budget.xlsx")?;
/// println!("Sheets: {:?}", workbook.sheet_names());
/// # Ok::<(), unsheet::Error>(())
/// ```
pub fn parse_file(path: impl AsRef<Path>) -> Result<Workbook> {
    parse_file_with_options(path, DecodeOptions::default())
}

/// Decode a workbook file with options.
pub fn parse_file_with_options(path: impl AsRef<Path>, options: DecodeOptions) -> Result<Workbook> {
    let parser = XlsxParser::open(path)?.with_options(options);
    Ok(parser.parse())
}

/// Decode a workbook from bytes.
///
/// # Example
///
/// ```no_run
/// use unsheet::parse_bytes;
///
/// let data = std::fs::read("budget.xlsx")?;
/// let workbook = parse_bytes(&data)?;
/// # Ok::<(), unsheet::Error>(())
/// ```
pub fn parse_bytes(data: &[u8]) -> Result<Workbook> {
    parse_bytes_with_options(data, DecodeOptions::default())
}

/// Decode a workbook from bytes with options.
pub fn parse_bytes_with_options(data: &[u8], options: DecodeOptions) -> Result<Workbook> {
    let parser = XlsxParser::from_bytes(data)?.with_options(options);
    Ok(parser.parse())
}

/// Decode a workbook file and render it as pretty JSON.
pub fn to_json(path: impl AsRef<Path>) -> Result<String> {
    let workbook = parse_file(path)?;
    render::to_json(&workbook, JsonFormat::Pretty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_package() {
        let err = parse_bytes(b"plain text, not a zip").unwrap_err();
        assert!(matches!(err, Error::CorruptContainer(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_file() {
        let err = parse_file("does/not/exist.xlsx").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
