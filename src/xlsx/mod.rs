//! XLSX (Excel) workbook decoding.
//!
//! Each part type has its own decoder; [`XlsxParser`] drives them across
//! the package and assembles the final [`Workbook`](crate::model::Workbook).
//!
//! # Example
//!
//! ```no_run
//! use unsheet::xlsx::{DecodeOptions, XlsxParser};
//!
//! let parser = XlsxParser::open("spreadsheet.xlsx")?
//!     .with_options(DecodeOptions::new().with_prune(false));
//! let workbook = parser.parse();
//!
//! for (name, sheet) in &workbook.sheets {
//!     println!("{}: {} cells", name, sheet.cells.len());
//! }
//! # Ok::<(), unsheet::Error>(())
//! ```

mod chart;
mod drawing;
mod options;
mod parser;
mod pivot;
mod shared_strings;
mod sheet;
mod styles;
mod xml;

pub use chart::{decode_chart, parse_chart_xml};
pub use drawing::decode_drawing;
pub use options::DecodeOptions;
pub use parser::XlsxParser;
pub use pivot::{decode_pivot, parse_cache_field_names, parse_pivot_table_xml};
pub use shared_strings::SharedStrings;
pub use sheet::{decode_sheet, parse_sheet_xml, RawCell, SheetPart};
pub use styles::StyleTable;
