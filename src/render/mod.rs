//! Output rendering for decoded workbooks.
//!
//! # Example
//!
//! ```no_run
//! use unsheet::{parse_file, render::*};
//!
//! let workbook = parse_file("budget.xlsx")?;
//! let json = to_json(&workbook, JsonFormat::Compact)?;
//! # Ok::<(), unsheet::Error>(())
//! ```

mod json;

pub use json::{to_json, to_json_default, JsonFormat};
