//! Normalized workbook model.
//!
//! Decoders turn the package's cross-referencing parts into these
//! structures. Nothing here points back into the raw package, so a decoded
//! [`Workbook`] can be serialized or moved around on its own.

mod cell;
mod chart;
mod metadata;
mod workbook;

pub use cell::*;
pub use chart::*;
pub use metadata::*;
pub use workbook::*;
