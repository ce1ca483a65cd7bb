//! Error types for the unsheet library.
//!
//! Only [`Error::CorruptContainer`] and [`Error::Io`] ever escape the public
//! decode entry points. The remaining variants are produced by individual
//! part decoders and get folded into defaults or sentinels by the assembler.

use std::io;
use thiserror::Error;

/// Result type alias for unsheet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding a workbook package.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading the input file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The container is not a readable ZIP archive.
    #[error("Corrupt container: {0}")]
    CorruptContainer(String),

    /// Error parsing the XML content of a single part.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// A referenced part does not exist in the package.
    #[error("Missing part: {0}")]
    MissingPart(String),

    /// Invalid or malformed data inside a part.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error during rendering.
    #[error("Render error: {0}")]
    Render(String),
}

impl Error {
    /// Whether this error aborts the whole decode.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::CorruptContainer(_))
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::CorruptContainer(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlParse(err.to_string())
    }
}
