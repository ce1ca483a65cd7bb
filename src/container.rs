//! ZIP container abstraction for workbook packages.
//!
//! The whole archive is inflated up front into a flat `path -> bytes` map.
//! After that nothing touches the ZIP reader again, so the package can be
//! shared read-only between sheet decoders running on different threads.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

/// Fix XML encoding declaration from UTF-16 to UTF-8.
///
/// After UTF-16 content is decoded into a Rust `String` the declaration still
/// claims UTF-16, which makes quick-xml misread the already-decoded text.
fn fix_xml_encoding_declaration(content: &str) -> String {
    if content.starts_with("<?xml") {
        if let Some(end_decl) = content.find("?>") {
            let decl = &content[..end_decl + 2];
            let rest = &content[end_decl + 2..];

            let fixed_decl = decl
                .replace("encoding=\"UTF-16\"", "encoding=\"UTF-8\"")
                .replace("encoding='UTF-16'", "encoding='UTF-8'")
                .replace("encoding=\"utf-16\"", "encoding=\"UTF-8\"")
                .replace("encoding='utf-16'", "encoding='UTF-8'");

            return format!("{}{}", fixed_decl, rest);
        }
    }
    content.to_string()
}

/// Decode XML bytes handling different encodings (UTF-8, UTF-16 LE/BE).
pub fn decode_xml_bytes(bytes: &[u8]) -> Result<String> {
    // UTF-8 BOM: EF BB BF
    if bytes.len() >= 3 && bytes[0] == 0xEF && bytes[1] == 0xBB && bytes[2] == 0xBF {
        return String::from_utf8(bytes[3..].to_vec())
            .map_err(|e| Error::InvalidData(format!("invalid UTF-8: {}", e)));
    }

    // UTF-16 LE BOM: FF FE
    if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] == 0xFE {
        let content = decode_utf16_le(&bytes[2..])?;
        return Ok(fix_xml_encoding_declaration(&content));
    }

    // UTF-16 BE BOM: FE FF
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let content = decode_utf16_be(&bytes[2..])?;
        return Ok(fix_xml_encoding_declaration(&content));
    }

    match String::from_utf8(bytes.to_vec()) {
        Ok(s) => Ok(s),
        Err(_) => {
            // ASCII markup encoded as UTF-16 has a NUL in every other byte
            if bytes.len() >= 4 && bytes[1] == 0 && bytes[3] == 0 {
                decode_utf16_le(bytes).map(|s| fix_xml_encoding_declaration(&s))
            } else if bytes.len() >= 4 && bytes[0] == 0 && bytes[2] == 0 {
                decode_utf16_be(bytes).map(|s| fix_xml_encoding_declaration(&s))
            } else {
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

fn decode_utf16_le(bytes: &[u8]) -> Result<String> {
    let len = bytes.len() & !1;
    let units = (0..len)
        .step_by(2)
        .map(|i| u16::from_le_bytes([bytes[i], bytes[i + 1]]));

    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::InvalidData(format!("invalid UTF-16: {}", e)))
}

fn decode_utf16_be(bytes: &[u8]) -> Result<String> {
    let len = bytes.len() & !1;
    let units = (0..len)
        .step_by(2)
        .map(|i| u16::from_be_bytes([bytes[i], bytes[i + 1]]));

    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::InvalidData(format!("invalid UTF-16: {}", e)))
}

/// Normalize an archive entry name into a part path.
fn normalize_part_name(name: &str) -> String {
    name.replace('\\', "/").trim_start_matches('/').to_string()
}

/// Read-only store of every part in a workbook package.
#[derive(Default)]
pub struct Package {
    parts: HashMap<String, Vec<u8>>,
}

impl Package {
    /// Open a package from a file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use unsheet::container::Package;
    ///
    /// let package = Package::open("budget.xlsx")?;
    /// assert!(package.exists("xl/workbook.xml"));
    /// # Ok::<(), unsheet::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Unpack a package from raw container bytes.
    ///
    /// Fails with [`Error::CorruptContainer`] if the bytes are not a ZIP
    /// archive or any entry cannot be inflated.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
        let mut parts = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = normalize_part_name(entry.name());
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| Error::CorruptContainer(format!("{}: {}", name, e)))?;
            parts.insert(name, bytes);
        }

        log::debug!("unpacked {} parts", parts.len());
        Ok(Self { parts })
    }

    /// Build a package directly from in-memory parts.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        Self {
            parts: parts
                .into_iter()
                .map(|(name, bytes)| (normalize_part_name(name.as_ref()), bytes))
                .collect(),
        }
    }

    /// Read a part as decoded XML text.
    pub fn read_xml(&self, path: &str) -> Result<String> {
        decode_xml_bytes(self.read_binary(path)?)
    }

    /// Read a part's raw bytes.
    pub fn read_binary(&self, path: &str) -> Result<&[u8]> {
        self.parts
            .get(path.trim_start_matches('/'))
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingPart(path.to_string()))
    }

    /// Check if a part exists.
    pub fn exists(&self, path: &str) -> bool {
        self.parts.contains_key(path.trim_start_matches('/'))
    }

    /// Number of parts in the package.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the package has no parts at all.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("parts", &self.parts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
            let options = SimpleFileOptions::default();
            for (name, content) in entries {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }

    #[test]
    fn test_from_bytes_reads_all_parts() {
        let data = zip_bytes(&[
            ("[Content_Types].xml", "<Types/>"),
            ("xl/workbook.xml", "<workbook/>"),
            ("xl/worksheets/sheet1.xml", "<worksheet/>"),
        ]);
        let package = Package::from_bytes(&data).unwrap();

        assert_eq!(package.len(), 3);
        assert!(package.exists("xl/workbook.xml"));
        assert!(package.exists("/xl/workbook.xml"));
        assert!(package.exists("xl/worksheets/sheet1.xml"));
        assert_eq!(package.read_xml("xl/workbook.xml").unwrap(), "<workbook/>");
    }

    #[test]
    fn test_not_a_zip_is_corrupt_container() {
        let err = Package::from_bytes(b"definitely not a zip archive").unwrap_err();
        assert!(matches!(err, Error::CorruptContainer(_)));
    }

    #[test]
    fn test_missing_part() {
        let package = Package::from_parts([("xl/workbook.xml", b"<workbook/>".to_vec())]);
        let err = package.read_xml("xl/styles.xml").unwrap_err();
        assert!(matches!(err, Error::MissingPart(p) if p == "xl/styles.xml"));
    }

    #[test]
    fn test_utf16_decoding_function() {
        let utf16_le = b"\xFF\xFE<\0?\0x\0m\0l\0>\0";
        assert_eq!(decode_xml_bytes(utf16_le).unwrap(), "<?xml>");

        let utf16_be = b"\xFE\xFF\0<\0?\0x\0m\0l\0>";
        assert_eq!(decode_xml_bytes(utf16_be).unwrap(), "<?xml>");

        let utf8_bom = b"\xEF\xBB\xBF<?xml>";
        assert_eq!(decode_xml_bytes(utf8_bom).unwrap(), "<?xml>");

        assert_eq!(decode_xml_bytes(b"<?xml>").unwrap(), "<?xml>");
    }

    #[test]
    fn test_utf16_declaration_rewritten() {
        let text = "<?xml version=\"1.0\" encoding=\"UTF-16\"?><a/>";
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(
            decode_xml_bytes(&bytes).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><a/>"
        );
    }
}
