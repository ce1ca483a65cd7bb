//! Workbook assembly.

use crate::container::Package;
use crate::error::{Error, Result};
use crate::model::{Cell, Sheet, Workbook};
use crate::rels::{rel_type, Relationships};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashSet;
use std::path::Path;

use super::options::DecodeOptions;
use super::shared_strings::SharedStrings;
use super::sheet::{decode_sheet, SheetPart};
use super::styles::StyleTable;
use super::xml::{attr, text};

const DEFAULT_WORKBOOK_PATH: &str = "xl/workbook.xml";
const DEFAULT_SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";
const DEFAULT_STYLES_PATH: &str = "xl/styles.xml";

/// Sheet entry declared in workbook.xml.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SheetInfo {
    name: String,
    rel_id: String,
}

/// Defined name declared in workbook.xml.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DefinedName {
    name: String,
    local_sheet: Option<usize>,
    formula: String,
}

/// Sheets and defined names declared by the workbook part.
#[derive(Debug, Clone, Default)]
struct WorkbookInfo {
    sheets: Vec<SheetInfo>,
    defined_names: Vec<DefinedName>,
}

impl WorkbookInfo {
    /// Parse workbook.xml, keeping whatever was read before an error.
    fn parse(xml: &str) -> Self {
        let mut info = Self::default();
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut current_name: Option<DefinedName> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                    b"sheet" => info.push_sheet(e),
                    b"definedName" => current_name = Some(defined_name(e)),
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                    b"sheet" => info.push_sheet(e),
                    b"definedName" => info.defined_names.push(defined_name(e)),
                    _ => {}
                },
                Ok(Event::Text(ref e)) => {
                    if let Some(name) = current_name.as_mut() {
                        name.formula.push_str(&text(e));
                    }
                }
                Ok(Event::End(ref e)) => {
                    if e.local_name().as_ref() == b"definedName" {
                        if let Some(name) = current_name.take() {
                            info.defined_names.push(name);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    log::warn!("workbook part stopped parsing early: {}", e);
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        info
    }

    fn push_sheet(&mut self, e: &BytesStart) {
        if let Some(name) = attr(e, b"name") {
            self.sheets.push(SheetInfo {
                name,
                rel_id: attr(e, b"id").unwrap_or_default(),
            });
        }
    }

    /// Defined names keyed for output.
    ///
    /// A sheet-scoped name that collides with a global name (or another
    /// scoped one) is keyed `SheetName!Name`.
    fn resolve_defined_names(&self) -> IndexMap<String, String> {
        let globals: HashSet<&str> = self
            .defined_names
            .iter()
            .filter(|d| d.local_sheet.is_none())
            .map(|d| d.name.as_str())
            .collect();

        let mut names = IndexMap::new();
        for defined in &self.defined_names {
            let collides =
                globals.contains(defined.name.as_str()) || names.contains_key(&defined.name);
            let key = match defined.local_sheet {
                Some(index) if collides => {
                    let sheet = self
                        .sheets
                        .get(index)
                        .map(|s| s.name.as_str())
                        .unwrap_or("Unknown");
                    format!("{}!{}", sheet, defined.name)
                }
                _ => defined.name.clone(),
            };
            names.insert(key, defined.formula.clone());
        }
        names
    }
}

fn defined_name(e: &BytesStart) -> DefinedName {
    DefinedName {
        name: attr(e, b"name").unwrap_or_default(),
        local_sheet: attr(e, b"localSheetId").and_then(|id| id.parse().ok()),
        formula: String::new(),
    }
}

/// Parser for XLSX (Excel) workbooks.
///
/// Holds the unpacked package; [`XlsxParser::parse`] can be called any
/// number of times and always yields the same workbook.
pub struct XlsxParser {
    package: Package,
    options: DecodeOptions,
}

impl XlsxParser {
    /// Open an XLSX file for parsing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_package(Package::open(path)?))
    }

    /// Create a parser from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self::from_package(Package::from_bytes(data)?))
    }

    /// Create a parser from an unpacked package.
    pub fn from_package(package: Package) -> Self {
        Self {
            package,
            options: DecodeOptions::default(),
        }
    }

    /// Set decode options.
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Get a reference to the package.
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Path of the workbook part, from the package relationships.
    fn workbook_path(&self) -> String {
        Relationships::load(&self.package, "")
            .first_path_of_type(rel_type::OFFICE_DOCUMENT)
            .filter(|path| self.package.exists(path))
            .unwrap_or(DEFAULT_WORKBOOK_PATH)
            .to_string()
    }

    fn workbook_info(&self, workbook_path: &str) -> WorkbookInfo {
        match self.package.read_xml(workbook_path) {
            Ok(xml) => WorkbookInfo::parse(&xml),
            Err(e) => {
                log::warn!("no workbook part at {}: {}", workbook_path, e);
                WorkbookInfo::default()
            }
        }
    }

    /// Sheet names in declared order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook_info(&self.workbook_path())
            .sheets
            .into_iter()
            .map(|s| s.name)
            .collect()
    }

    /// Locate a workbook-level part through the workbook relationships.
    fn related_part(&self, rels: &Relationships, suffix: &str, fallback: &str) -> Option<String> {
        rels.first_path_of_type(suffix)
            .filter(|path| self.package.exists(path))
            .or_else(|| self.package.exists(fallback).then_some(fallback))
            .map(str::to_string)
    }

    fn load_shared_strings(&self, rels: &Relationships) -> SharedStrings {
        let Some(path) = self.related_part(rels, rel_type::SHARED_STRINGS, DEFAULT_SHARED_STRINGS_PATH)
        else {
            log::debug!("package has no shared string part");
            return SharedStrings::default();
        };

        match self
            .package
            .read_xml(&path)
            .and_then(|xml| SharedStrings::parse(&xml))
        {
            Ok(strings) => {
                log::debug!("loaded {} shared strings from {}", strings.len(), path);
                strings
            }
            Err(e) => {
                log::warn!("ignoring shared strings {}: {}", path, e);
                SharedStrings::default()
            }
        }
    }

    fn load_styles(&self, rels: &Relationships) -> StyleTable {
        let Some(path) = self.related_part(rels, rel_type::STYLES, DEFAULT_STYLES_PATH) else {
            return StyleTable::default();
        };

        match self.package.read_xml(&path) {
            Ok(xml) => StyleTable::parse(&xml),
            Err(e) => {
                log::warn!("ignoring styles {}: {}", path, e);
                StyleTable::default()
            }
        }
    }

    fn decode_one(
        &self,
        info: &SheetInfo,
        rels: &Relationships,
        strings: &SharedStrings,
        styles: &StyleTable,
    ) -> Sheet {
        let part = match rels.target_path(&info.rel_id) {
            Some(path) => decode_sheet(&self.package, path, strings),
            None => {
                log::warn!(
                    "sheet '{}' has no part for relationship '{}'",
                    info.name,
                    info.rel_id
                );
                SheetPart::failed(
                    Error::MissingPart(format!("relationship {}", info.rel_id)).to_string(),
                )
            }
        };

        self.assemble_sheet(&info.name, part, styles)
    }

    /// Attach compact styles and apply the retention rules to one sheet.
    fn assemble_sheet(&self, name: &str, part: SheetPart, styles: &StyleTable) -> Sheet {
        let mut sheet = Sheet::new(name);
        sheet.metadata = part.metadata;
        sheet.error = part.error;

        for (coordinate, raw) in part.cells {
            let cell = Cell {
                value: raw.value,
                formula: raw.formula,
                formula_type: raw.formula_type,
                formula_ref: raw.formula_ref,
                style: raw.style_index.and_then(|i| styles.get(i)).cloned(),
            };
            if !self.options.prune || cell.has_content() {
                sheet.cells.insert(coordinate, cell);
            }
        }

        sheet
    }

    #[cfg(feature = "parallel")]
    fn decode_sheets(
        &self,
        sheets: &[SheetInfo],
        rels: &Relationships,
        strings: &SharedStrings,
        styles: &StyleTable,
    ) -> Vec<Sheet> {
        use rayon::prelude::*;

        if self.options.runs_parallel() && sheets.len() > 1 {
            sheets
                .par_iter()
                .map(|info| self.decode_one(info, rels, strings, styles))
                .collect()
        } else {
            sheets
                .iter()
                .map(|info| self.decode_one(info, rels, strings, styles))
                .collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn decode_sheets(
        &self,
        sheets: &[SheetInfo],
        rels: &Relationships,
        strings: &SharedStrings,
        styles: &StyleTable,
    ) -> Vec<Sheet> {
        sheets
            .iter()
            .map(|info| self.decode_one(info, rels, strings, styles))
            .collect()
    }

    /// Decode the whole workbook.
    ///
    /// Never fails once the package is open: every part-level problem is
    /// logged and marked on the affected sheet, chart or pivot table.
    pub fn parse(&self) -> Workbook {
        let workbook_path = self.workbook_path();
        let info = self.workbook_info(&workbook_path);
        let rels = Relationships::load(&self.package, &workbook_path);

        let strings = self.load_shared_strings(&rels);
        let styles = self.load_styles(&rels);

        let mut workbook = Workbook::new();
        workbook.defined_names = info.resolve_defined_names();

        // Collected in declared order whether or not decoding ran in parallel
        for sheet in self.decode_sheets(&info.sheets, &rels, &strings, &styles) {
            if !self.options.prune || sheet.is_retained() {
                workbook.add_sheet(sheet);
            } else {
                log::debug!("pruned empty sheet '{}'", sheet.name);
            }
        }

        log::debug!(
            "decoded workbook {}: {} of {} sheets retained, {} cells",
            workbook_path,
            workbook.sheets.len(),
            info.sheets.len(),
            workbook.cell_count()
        );
        workbook
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Summary" sheetId="2" r:id="rId2"/>
    <sheet name="Data" sheetId="1" r:id="rId1"/>
  </sheets>
  <definedNames>
    <definedName name="Total">Summary!$B$10</definedName>
    <definedName name="Total" localSheetId="1">Data!$C$99</definedName>
    <definedName name="_xlnm.Print_Area" localSheetId="0">Summary!$A$1:$D$20</definedName>
    <definedName name="Rates">Data!$A$1:$A$5</definedName>
  </definedNames>
</workbook>"#;

    #[test]
    fn test_workbook_info() {
        let info = WorkbookInfo::parse(WORKBOOK_XML);
        assert_eq!(
            info.sheets,
            vec![
                SheetInfo {
                    name: "Summary".to_string(),
                    rel_id: "rId2".to_string(),
                },
                SheetInfo {
                    name: "Data".to_string(),
                    rel_id: "rId1".to_string(),
                },
            ]
        );
        assert_eq!(info.defined_names[1].local_sheet, Some(1));
    }

    #[test]
    fn test_defined_names_with_local_collision() {
        let names = WorkbookInfo::parse(WORKBOOK_XML).resolve_defined_names();
        let keys: Vec<&str> = names.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Total", "Data!Total", "_xlnm.Print_Area", "Rates"]);
        assert_eq!(names["Total"], "Summary!$B$10");
        assert_eq!(names["Data!Total"], "Data!$C$99");
    }

    #[test]
    fn test_sheets_follow_declared_order() {
        let rels = r#"<Relationships>
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
</Relationships>"#;
        let sheet = |v: &str| {
            format!(
                r#"<worksheet><sheetData><row r="1"><c r="A1"><v>{}</v></c></row></sheetData></worksheet>"#,
                v
            )
            .into_bytes()
        };
        let package = Package::from_parts([
            ("xl/workbook.xml", WORKBOOK_XML.as_bytes().to_vec()),
            ("xl/_rels/workbook.xml.rels", rels.as_bytes().to_vec()),
            ("xl/worksheets/sheet1.xml", sheet("1")),
            ("xl/worksheets/sheet2.xml", sheet("2")),
        ]);

        let parser = XlsxParser::from_package(package);
        assert_eq!(parser.sheet_names(), vec!["Summary", "Data"]);

        let workbook = parser.parse();
        assert_eq!(workbook.sheet_names(), vec!["Summary", "Data"]);
        assert_eq!(workbook.sheets["Summary"].cells["A1"].value, "2");
        assert_eq!(workbook.sheets["Data"].cells["A1"].value, "1");
    }

    #[test]
    fn test_unresolved_sheet_is_marked() {
        let package = Package::from_parts([("xl/workbook.xml", WORKBOOK_XML.as_bytes().to_vec())]);
        let workbook = XlsxParser::from_package(package).parse();
        assert_eq!(workbook.sheets.len(), 2);
        let error = workbook.sheets["Data"].error.as_deref().unwrap();
        assert!(error.starts_with("Missing part: relationship"));
        assert!(workbook.sheets["Data"].cells.is_empty());
    }

    #[test]
    fn test_missing_workbook_part() {
        let workbook = XlsxParser::from_package(Package::default()).parse();
        assert!(workbook.sheets.is_empty());
        assert!(workbook.defined_names.is_empty());
    }
}
