//! Worksheet part decoding.
//!
//! One pass over the sheet XML collects cells and metadata. Drawing and
//! pivot references are expanded afterwards through the sheet's own
//! relationships.

use super::drawing::decode_drawing;
use super::pivot::decode_pivot;
use super::shared_strings::SharedStrings;
use super::xml::{attr, decode_excel_escapes, text};
use crate::container::Package;
use crate::error::Error;
use crate::model::{
    column_letters, parse_coordinate, ConditionalFormat, Decoded, DrawingObject, MergeRange,
    SheetMetadata, Sparkline, SparklineGroup, Validation, ViewSettings, STRING_LOOKUP_ERROR,
};
use crate::rels::{rel_type, Relationships};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};

/// A cell as stored in the sheet, before its style is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCell {
    pub value: String,
    pub formula: Option<String>,
    pub formula_type: Option<String>,
    pub formula_ref: Option<String>,
    pub style_index: Option<usize>,
}

/// Everything decoded from one sheet part.
#[derive(Debug, Clone, Default)]
pub struct SheetPart {
    pub cells: IndexMap<String, RawCell>,
    pub metadata: SheetMetadata,
    /// Set when the part was missing or stopped parsing part-way
    pub error: Option<String>,
    drawing_id: Option<String>,
    legacy_drawing_ids: Vec<String>,
}

impl SheetPart {
    /// A sheet that could not be decoded at all.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Element whose text is being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    Value,
    Formula,
    InlineText,
    ValidationFormula1,
    ValidationFormula2,
    CfFormula,
    SparklineData,
    SparklineLocation,
}

#[derive(Debug, Default)]
struct CellState {
    coordinate: String,
    cell_type: Option<String>,
    raw_value: Option<String>,
    inline_text: String,
    cell: RawCell,
}

#[derive(Debug, Default)]
struct SparklineContainer {
    /// Found directly under the worksheet's own extension list
    primary: bool,
    groups: Vec<SparklineGroup>,
}

struct SheetBuilder<'a> {
    strings: &'a SharedStrings,
    part: SheetPart,
    stack: Vec<Vec<u8>>,
    target: Option<TextTarget>,

    row: u32,
    column: u32,
    cell: Option<CellState>,

    validation: Option<Validation>,
    cf_range: String,
    cf_rule: Option<ConditionalFormat>,
    cf_formula_seen: bool,

    sparkline_containers: Vec<SparklineContainer>,
    sparkline_group: Option<SparklineGroup>,
    sparkline: Option<Sparkline>,
}

impl<'a> SheetBuilder<'a> {
    fn new(strings: &'a SharedStrings) -> Self {
        Self {
            strings,
            part: SheetPart::default(),
            stack: Vec::new(),
            target: None,
            row: 0,
            column: 0,
            cell: None,
            validation: None,
            cf_range: String::new(),
            cf_rule: None,
            cf_formula_seen: false,
            sparkline_containers: Vec::new(),
            sparkline_group: None,
            sparkline: None,
        }
    }

    fn parent(&self) -> &[u8] {
        self.stack.last().map(Vec::as_slice).unwrap_or_default()
    }

    fn in_ext_lst(&self) -> bool {
        self.stack.iter().any(|n| n == b"extLst")
    }

    fn in_rph(&self) -> bool {
        self.stack.iter().any(|n| n == b"rPh")
    }

    fn start(&mut self, e: &BytesStart) {
        let name = e.local_name();
        match name.as_ref() {
            b"sheetView" if self.part.metadata.view_settings.is_none() => {
                self.part.metadata.view_settings = Some(ViewSettings {
                    active_tab: attr(e, b"tabSelected").is_some_and(|v| v == "1" || v == "true"),
                    show_gridlines: !attr(e, b"showGridLines")
                        .is_some_and(|v| v == "0" || v == "false"),
                    zoom: attr(e, b"zoomScale"),
                });
            }
            b"row" if self.parent() == b"sheetData" => {
                self.row = attr(e, b"r")
                    .and_then(|r| r.parse().ok())
                    .unwrap_or_else(|| self.row.saturating_add(1));
                self.column = 0;
            }
            b"c" if self.parent() == b"row" => self.start_cell(e),
            b"v" if self.cell.is_some() => self.target = Some(TextTarget::Value),
            b"f" if self.cell.is_some() => {
                if let Some(state) = self.cell.as_mut() {
                    state.cell.formula_type = attr(e, b"t");
                    state.cell.formula_ref = attr(e, b"ref");
                }
                self.target = Some(TextTarget::Formula);
            }
            b"t" if self.cell.is_some() && !self.in_rph() => {
                self.target = Some(TextTarget::InlineText);
            }
            b"dataValidation" if !self.in_ext_lst() => {
                self.validation = Some(Validation {
                    validation_type: attr(e, b"type"),
                    range: attr(e, b"sqref").unwrap_or_default(),
                    ..Default::default()
                });
            }
            b"formula1" if self.validation.is_some() => {
                self.target = Some(TextTarget::ValidationFormula1);
            }
            b"formula2" if self.validation.is_some() => {
                self.target = Some(TextTarget::ValidationFormula2);
            }
            b"conditionalFormatting" if !self.in_ext_lst() => {
                self.cf_range = attr(e, b"sqref").unwrap_or_default();
            }
            b"cfRule" if !self.in_ext_lst() => {
                self.cf_rule = Some(ConditionalFormat {
                    range: self.cf_range.clone(),
                    rule_type: attr(e, b"type"),
                    priority: attr(e, b"priority"),
                    dxf_id: attr(e, b"dxfId"),
                    formula: String::new(),
                });
                self.cf_formula_seen = false;
            }
            b"formula" if self.cf_rule.is_some() && !self.cf_formula_seen => {
                self.cf_formula_seen = true;
                self.target = Some(TextTarget::CfFormula);
            }
            b"mergeCell" => {
                if let Some(range) = attr(e, b"ref") {
                    self.part.metadata.merge_cells.push(MergeRange { range });
                }
            }
            b"drawing" => {
                if self.part.drawing_id.is_none() {
                    self.part.drawing_id = attr(e, b"id");
                }
            }
            b"legacyDrawing" => {
                if let Some(id) = attr(e, b"id") {
                    self.part.legacy_drawing_ids.push(id);
                }
            }
            b"sparklineGroups" => {
                let primary = self.stack.len() == 3
                    && self.stack[1] == b"extLst"
                    && self.stack[2] == b"ext";
                self.sparkline_containers.push(SparklineContainer {
                    primary,
                    groups: Vec::new(),
                });
            }
            b"sparklineGroup" => {
                self.sparkline_group = Some(SparklineGroup {
                    sparkline_type: attr(e, b"type").unwrap_or_else(|| "line".to_string()),
                    sparklines: Vec::new(),
                });
            }
            b"sparkline" if self.sparkline_group.is_some() => {
                self.sparkline = Some(Sparkline::default());
            }
            b"f" if self.sparkline.is_some() => self.target = Some(TextTarget::SparklineData),
            b"sqref" if self.sparkline.is_some() => {
                self.target = Some(TextTarget::SparklineLocation);
            }
            _ => {}
        }
    }

    fn start_cell(&mut self, e: &BytesStart) {
        let coordinate = match attr(e, b"r") {
            Some(r) => {
                if let Some((column, row)) = parse_coordinate(&r) {
                    self.column = column;
                    self.row = row;
                }
                r
            }
            None => {
                self.column = self.column.saturating_add(1);
                format!("{}{}", column_letters(self.column), self.row.max(1))
            }
        };

        self.cell = Some(CellState {
            coordinate,
            cell_type: attr(e, b"t"),
            cell: RawCell {
                style_index: attr(e, b"s").and_then(|s| s.parse().ok()),
                ..Default::default()
            },
            ..Default::default()
        });
    }

    fn end(&mut self, name: &[u8]) {
        self.target = None;
        match name {
            b"c" => self.finish_cell(),
            b"dataValidation" => {
                if let Some(validation) = self.validation.take() {
                    self.part.metadata.validations.push(validation);
                }
            }
            b"cfRule" => {
                if let Some(rule) = self.cf_rule.take() {
                    self.part.metadata.conditional_formats.push(rule);
                }
            }
            b"sparkline" => {
                if let (Some(sparkline), Some(group)) =
                    (self.sparkline.take(), self.sparkline_group.as_mut())
                {
                    group.sparklines.push(sparkline);
                }
            }
            b"sparklineGroup" => {
                if let (Some(group), Some(container)) = (
                    self.sparkline_group.take(),
                    self.sparkline_containers.last_mut(),
                ) {
                    container.groups.push(group);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, value: &str) {
        let Some(target) = self.target else {
            return;
        };

        match target {
            TextTarget::Value | TextTarget::Formula | TextTarget::InlineText => {
                let Some(state) = self.cell.as_mut() else {
                    return;
                };
                let slot = match target {
                    TextTarget::Value => state.raw_value.get_or_insert_with(String::new),
                    TextTarget::Formula => state.cell.formula.get_or_insert_with(String::new),
                    _ => &mut state.inline_text,
                };
                slot.push_str(value);
            }
            TextTarget::ValidationFormula1 | TextTarget::ValidationFormula2 => {
                if let Some(validation) = self.validation.as_mut() {
                    if target == TextTarget::ValidationFormula1 {
                        validation.formula1.push_str(value);
                    } else {
                        validation.formula2.push_str(value);
                    }
                }
            }
            TextTarget::CfFormula => {
                if let Some(rule) = self.cf_rule.as_mut() {
                    rule.formula.push_str(value);
                }
            }
            TextTarget::SparklineData | TextTarget::SparklineLocation => {
                if let Some(sparkline) = self.sparkline.as_mut() {
                    let slot = if target == TextTarget::SparklineData {
                        &mut sparkline.data_range
                    } else {
                        &mut sparkline.location
                    };
                    slot.get_or_insert_with(String::new).push_str(value);
                }
            }
        }
    }

    fn finish_cell(&mut self) {
        let Some(mut state) = self.cell.take() else {
            return;
        };

        state.cell.value = match (state.cell_type.as_deref(), state.raw_value) {
            (Some("inlineStr"), _) => decode_excel_escapes(&state.inline_text),
            (Some("s"), raw) => match raw
                .as_deref()
                .and_then(|r| r.trim().parse::<usize>().ok())
                .and_then(|i| self.strings.get(i))
            {
                Some(s) => s.to_string(),
                None => {
                    log::warn!(
                        "cell {}: shared string index {:?} out of range ({} strings)",
                        state.coordinate,
                        raw,
                        self.strings.len()
                    );
                    STRING_LOOKUP_ERROR.to_string()
                }
            },
            (_, None) => String::new(),
            (Some("b"), Some(raw)) => match raw.trim() {
                "1" | "true" => "TRUE".to_string(),
                "0" | "false" => "FALSE".to_string(),
                _ => raw,
            },
            (_, Some(raw)) => raw,
        };

        self.part.cells.insert(state.coordinate, state.cell);
    }

    fn finish(mut self) -> SheetPart {
        // Worksheet-level extension first, then wherever else groups appear
        let chosen = self
            .sparkline_containers
            .iter()
            .position(|c| c.primary)
            .or_else(|| (!self.sparkline_containers.is_empty()).then_some(0));
        if let Some(i) = chosen {
            self.part.metadata.sparkline_groups = self.sparkline_containers.swap_remove(i).groups;
        }
        self.part
    }
}

/// Decode sheet XML into cells and metadata.
///
/// Malformed XML stops the pass: what was decoded before the error is kept
/// and the error is recorded on the result.
pub fn parse_sheet_xml(xml: &str, strings: &SharedStrings) -> SheetPart {
    let mut builder = SheetBuilder::new(strings);
    let mut reader = quick_xml::Reader::from_str(xml);
    // Inline string text keeps its spaces
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                builder.start(e);
                builder.stack.push(e.local_name().as_ref().to_vec());
            }
            Ok(Event::Empty(ref e)) => {
                builder.start(e);
                builder.end(e.local_name().as_ref());
            }
            Ok(Event::End(ref e)) => {
                builder.stack.pop();
                builder.end(e.local_name().as_ref());
            }
            Ok(Event::Text(ref e)) => builder.text(&text(e)),
            Ok(Event::CData(ref e)) => builder.text(&String::from_utf8_lossy(e)),
            Ok(Event::Eof) => break,
            Err(e) => {
                builder.part.error = Some(Error::from(e).to_string());
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    builder.finish()
}

/// Decode the sheet part at `path`, expanding drawings and pivot tables.
pub fn decode_sheet(package: &Package, path: &str, strings: &SharedStrings) -> SheetPart {
    let xml = match package.read_xml(path) {
        Ok(xml) => xml,
        Err(e) => {
            log::warn!("sheet part {} unavailable: {}", path, e);
            return SheetPart::failed(e.to_string());
        }
    };

    let mut part = parse_sheet_xml(&xml, strings);
    if let Some(error) = &part.error {
        log::warn!("sheet {} decoded partially: {}", path, error);
    }

    let rels = Relationships::load(package, path);
    let drawings = &mut part.metadata.drawings;

    if let Some(relationship_id) = part.drawing_id.take() {
        match rels.target_path(&relationship_id) {
            Some(drawing_path) => match decode_drawing(package, drawing_path) {
                Ok(objects) => drawings.extend(objects),
                Err(e) => {
                    log::warn!("drawing {} could not be decoded: {}", drawing_path, e);
                    drawings.push(DrawingObject::DrawingRef {
                        relationship_id,
                        path: Some(drawing_path.to_string()),
                        error: Some(e.to_string()),
                    });
                }
            },
            None => {
                log::warn!(
                    "sheet {} references unknown drawing relationship {}",
                    path,
                    relationship_id
                );
                drawings.push(DrawingObject::DrawingRef {
                    relationship_id,
                    path: None,
                    error: None,
                });
            }
        }
    }

    for relationship_id in part.legacy_drawing_ids.drain(..) {
        drawings.push(DrawingObject::LegacyDrawingRef { relationship_id });
    }

    for rel in rels.of_type(rel_type::PIVOT_TABLE) {
        let details = match &rel.path {
            Some(pivot_path) => decode_pivot(package, pivot_path),
            None => Decoded::Missing {
                missing: rel.target.clone(),
            },
        };
        drawings.push(DrawingObject::PivotTable {
            relationship_id: rel.id.clone(),
            details,
        });
    }

    log::debug!(
        "decoded sheet {} ({} cells, {} drawing objects)",
        path,
        part.cells.len(),
        part.metadata.drawings.len()
    );
    part
}
