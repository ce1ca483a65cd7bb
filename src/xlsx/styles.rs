//! XLSX style table resolution.
//!
//! `xl/styles.xml` holds four definition tables (number formats, fonts,
//! fills, borders) and the ordered `cellXfs` table whose position is the
//! style index cells refer to. Each position is reduced to a
//! [`CompactStyle`] holding only the facets that differ from the defaults.

use super::xml::{attr, flag};
use crate::model::{BorderStyle, CompactStyle, FillStyle, FontStyle};
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

/// Standard format codes for the built-in number format ids.
fn builtin_format_code(id: u32) -> Option<&'static str> {
    let code = match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        5 => "$#,##0_);($#,##0)",
        6 => "$#,##0_);[Red]($#,##0)",
        7 => "$#,##0.00_);($#,##0.00)",
        8 => "$#,##0.00_);[Red]($#,##0.00)",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

#[derive(Debug, Clone, Default)]
struct FontDef {
    bold: bool,
    italic: bool,
    name: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct FillDef {
    pattern: Option<String>,
    color: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct XfDef {
    num_fmt_id: u32,
    font_id: Option<usize>,
    fill_id: Option<usize>,
    border_id: Option<usize>,
}

/// Definition tables collected while scanning `styles.xml`.
#[derive(Debug, Default)]
struct StylesBuilder {
    num_fmts: HashMap<u32, String>,
    fonts: Vec<FontDef>,
    fills: Vec<FillDef>,
    borders: Vec<BorderStyle>,
    xfs: Vec<XfDef>,

    in_num_fmts: bool,
    in_fonts: bool,
    in_fills: bool,
    in_borders: bool,
    in_cell_xfs: bool,
    current_font: Option<FontDef>,
    current_fill: Option<FillDef>,
    current_border: Option<BorderStyle>,
}

impl StylesBuilder {
    fn start(&mut self, e: &BytesStart, is_empty: bool) {
        match e.local_name().as_ref() {
            b"numFmts" if !is_empty => self.in_num_fmts = true,
            b"fonts" if !is_empty => self.in_fonts = true,
            b"fills" if !is_empty => self.in_fills = true,
            b"borders" if !is_empty => self.in_borders = true,
            b"cellXfs" if !is_empty => self.in_cell_xfs = true,

            b"numFmt" if self.in_num_fmts => {
                let id = attr(e, b"numFmtId").and_then(|v| v.parse().ok());
                if let (Some(id), Some(code)) = (id, attr(e, b"formatCode")) {
                    self.num_fmts.insert(id, code);
                }
            }

            b"font" if self.in_fonts => {
                if is_empty {
                    self.fonts.push(FontDef::default());
                } else {
                    self.current_font = Some(FontDef::default());
                }
            }
            b"b" => {
                if let Some(font) = self.current_font.as_mut() {
                    font.bold = flag(e);
                }
            }
            b"i" => {
                if let Some(font) = self.current_font.as_mut() {
                    font.italic = flag(e);
                }
            }
            b"name" => {
                if let Some(font) = self.current_font.as_mut() {
                    font.name = attr(e, b"val");
                }
            }

            b"fill" if self.in_fills => {
                if is_empty {
                    self.fills.push(FillDef::default());
                } else {
                    self.current_fill = Some(FillDef::default());
                }
            }
            b"patternFill" => {
                if let Some(fill) = self.current_fill.as_mut() {
                    fill.pattern = attr(e, b"patternType");
                }
            }
            b"gradientFill" => {
                if let Some(fill) = self.current_fill.as_mut() {
                    fill.pattern = Some("gradient".to_string());
                }
            }
            b"fgColor" => {
                if let Some(fill) = self.current_fill.as_mut() {
                    fill.color = color_value(e);
                }
            }

            b"border" if self.in_borders => {
                if is_empty {
                    self.borders.push(BorderStyle::default());
                } else {
                    self.current_border = Some(BorderStyle::default());
                }
            }
            side @ (b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end") => {
                if let Some(border) = self.current_border.as_mut() {
                    let style = attr(e, b"style").filter(|s| !s.is_empty() && s != "none");
                    let slot = match side {
                        b"left" | b"start" => &mut border.left,
                        b"right" | b"end" => &mut border.right,
                        b"top" => &mut border.top,
                        _ => &mut border.bottom,
                    };
                    if style.is_some() {
                        *slot = style;
                    }
                }
            }

            b"xf" if self.in_cell_xfs => self.xfs.push(xf_def(e)),
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"numFmts" => self.in_num_fmts = false,
            b"fonts" => self.in_fonts = false,
            b"fills" => self.in_fills = false,
            b"borders" => self.in_borders = false,
            b"cellXfs" => self.in_cell_xfs = false,
            b"font" => {
                if let Some(font) = self.current_font.take() {
                    self.fonts.push(font);
                }
            }
            b"fill" => {
                if let Some(fill) = self.current_fill.take() {
                    self.fills.push(fill);
                }
            }
            b"border" => {
                if let Some(border) = self.current_border.take() {
                    self.borders.push(border);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> StyleTable {
        let styles = self
            .xfs
            .iter()
            .map(|xf| {
                resolve_compact_style(xf, &self.num_fmts, &self.fonts, &self.fills, &self.borders)
            })
            .collect();
        StyleTable { styles }
    }
}

/// Resolved style table: style index -> compact style.
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    styles: Vec<CompactStyle>,
}

impl StyleTable {
    /// Parse styles from `xl/styles.xml` content.
    ///
    /// Malformed XML stops the scan; everything read up to that point is
    /// kept and the remaining indices resolve to the default style.
    pub fn parse(xml: &str) -> Self {
        let mut builder = StylesBuilder::default();
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => builder.start(e, false),
                Ok(Event::Empty(ref e)) => builder.start(e, true),
                Ok(Event::End(ref e)) => builder.end(e.local_name().as_ref()),
                Ok(Event::Eof) => break,
                Err(err) => {
                    log::warn!("styles part is malformed, keeping what was read: {}", err);
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        builder.finish()
    }

    /// Compact style for a style index.
    ///
    /// Out-of-range indices and all-default styles yield `None`.
    pub fn get(&self, index: usize) -> Option<&CompactStyle> {
        self.styles.get(index).filter(|s| !s.is_empty())
    }

    /// Number of entries in the cell format table.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

fn xf_def(e: &BytesStart) -> XfDef {
    let index = |key: &[u8]| attr(e, key).and_then(|v| v.parse::<usize>().ok());
    XfDef {
        num_fmt_id: attr(e, b"numFmtId")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        font_id: index(b"fontId"),
        fill_id: index(b"fillId"),
        border_id: index(b"borderId"),
    }
}

fn color_value(e: &BytesStart) -> Option<String> {
    if let Some(rgb) = attr(e, b"rgb") {
        return Some(rgb);
    }
    if let Some(theme) = attr(e, b"theme") {
        return Some(format!("theme:{}", theme));
    }
    attr(e, b"indexed").map(|i| format!("indexed:{}", i))
}

/// Resolve a number format id into its format code, `None` for General.
fn resolve_num_fmt(id: u32, num_fmts: &HashMap<u32, String>) -> Option<String> {
    if id == 0 {
        return None;
    }
    let code = match num_fmts.get(&id) {
        Some(code) => code.clone(),
        None => builtin_format_code(id)
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string()),
    };
    (!code.eq_ignore_ascii_case("General")).then_some(code)
}

/// Keep only the facets of one cell format that differ from the defaults.
fn resolve_compact_style(
    xf: &XfDef,
    num_fmts: &HashMap<u32, String>,
    fonts: &[FontDef],
    fills: &[FillDef],
    borders: &[BorderStyle],
) -> CompactStyle {
    let fill = xf
        .fill_id
        .and_then(|i| fills.get(i))
        .and_then(|f| {
            let pattern = f.pattern.as_deref().unwrap_or("none");
            (pattern != "none").then(|| FillStyle {
                pattern: pattern.to_string(),
                color: f.color.clone(),
            })
        });

    let border = xf
        .border_id
        .and_then(|i| borders.get(i))
        .filter(|b| !b.is_empty())
        .cloned();

    let font = xf
        .font_id
        .and_then(|i| fonts.get(i))
        .filter(|f| f.bold || f.italic)
        .map(|f| FontStyle {
            bold: f.bold,
            italic: f.italic,
            name: f.name.clone(),
        });

    CompactStyle {
        fill,
        border,
        num_fmt: resolve_num_fmt(xf.num_fmt_id, num_fmts),
        font,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1">
    <numFmt numFmtId="164" formatCode="&quot;$&quot;#,##0.00"/>
  </numFmts>
  <fonts count="3">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><sz val="11"/><name val="Calibri"/></font>
    <font><b val="0"/><i/><name val="Arial"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left/><right/><top style="thin"><color auto="1"/></top><bottom style="double"/></border>
  </borders>
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="1" fillId="2" borderId="1"/>
  </cellStyleXfs>
  <cellXfs count="6">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/>
    <xf numFmtId="164" fontId="0" fillId="2" borderId="1" xfId="0"/>
    <xf numFmtId="10" fontId="2" fillId="0" borderId="0" xfId="0"><alignment horizontal="center"/></xf>
    <xf numFmtId="0" fontId="99" fillId="99" borderId="99" xfId="0"/>
    <xf numFmtId="200" fontId="0" fillId="0" borderId="0" xfId="0"/>
  </cellXfs>
  <dxfs count="1">
    <dxf><font><b/></font><fill><patternFill><bgColor rgb="FFFF0000"/></patternFill></fill></dxf>
  </dxfs>
</styleSheet>"#;

    #[test]
    fn test_default_style_is_omitted() {
        let table = StyleTable::parse(STYLES_XML);
        assert_eq!(table.len(), 6);
        assert!(table.get(0).is_none());
    }

    #[test]
    fn test_bold_font_facet() {
        let table = StyleTable::parse(STYLES_XML);
        let style = table.get(1).unwrap();
        let font = style.font.as_ref().unwrap();
        assert!(font.bold);
        assert!(!font.italic);
        assert_eq!(font.name.as_deref(), Some("Calibri"));
        assert!(style.fill.is_none());
        assert!(style.border.is_none());
        assert!(style.num_fmt.is_none());
    }

    #[test]
    fn test_fill_border_and_custom_format() {
        let table = StyleTable::parse(STYLES_XML);
        let style = table.get(2).unwrap();
        assert_eq!(style.num_fmt.as_deref(), Some("\"$\"#,##0.00"));

        let fill = style.fill.as_ref().unwrap();
        assert_eq!(fill.pattern, "solid");
        assert_eq!(fill.color.as_deref(), Some("FFFFFF00"));

        let border = style.border.as_ref().unwrap();
        assert_eq!(border.top.as_deref(), Some("thin"));
        assert_eq!(border.bottom.as_deref(), Some("double"));
        assert!(border.left.is_none());
        assert!(style.font.is_none());
    }

    #[test]
    fn test_builtin_format_and_italic_only() {
        let table = StyleTable::parse(STYLES_XML);
        let style = table.get(3).unwrap();
        assert_eq!(style.num_fmt.as_deref(), Some("0.00%"));
        let font = style.font.as_ref().unwrap();
        assert!(!font.bold);
        assert!(font.italic);
    }

    #[test]
    fn test_dangling_references_resolve_to_default() {
        let table = StyleTable::parse(STYLES_XML);
        assert!(table.get(4).is_none());
    }

    #[test]
    fn test_unknown_format_id_kept_as_number() {
        let table = StyleTable::parse(STYLES_XML);
        assert_eq!(table.get(5).unwrap().num_fmt.as_deref(), Some("200"));
    }

    #[test]
    fn test_out_of_range_index_is_empty() {
        let table = StyleTable::parse(STYLES_XML);
        for index in [6, 7, 100, usize::MAX] {
            assert!(table.get(index).is_none());
        }
        assert!(StyleTable::default().get(0).is_none());
    }

    #[test]
    fn test_malformed_styles_do_not_panic() {
        let table = StyleTable::parse("<styleSheet><cellXfs><xf numFmtId=\"4\"/></oops>");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().num_fmt.as_deref(), Some("#,##0.00"));
    }

    #[test]
    fn test_general_custom_code_is_default() {
        let xml = r#"<styleSheet><numFmts><numFmt numFmtId="165" formatCode="General"/></numFmts>
<cellXfs><xf numFmtId="165"/></cellXfs></styleSheet>"#;
        assert!(StyleTable::parse(xml).get(0).is_none());
    }
}
