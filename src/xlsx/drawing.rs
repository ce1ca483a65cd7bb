//! Drawing part decoding.

use super::chart::decode_chart;
use super::xml::attr;
use crate::container::Package;
use crate::error::{Error, Result};
use crate::model::{Decoded, DrawingObject};
use crate::rels::Relationships;
use quick_xml::events::{BytesStart, Event};

/// An anchored object before chart references are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DrawingEntry {
    Shape(String),
    Connector(String),
    Chart(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeKind {
    Shape,
    Connector,
}

#[derive(Debug, Default)]
struct DrawingBuilder {
    entries: Vec<DrawingEntry>,
    /// Open shape or connector and its name once `cNvPr` is seen
    pending: Option<(ShapeKind, Option<String>)>,
    frame_depth: usize,
}

impl DrawingBuilder {
    fn start(&mut self, e: &BytesStart) {
        match e.local_name().as_ref() {
            b"sp" => self.pending = Some((ShapeKind::Shape, None)),
            b"cxnSp" => self.pending = Some((ShapeKind::Connector, None)),
            b"cNvPr" => {
                if let Some((_, name)) = self.pending.as_mut() {
                    if name.is_none() {
                        *name = Some(attr(e, b"name").unwrap_or_default());
                    }
                }
            }
            b"chart" if self.frame_depth > 0 => {
                if let Some(id) = attr(e, b"id") {
                    self.entries.push(DrawingEntry::Chart(id));
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        if !matches!(name, b"sp" | b"cxnSp") {
            return;
        }
        if let Some((kind, shape_name)) = self.pending.take() {
            let shape_name = shape_name.unwrap_or_default();
            self.entries.push(match kind {
                ShapeKind::Shape => DrawingEntry::Shape(shape_name),
                ShapeKind::Connector => DrawingEntry::Connector(shape_name),
            });
        }
    }
}

fn parse_drawing_xml(xml: &str) -> Result<Vec<DrawingEntry>> {
    let mut builder = DrawingBuilder::default();
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"graphicFrame" {
                    builder.frame_depth += 1;
                }
                builder.start(e);
            }
            Ok(Event::Empty(ref e)) => {
                builder.start(e);
                builder.end(e.local_name().as_ref());
            }
            Ok(Event::End(ref e)) => {
                let name = e.local_name();
                if name.as_ref() == b"graphicFrame" {
                    builder.frame_depth = builder.frame_depth.saturating_sub(1);
                }
                builder.end(name.as_ref());
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(builder.entries)
}

/// Decode the drawing part at `path` into sheet objects, in document order.
///
/// Chart references are resolved through the drawing's own relationships.
/// An unresolvable chart becomes a chart object marked missing; only a
/// missing or malformed drawing part is an error.
pub fn decode_drawing(package: &Package, path: &str) -> Result<Vec<DrawingObject>> {
    let xml = package.read_xml(path)?;
    let entries = parse_drawing_xml(&xml)?;
    let rels = Relationships::load(package, path);

    let objects: Vec<DrawingObject> = entries
        .into_iter()
        .map(|entry| match entry {
            DrawingEntry::Shape(name) => DrawingObject::Shape { name },
            DrawingEntry::Connector(name) => DrawingObject::Connector { name },
            DrawingEntry::Chart(relationship_id) => {
                let details = match rels.target_path(&relationship_id) {
                    Some(chart_path) => decode_chart(package, chart_path),
                    None => {
                        log::warn!(
                            "drawing {} references unknown chart relationship {}",
                            path,
                            relationship_id
                        );
                        Decoded::Missing {
                            missing: relationship_id.clone(),
                        }
                    }
                };
                DrawingObject::Chart {
                    relationship_id,
                    details,
                }
            }
        })
        .collect();

    log::debug!("decoded drawing {} ({} objects)", path, objects.len());
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DRAWING_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart">
  <xdr:twoCellAnchor>
    <xdr:sp macro="" textlink="">
      <xdr:nvSpPr><xdr:cNvPr id="2" name="TextBox 1"/><xdr:cNvSpPr txBox="1"/></xdr:nvSpPr>
    </xdr:sp>
    <xdr:clientData/>
  </xdr:twoCellAnchor>
  <xdr:twoCellAnchor>
    <xdr:graphicFrame macro="">
      <xdr:nvGraphicFramePr><xdr:cNvPr id="3" name="Chart 2"/><xdr:cNvGraphicFramePr/></xdr:nvGraphicFramePr>
      <a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart"><c:chart r:id="rId1"/></a:graphicData></a:graphic>
    </xdr:graphicFrame>
    <xdr:clientData/>
  </xdr:twoCellAnchor>
  <xdr:twoCellAnchor>
    <xdr:cxnSp macro="">
      <xdr:nvCxnSpPr><xdr:cNvPr id="4" name="Straight Arrow Connector 3"/><xdr:cNvCxnSpPr/></xdr:nvCxnSpPr>
    </xdr:cxnSp>
    <xdr:clientData/>
  </xdr:twoCellAnchor>
  <xdr:twoCellAnchor>
    <xdr:graphicFrame macro="">
      <a:graphic><a:graphicData><c:chart r:id="rId9"/></a:graphicData></a:graphic>
    </xdr:graphicFrame>
  </xdr:twoCellAnchor>
</xdr:wsDr>"#;

    const DRAWING_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart" Target="../charts/chart1.xml"/>
</Relationships>"#;

    const CHART_XML: &str = r#"<c:chartSpace xmlns:c="c"><c:chart><c:plotArea><c:pieChart><c:ser>
<c:val><c:numRef><c:f>Data!$B$2:$B$4</c:f></c:numRef></c:val></c:ser></c:pieChart></c:plotArea></c:chart></c:chartSpace>"#;

    #[test]
    fn test_parse_entries_in_document_order() {
        let entries = parse_drawing_xml(DRAWING_XML).unwrap();
        assert_eq!(
            entries,
            vec![
                DrawingEntry::Shape("TextBox 1".to_string()),
                DrawingEntry::Chart("rId1".to_string()),
                DrawingEntry::Connector("Straight Arrow Connector 3".to_string()),
                DrawingEntry::Chart("rId9".to_string()),
            ]
        );
    }

    #[test]
    fn test_decode_drawing_resolves_charts() {
        let package = Package::from_parts([
            ("xl/drawings/drawing1.xml", DRAWING_XML.as_bytes().to_vec()),
            (
                "xl/drawings/_rels/drawing1.xml.rels",
                DRAWING_RELS.as_bytes().to_vec(),
            ),
            ("xl/charts/chart1.xml", CHART_XML.as_bytes().to_vec()),
        ]);

        let objects = decode_drawing(&package, "xl/drawings/drawing1.xml").unwrap();
        assert_eq!(objects.len(), 4);

        match &objects[1] {
            DrawingObject::Chart {
                relationship_id,
                details,
            } => {
                assert_eq!(relationship_id, "rId1");
                let chart = details.parsed().unwrap();
                assert_eq!(chart.series[0].value_range, "Data!$B$2:$B$4");
            }
            other => panic!("expected chart, got {:?}", other),
        }

        match &objects[3] {
            DrawingObject::Chart { details, .. } => {
                assert_eq!(
                    details,
                    &Decoded::Missing {
                        missing: "rId9".to_string()
                    }
                );
            }
            other => panic!("expected chart, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_and_malformed_drawing() {
        let package = Package::from_parts([(
            "xl/drawings/drawing2.xml",
            b"<xdr:wsDr><xdr:sp></xdr:wsDr>".to_vec(),
        )]);
        assert!(matches!(
            decode_drawing(&package, "xl/drawings/drawing1.xml"),
            Err(Error::MissingPart(_))
        ));
        assert!(matches!(
            decode_drawing(&package, "xl/drawings/drawing2.xml"),
            Err(Error::XmlParse(_))
        ));
    }
}
