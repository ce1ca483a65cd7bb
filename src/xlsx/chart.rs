//! Chart part decoding.
//!
//! A chart part may combine several plot-area blocks (e.g. a bar block and a
//! line block). Every series records the block it came from, since the kind
//! is not global in a combination chart.

use super::xml::{attr, text};
use crate::container::Package;
use crate::error::{Error, Result};
use crate::model::{Axis, AxisKind, ChartDetails, ChartKind, Decoded, Series};
use quick_xml::events::{BytesStart, Event};

fn axis_kind(name: &[u8]) -> Option<AxisKind> {
    match name {
        b"valAx" => Some(AxisKind::Val),
        b"catAx" => Some(AxisKind::Cat),
        b"dateAx" => Some(AxisKind::Date),
        _ => None,
    }
}

/// Title text collected from either a string reference or rich text.
#[derive(Debug, Default)]
struct TitleText {
    literal: Option<String>,
    formula: Option<String>,
    rich: String,
}

impl TitleText {
    fn push(&mut self, leaf: &[u8], value: String) {
        match leaf {
            b"v" => {
                self.literal.get_or_insert(value);
            }
            b"f" => {
                self.formula.get_or_insert(value);
            }
            b"t" => self.rich.push_str(&value),
            _ => {}
        }
    }

    fn finish(self) -> (Option<String>, Option<String>) {
        let text = self
            .literal
            .or_else(|| (!self.rich.is_empty()).then_some(self.rich));
        (text, self.formula)
    }
}

#[derive(Debug)]
struct SeriesBuilder {
    kind: ChartKind,
    name_literal: Option<String>,
    name_formula: Option<String>,
    values: Option<String>,
    categories: Option<String>,
    y_values: Option<String>,
    x_values: Option<String>,
}

impl SeriesBuilder {
    fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            name_literal: None,
            name_formula: None,
            values: None,
            categories: None,
            y_values: None,
            x_values: None,
        }
    }

    fn push(&mut self, section: &[u8], leaf: &[u8], value: String) {
        let slot = match (section, leaf) {
            (b"tx", b"v") => &mut self.name_literal,
            (b"tx", b"f") => &mut self.name_formula,
            (b"val", b"f") => &mut self.values,
            (b"cat", b"f") => &mut self.categories,
            (b"yVal", b"f") => &mut self.y_values,
            (b"xVal", b"f") => &mut self.x_values,
            _ => return,
        };
        slot.get_or_insert(value);
    }

    fn finish(self) -> Series {
        let name = self
            .name_literal
            .filter(|n| !n.is_empty())
            .or(self.name_formula)
            .unwrap_or_else(|| "Series".to_string());
        // Scatter and bubble series use xVal/yVal instead of cat/val.
        Series {
            name,
            value_range: self.values.or(self.y_values).unwrap_or_default(),
            category_range: self.categories.or(self.x_values).unwrap_or_default(),
            kind: self.kind,
        }
    }
}

#[derive(Debug)]
struct AxisBuilder {
    id: Option<String>,
    axis: Axis,
    title: TitleText,
}

#[derive(Debug, Default)]
struct ChartBuilder {
    details: ChartDetails,
    stack: Vec<Vec<u8>>,
    current_kind: Option<ChartKind>,
    series: Option<SeriesBuilder>,
    axis: Option<AxisBuilder>,
    title: TitleText,
}

impl ChartBuilder {
    fn in_plot_area(&self) -> bool {
        self.stack.iter().any(|n| n == b"plotArea")
    }

    fn parent(&self) -> &[u8] {
        self.stack.last().map(Vec::as_slice).unwrap_or_default()
    }

    fn start(&mut self, e: &BytesStart) {
        let name = e.local_name();
        let name = name.as_ref();

        if let Some(kind) = ChartKind::from_block_name(name) {
            if self.in_plot_area() {
                self.current_kind = Some(kind);
                if !self.details.types.contains(&kind) {
                    self.details.types.push(kind);
                }
            }
            return;
        }

        if let Some(kind) = axis_kind(name) {
            if self.in_plot_area() {
                self.axis = Some(AxisBuilder {
                    id: None,
                    axis: Axis::new(kind),
                    title: TitleText::default(),
                });
            }
            return;
        }

        match name {
            b"ser" => {
                if let Some(kind) = self.current_kind {
                    self.series = Some(SeriesBuilder::new(kind));
                }
            }
            b"axId" if axis_kind(self.parent()).is_some() => {
                if let Some(axis) = self.axis.as_mut() {
                    axis.id = attr(e, b"val");
                }
            }
            b"min" | b"max" | b"orientation" if self.parent() == b"scaling" => {
                if let (Some(axis), Some(val)) = (self.axis.as_mut(), attr(e, b"val")) {
                    match name {
                        b"min" => axis.axis.min = val,
                        b"max" => axis.axis.max = val,
                        _ => axis.axis.orientation = val,
                    }
                }
            }
            b"majorUnit" if axis_kind(self.parent()).is_some() => {
                if let (Some(axis), Some(val)) = (self.axis.as_mut(), attr(e, b"val")) {
                    axis.axis.major_unit = val;
                }
            }
            b"legend" => {
                self.details
                    .legend_position
                    .get_or_insert_with(|| "r".to_string());
            }
            b"legendPos" if self.parent() == b"legend" => {
                self.details.legend_position = Some(attr(e, b"val").unwrap_or_else(|| "r".to_string()));
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        if ChartKind::from_block_name(name).is_some() {
            self.current_kind = None;
            return;
        }

        if axis_kind(name).is_some() {
            if let Some(mut builder) = self.axis.take() {
                let (title, title_formula) = builder.title.finish();
                builder.axis.title = title;
                builder.axis.title_formula = title_formula;
                let id = builder.id.unwrap_or_else(|| "Unknown".to_string());
                self.details.axes.insert(id, builder.axis);
            }
            return;
        }

        if name == b"ser" {
            if let Some(series) = self.series.take() {
                self.details.series.push(series.finish());
            }
        }
    }

    fn text(&mut self, value: String) {
        let Some(leaf) = self.stack.last() else {
            return;
        };

        if let Some(i) = self.stack.iter().rposition(|n| n == b"title") {
            let owner = if i > 0 { self.stack[i - 1].as_slice() } else { &[] };
            if owner == b"chart" {
                self.title.push(leaf, value);
            } else if axis_kind(owner).is_some() {
                if let Some(axis) = self.axis.as_mut() {
                    axis.title.push(leaf, value);
                }
            }
            return;
        }

        if let Some(series) = self.series.as_mut() {
            if let Some(i) = self.stack.iter().rposition(|n| n == b"ser") {
                if let Some(section) = self.stack.get(i + 1) {
                    series.push(section, leaf, value);
                }
            }
        }
    }

    fn finish(mut self) -> ChartDetails {
        let (title, title_formula) = std::mem::take(&mut self.title).finish();
        self.details.title = title;
        self.details.title_formula = title_formula;
        self.details
    }
}

/// Parse a chart part into its details.
pub fn parse_chart_xml(xml: &str) -> Result<ChartDetails> {
    let mut builder = ChartBuilder::default();
    let mut reader = quick_xml::Reader::from_str(xml);
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
            Ok(Event::Text(ref e)) => builder.text(text(e)),
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(builder.finish())
}

/// Decode the chart part at `path`.
///
/// Never fails: a missing part or malformed XML is reported on the returned
/// value so sibling charts keep decoding.
pub fn decode_chart(package: &Package, path: &str) -> Decoded<ChartDetails> {
    let xml = match package.read_xml(path) {
        Ok(xml) => xml,
        Err(Error::MissingPart(_)) => {
            log::warn!("chart part {} is missing", path);
            return Decoded::Missing {
                missing: path.to_string(),
            };
        }
        Err(e) => {
            log::warn!("chart part {} is unreadable: {}", path, e);
            return Decoded::Failed {
                error: e.to_string(),
            };
        }
    };

    match parse_chart_xml(&xml) {
        Ok(details) => {
            log::debug!("decoded chart {} ({} series)", path, details.series.len());
            Decoded::Parsed(details)
        }
        Err(e) => {
            log::warn!("failed to parse chart {}: {}", path, e);
            Decoded::Failed {
                error: format!("Failed to parse chart XML: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const COMBO_CHART: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<c:chartSpace xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <c:chart>
    <c:title>
      <c:tx><c:rich><a:bodyPr/><a:p><a:r><a:t>Revenue vs </a:t></a:r><a:r><a:t>Margin</a:t></a:r></a:p></c:rich></c:tx>
    </c:title>
    <c:plotArea>
      <c:barChart>
        <c:barDir val="col"/>
        <c:ser>
          <c:idx val="0"/>
          <c:tx><c:strRef><c:f>Data!$B$1</c:f><c:strCache><c:pt idx="0"><c:v>Revenue</c:v></c:pt></c:strCache></c:strRef></c:tx>
          <c:cat><c:strRef><c:f>Data!$A$2:$A$5</c:f></c:strRef></c:cat>
          <c:val><c:numRef><c:f>Data!$B$2:$B$5</c:f><c:numCache><c:pt idx="0"><c:v>10</c:v></c:pt></c:numCache></c:numRef></c:val>
        </c:ser>
        <c:axId val="111"/>
        <c:axId val="222"/>
      </c:barChart>
      <c:lineChart>
        <c:ser>
          <c:tx><c:strRef><c:f>Data!$C$1</c:f></c:strRef></c:tx>
          <c:val><c:numRef><c:f>Data!$C$2:$C$5</c:f></c:numRef></c:val>
        </c:ser>
        <c:axId val="111"/>
        <c:axId val="222"/>
      </c:lineChart>
      <c:catAx>
        <c:axId val="111"/>
        <c:scaling><c:orientation val="minMax"/></c:scaling>
        <c:crossAx val="222"/>
      </c:catAx>
      <c:valAx>
        <c:axId val="222"/>
        <c:scaling><c:orientation val="maxMin"/><c:max val="100"/><c:min val="0"/></c:scaling>
        <c:title><c:tx><c:rich><a:p><a:r><a:t>Dollars</a:t></a:r></a:p></c:rich></c:tx></c:title>
        <c:majorUnit val="25"/>
        <c:crossAx val="111"/>
      </c:valAx>
    </c:plotArea>
    <c:legend><c:legendPos val="b"/></c:legend>
  </c:chart>
</c:chartSpace>"#;

    #[test]
    fn test_combination_chart_kinds() {
        let chart = parse_chart_xml(COMBO_CHART).unwrap();
        assert_eq!(chart.types, vec![ChartKind::Bar, ChartKind::Line]);
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].kind, ChartKind::Bar);
        assert_eq!(chart.series[1].kind, ChartKind::Line);
    }

    #[test]
    fn test_series_names_and_ranges() {
        let chart = parse_chart_xml(COMBO_CHART).unwrap();
        let bar = &chart.series[0];
        assert_eq!(bar.name, "Revenue");
        assert_eq!(bar.value_range, "Data!$B$2:$B$5");
        assert_eq!(bar.category_range, "Data!$A$2:$A$5");

        // Formula-bound name without a cached literal
        let line = &chart.series[1];
        assert_eq!(line.name, "Data!$C$1");
        assert_eq!(line.category_range, "");
    }

    #[test]
    fn test_titles_and_axes() {
        let chart = parse_chart_xml(COMBO_CHART).unwrap();
        assert_eq!(chart.title.as_deref(), Some("Revenue vs Margin"));
        assert_eq!(chart.title_formula, None);
        assert_eq!(chart.legend_position.as_deref(), Some("b"));

        let cat = &chart.axes["111"];
        assert_eq!(cat.kind, AxisKind::Cat);
        assert_eq!(cat.min, "auto");
        assert_eq!(cat.max, "auto");
        assert_eq!(cat.major_unit, "auto");
        assert_eq!(cat.title, None);

        let val = &chart.axes["222"];
        assert_eq!(val.kind, AxisKind::Val);
        assert_eq!(val.min, "0");
        assert_eq!(val.max, "100");
        assert_eq!(val.orientation, "maxMin");
        assert_eq!(val.major_unit, "25");
        assert_eq!(val.title.as_deref(), Some("Dollars"));
    }

    #[test]
    fn test_rich_title_keeps_run_spacing() {
        let xml = r#"<c:chartSpace xmlns:c="c" xmlns:a="a">
  <c:chart>
    <c:title>
      <c:tx>
        <c:rich>
          <a:p>
            <a:r><a:t>Sales </a:t></a:r>
            <a:r><a:t>2024</a:t></a:r>
          </a:p>
        </c:rich>
      </c:tx>
    </c:title>
    <c:plotArea>
      <c:lineChart><c:ser><c:tx><c:v>Units</c:v></c:tx></c:ser></c:lineChart>
      <c:valAx>
        <c:axId val="9"/>
        <c:title><c:tx><c:rich><a:p><a:r><a:t>Units </a:t></a:r><a:r><a:t>sold</a:t></a:r></a:p></c:rich></c:tx></c:title>
      </c:valAx>
    </c:plotArea>
  </c:chart>
</c:chartSpace>"#;
        let chart = parse_chart_xml(xml).unwrap();
        assert_eq!(chart.title.as_deref(), Some("Sales 2024"));
        assert_eq!(chart.axes["9"].title.as_deref(), Some("Units sold"));
        assert_eq!(chart.series[0].name, "Units");
    }

    #[test]
    fn test_scatter_falls_back_to_xy_ranges() {
        let xml = r#"<c:chartSpace xmlns:c="c"><c:chart>
  <c:title><c:tx><c:strRef><c:f>Sheet1!$A$1</c:f><c:strCache><c:pt idx="0"><c:v>Growth</c:v></c:pt></c:strCache></c:strRef></c:tx></c:title>
  <c:plotArea><c:scatterChart><c:ser>
    <c:tx><c:v>Trend</c:v></c:tx>
    <c:xVal><c:numRef><c:f>Sheet1!$A$2:$A$9</c:f></c:numRef></c:xVal>
    <c:yVal><c:numRef><c:f>Sheet1!$B$2:$B$9</c:f></c:numRef></c:yVal>
  </c:ser></c:scatterChart></c:plotArea>
  <c:legend/>
</c:chart></c:chartSpace>"#;

        let chart = parse_chart_xml(xml).unwrap();
        assert_eq!(chart.types, vec![ChartKind::Scatter]);
        assert_eq!(chart.title.as_deref(), Some("Growth"));
        assert_eq!(chart.title_formula.as_deref(), Some("Sheet1!$A$1"));
        assert_eq!(chart.legend_position.as_deref(), Some("r"));

        let series = &chart.series[0];
        assert_eq!(series.name, "Trend");
        assert_eq!(series.value_range, "Sheet1!$B$2:$B$9");
        assert_eq!(series.category_range, "Sheet1!$A$2:$A$9");
        assert_eq!(series.kind, ChartKind::Scatter);
    }

    #[test]
    fn test_unnamed_series_and_no_legend() {
        let xml = r#"<c:chartSpace xmlns:c="c"><c:chart><c:plotArea><c:pieChart><c:ser>
<c:val><c:numRef><c:f>S!$B$2:$B$4</c:f></c:numRef></c:val></c:ser></c:pieChart></c:plotArea></c:chart></c:chartSpace>"#;
        let chart = parse_chart_xml(xml).unwrap();
        assert_eq!(chart.series[0].name, "Series");
        assert_eq!(chart.legend_position, None);
        assert_eq!(chart.title, None);
        assert!(chart.axes.is_empty());
    }

    #[test]
    fn test_malformed_chart_is_error() {
        let xml = r#"<c:chartSpace xmlns:c="c"><c:chart><c:plotArea></c:chart>"#;
        assert!(matches!(parse_chart_xml(xml), Err(Error::XmlParse(_))));
    }

    #[test]
    fn test_decode_chart_outcomes() {
        let package = Package::from_parts([
            ("xl/charts/chart1.xml", COMBO_CHART.as_bytes().to_vec()),
            ("xl/charts/chart2.xml", b"<c:chartSpace><c:chart></c:oops>".to_vec()),
        ]);

        assert!(decode_chart(&package, "xl/charts/chart1.xml").parsed().is_some());
        assert!(matches!(
            decode_chart(&package, "xl/charts/chart2.xml"),
            Decoded::Failed { .. }
        ));
        assert_eq!(
            decode_chart(&package, "xl/charts/chart3.xml"),
            Decoded::Missing {
                missing: "xl/charts/chart3.xml".to_string()
            }
        );
    }
}
