//! Pivot table part decoding.

use super::xml::attr;
use crate::container::Package;
use crate::error::{Error, Result};
use crate::model::{DataField, Decoded, PivotDetails};
use crate::rels::{rel_type, Relationships};
use quick_xml::events::{BytesStart, Event};

const UNKNOWN_FIELD: &str = "Unknown Field";

/// Names of the fields declared in a pivot cache definition, in order.
pub fn parse_cache_field_names(xml: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"cacheField" =>
            {
                names.push(attr(e, b"name").unwrap_or_else(|| UNKNOWN_FIELD.to_string()));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(names)
}

#[derive(Debug, Default)]
struct PivotBuilder {
    details: PivotDetails,
    /// Names declared on `pivotField` elements; `None` when unnamed
    pivot_fields: Vec<Option<String>>,
    row_indices: Vec<i64>,
    col_indices: Vec<i64>,
    in_row_fields: bool,
    in_col_fields: bool,
}

impl PivotBuilder {
    fn start(&mut self, e: &BytesStart) {
        match e.local_name().as_ref() {
            b"pivotTableDefinition" => self.details.name = attr(e, b"name"),
            b"location" => self.details.location_range = attr(e, b"ref").unwrap_or_default(),
            b"pivotField" => self.pivot_fields.push(attr(e, b"name")),
            b"rowFields" => self.in_row_fields = true,
            b"colFields" => self.in_col_fields = true,
            b"field" => {
                if let Some(x) = attr(e, b"x").and_then(|x| x.parse().ok()) {
                    if self.in_row_fields {
                        self.row_indices.push(x);
                    } else if self.in_col_fields {
                        self.col_indices.push(x);
                    }
                }
            }
            b"dataField" => self.details.data_fields.push(DataField {
                name: attr(e, b"name"),
                source_field: attr(e, b"fld").and_then(|f| f.parse().ok()),
                source_field_name: None,
                aggregation: attr(e, b"subtotal").unwrap_or_else(|| "sum".to_string()),
            }),
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"rowFields" => self.in_row_fields = false,
            b"colFields" => self.in_col_fields = false,
            _ => {}
        }
    }

    /// Resolve field indices into names.
    ///
    /// The lookup spans the pivot's own field list, or the cache's when the
    /// pivot declares none. Indices outside it (including the `-2` values
    /// pseudo-field) are skipped.
    fn finish(mut self, cache_names: &[String]) -> PivotDetails {
        let count = if self.pivot_fields.is_empty() {
            cache_names.len()
        } else {
            self.pivot_fields.len()
        };
        let lookup: Vec<String> = (0..count)
            .map(|i| {
                self.pivot_fields
                    .get(i)
                    .cloned()
                    .flatten()
                    .or_else(|| cache_names.get(i).cloned())
                    .unwrap_or_else(|| UNKNOWN_FIELD.to_string())
            })
            .collect();

        let names = |indices: &[i64]| -> Vec<String> {
            indices
                .iter()
                .filter_map(|&i| usize::try_from(i).ok())
                .filter_map(|i| lookup.get(i).cloned())
                .collect()
        };
        self.details.row_fields = names(&self.row_indices);
        self.details.col_fields = names(&self.col_indices);

        for field in &mut self.details.data_fields {
            field.source_field_name = field
                .source_field
                .and_then(|i| lookup.get(i as usize).cloned());
        }

        self.details
    }
}

/// Parse a pivot table part. `cache_names` backs fields the pivot leaves
/// unnamed.
pub fn parse_pivot_table_xml(xml: &str, cache_names: &[String]) -> Result<PivotDetails> {
    let mut builder = PivotBuilder::default();
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => builder.start(e),
            Ok(Event::Empty(ref e)) => {
                builder.start(e);
                builder.end(e.local_name().as_ref());
            }
            Ok(Event::End(ref e)) => builder.end(e.local_name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(builder.finish(cache_names))
}

/// Field names from the cache definition linked to the pivot at `path`.
fn load_cache_names(package: &Package, path: &str) -> Vec<String> {
    let rels = Relationships::load(package, path);
    let Some(cache_path) = rels.first_path_of_type(rel_type::PIVOT_CACHE_DEFINITION) else {
        return Vec::new();
    };

    match package
        .read_xml(cache_path)
        .and_then(|xml| parse_cache_field_names(&xml))
    {
        Ok(names) => names,
        Err(e) => {
            log::warn!("ignoring pivot cache {}: {}", cache_path, e);
            Vec::new()
        }
    }
}

/// Decode the pivot table part at `path`.
pub fn decode_pivot(package: &Package, path: &str) -> Decoded<PivotDetails> {
    let xml = match package.read_xml(path) {
        Ok(xml) => xml,
        Err(Error::MissingPart(_)) => {
            log::warn!("pivot table part {} is missing", path);
            return Decoded::Missing {
                missing: path.to_string(),
            };
        }
        Err(e) => {
            log::warn!("pivot table part {} is unreadable: {}", path, e);
            return Decoded::Failed {
                error: e.to_string(),
            };
        }
    };

    let cache_names = load_cache_names(package, path);
    match parse_pivot_table_xml(&xml, &cache_names) {
        Ok(details) => {
            log::debug!(
                "decoded pivot table {} ({} data fields)",
                path,
                details.data_fields.len()
            );
            Decoded::Parsed(details)
        }
        Err(e) => {
            log::warn!("failed to parse pivot table {}: {}", path, e);
            Decoded::Failed {
                error: format!("Failed to parse pivot table XML: {}", e),
            }
        }
    }
}
