//! Relationship (`.rels`) parsing and target resolution.
//!
//! Every part may own a side-file at `<dir>/_rels/<file>.rels`. Targets in it
//! are relative to the owning part's directory, so `../charts/chart1.xml`
//! referenced from `xl/drawings/drawing1.xml` lands on `xl/charts/chart1.xml`
//! no matter which drawing referenced it.

use crate::container::Package;
use crate::error::{Error, Result};
use quick_xml::events::Event;
use std::collections::HashMap;

/// Relationship type suffixes used by the decoder.
pub mod rel_type {
    pub const OFFICE_DOCUMENT: &str = "/officeDocument";
    pub const SHARED_STRINGS: &str = "/sharedStrings";
    pub const STYLES: &str = "/styles";
    pub const CHART: &str = "/chart";
    pub const PIVOT_TABLE: &str = "/pivotTable";
    pub const PIVOT_CACHE_DEFINITION: &str = "/pivotCacheDefinition";
}

/// A relationship entry from a .rels file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target exactly as written in the side-file
    pub target: String,
    /// Package-absolute path of the target; `None` for external targets
    pub path: Option<String>,
    /// Whether the target is external
    pub external: bool,
}

impl Relationship {
    /// Whether the type URI ends with the given suffix (e.g. `/pivotTable`).
    pub fn is_type(&self, suffix: &str) -> bool {
        self.rel_type.ends_with(suffix)
    }
}

/// Relationships owned by one part.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    entries: Vec<Relationship>,
    by_id: HashMap<String, usize>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the relationships owned by `part_path`.
    ///
    /// A missing side-file is not an error and yields an empty collection, as
    /// does a malformed one (logged).
    pub fn load(package: &Package, part_path: &str) -> Self {
        let rels_path = rels_path_for(part_path);
        let xml = match package.read_xml(&rels_path) {
            Ok(xml) => xml,
            Err(_) => return Self::new(),
        };

        match Self::parse(&xml, part_path) {
            Ok(rels) => rels,
            Err(e) => {
                log::warn!("ignoring malformed relationships {}: {}", rels_path, e);
                Self::new()
            }
        }
    }

    /// Parse a side-file, resolving targets against `owner_part`.
    pub fn parse(xml: &str, owner_part: &str) -> Result<Self> {
        let mut rels = Self::new();
        if xml.trim().is_empty() {
            return Ok(rels);
        }

        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let mut id = String::new();
                    let mut rel_type = String::new();
                    let mut target = String::new();
                    let mut external = false;

                    for attr in e.attributes().flatten() {
                        let value = attr.unescape_value()?.to_string();
                        match attr.key.as_ref() {
                            b"Id" => id = value,
                            b"Type" => rel_type = value,
                            b"Target" => target = value,
                            b"TargetMode" => external = value.eq_ignore_ascii_case("external"),
                            _ => {}
                        }
                    }

                    if !id.is_empty() {
                        let path = (!external).then(|| resolve_path(owner_part, &target));
                        rels.add(Relationship {
                            id,
                            rel_type,
                            target,
                            path,
                            external,
                        });
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::XmlParse(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Add a relationship. A repeated id keeps the first entry.
    pub fn add(&mut self, rel: Relationship) {
        if self.by_id.contains_key(&rel.id) {
            return;
        }
        self.by_id.insert(rel.id.clone(), self.entries.len());
        self.entries.push(rel);
    }

    /// Get a relationship by ID.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    /// Resolved package path for a relationship ID.
    pub fn target_path(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(|r| r.path.as_deref())
    }

    /// Relationships whose type ends with `suffix`, in side-file order.
    pub fn of_type<'a>(&'a self, suffix: &'a str) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.entries.iter().filter(move |r| r.is_type(suffix))
    }

    /// Resolved path of the first relationship of the given type.
    pub fn first_path_of_type<'a>(&'a self, suffix: &'a str) -> Option<&'a str> {
        self.of_type(suffix).find_map(|r| r.path.as_deref())
    }

    /// All relationships in side-file order.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Path of the `.rels` side-file owned by `part_path`.
///
/// The package root (empty path or `/`) owns `_rels/.rels`.
pub fn rels_path_for(part_path: &str) -> String {
    let part_path = part_path.trim_start_matches('/');
    if part_path.is_empty() {
        return "_rels/.rels".to_string();
    }
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part_path),
    }
}

/// Resolve a relationship target against the part that owns it.
///
/// Absolute targets (`/xl/...`) are taken from the package root; relative
/// targets start from the owner's directory with `..` popping one segment.
pub fn resolve_path(owner_part: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    if let Some(stripped) = target.strip_prefix('/') {
        return normalize_segments(Vec::new(), stripped);
    }

    let owner = owner_part.trim_start_matches('/');
    let base: Vec<&str> = match owner.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').filter(|s| !s.is_empty()).collect(),
        None => Vec::new(),
    };
    normalize_segments(base, &target)
}

fn normalize_segments<'a>(mut segments: Vec<&'a str>, relative: &'a str) -> String {
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
