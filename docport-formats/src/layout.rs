//! On-disk layout rules shared by the directory and ZIP backends.
//!
//! Ordinary documents live under `docs/`, design documents (ids starting
//! with `_design/`) under `design_docs/`. Filenames are derived from the id
//! with path separators replaced, so a filename never escapes its subtree.
//!
//! In expanded mode a document becomes a small directory tree instead of a
//! single `.json` file: one entry per top-level key, recursively — object
//! values turn into subdirectories, everything else into `<key>.json`.

use docport_api::{DESIGN_PREFIX, Error, Record, Result};
use serde_json::{Map, Value};

/// Subtree for ordinary documents.
pub const DOCS_DIR: &str = "docs";
/// Subtree for design documents.
pub const DESIGN_DOCS_DIR: &str = "design_docs";

/// The two subtrees of the on-disk layout, in read order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subtree {
    Docs,
    DesignDocs,
}

impl Subtree {
    pub fn dir_name(self) -> &'static str {
        match self {
            Subtree::Docs => DOCS_DIR,
            Subtree::DesignDocs => DESIGN_DOCS_DIR,
        }
    }

    /// Restores a record id from a filename stem read out of this subtree.
    pub fn restore_id(self, stem: &str) -> String {
        match self {
            Subtree::Docs => stem.to_string(),
            Subtree::DesignDocs => format!("{DESIGN_PREFIX}{stem}"),
        }
    }
}

/// Replaces path separators so the result is a single path component
/// that stays inside its subtree.
pub fn mangle(raw: &str) -> String {
    match raw {
        // "." and ".." would walk the tree instead of naming an entry.
        "." => "_".to_string(),
        ".." => "__".to_string(),
        _ => raw.replace(['/', '\\'], "_"),
    }
}

/// Maps a record id to its subtree and mangled file stem.
///
/// The `_design/` prefix is stripped before mangling; the remainder of a
/// design id, like any ordinary id, may itself contain separators.
pub fn route_id(id: &str) -> (Subtree, String) {
    match id.strip_prefix(DESIGN_PREFIX) {
        Some(rest) if !rest.is_empty() => (Subtree::DesignDocs, mangle(rest)),
        _ => (Subtree::Docs, mangle(id)),
    }
}

/// Serializes a document body the way the dir/zip writers store it.
pub fn doc_bytes(record: &Record) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&record.value)?)
}

/// One entry of an expanded (multi-file) document, path relative to the
/// document's own directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatEntry {
    File { path: String, body: Vec<u8> },
    /// Marker for an empty object, which would otherwise leave no trace.
    Dir { path: String },
}

/// Flattens a document body into expanded-mode entries.
///
/// # Errors
///
/// Keys that cannot name a file (`""`, `"."`, `".."`, or containing a path
/// separator) are rejected with [`Error::Destination`]; mangling them would
/// make the expansion unreadable.
pub fn flatten(value: &Map<String, Value>) -> Result<Vec<FlatEntry>> {
    let mut entries = Vec::new();
    flatten_into("", value, &mut entries)?;
    Ok(entries)
}

fn flatten_into(prefix: &str, value: &Map<String, Value>, out: &mut Vec<FlatEntry>) -> Result<()> {
    for (key, val) in value {
        check_expandable_key(key)?;
        match val {
            Value::Object(inner) if inner.is_empty() => out.push(FlatEntry::Dir {
                path: format!("{prefix}{key}"),
            }),
            Value::Object(inner) => flatten_into(&format!("{prefix}{key}/"), inner, out)?,
            other => out.push(FlatEntry::File {
                path: format!("{prefix}{key}.json"),
                body: serde_json::to_vec_pretty(other)?,
            }),
        }
    }
    Ok(())
}

fn check_expandable_key(key: &str) -> Result<()> {
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
        return Err(Error::Destination(format!(
            "key {key:?} cannot be written as an expanded document entry"
        )));
    }
    Ok(())
}

/// Rebuilds a document body from expanded-mode entries.
///
/// `entries` pairs each relative path with its body, or `None` for a
/// directory marker. Paths use `/` separators regardless of platform.
pub fn unflatten<I>(entries: I) -> Result<Map<String, Value>>
where
    I: IntoIterator<Item = (String, Option<Vec<u8>>)>,
{
    let mut root = Map::new();
    for (path, body) in entries {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match body {
            None => {
                descend(&mut root, &segments)?;
            }
            Some(bytes) => {
                let (leaf, dirs) = segments
                    .split_last()
                    .ok_or_else(|| Error::Source(format!("empty entry path {path:?}")))?;
                let key = leaf.strip_suffix(".json").ok_or_else(|| {
                    Error::Source(format!("expanded entry {path:?} is not a .json file"))
                })?;
                let value: Value = serde_json::from_slice(&bytes)?;
                let slot = descend(&mut root, dirs)?;
                if slot.insert(key.to_string(), value).is_some() {
                    return Err(Error::Source(format!(
                        "expanded entry {path:?} is both a file and a directory"
                    )));
                }
            }
        }
    }
    Ok(root)
}

/// Walks (creating) nested objects along `dirs`, returning the innermost.
fn descend<'a>(
    root: &'a mut Map<String, Value>,
    dirs: &[&str],
) -> Result<&'a mut Map<String, Value>> {
    let mut current = root;
    for dir in dirs {
        current = current
            .entry(dir.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| {
                Error::Source(format!("expanded entry {dir:?} is both a file and a directory"))
            })?;
    }
    Ok(current)
}
