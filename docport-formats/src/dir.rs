//! Filesystem directory source and destination (`dir://<directory>`).
//!
//! Ordinary documents live under `docs/`, design documents under
//! `design_docs/`, one entry per document named after the mangled id. A
//! plain document is a single `<stem>.json` file; in expanded mode it is a
//! subtree mirroring the value's object structure (see [`crate::layout`]).
//!
//! Readers return `docs/` before `design_docs/`, each sorted by stem, so a
//! directory always replays in the same order. A missing subtree directory
//! means no documents of that kind.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use docport_api::{DocumentReader, DocumentWriter, Record, Result};
use serde_json::{Map, Value};
use tracing::debug;

use crate::layout::{self, FlatEntry, Subtree};

struct Pending {
    subtree: Subtree,
    stem: String,
    path: PathBuf,
    expanded: bool,
}

/// Streams records out of a layout directory.
pub struct DirReader {
    pending: VecDeque<Pending>,
}

impl DirReader {
    /// Scans the subtree listings up front; document bodies are read
    /// lazily as the iteration advances.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut pending = VecDeque::new();
        for subtree in [Subtree::Docs, Subtree::DesignDocs] {
            let base = root.join(subtree.dir_name());
            if !base.is_dir() {
                continue;
            }
            let mut entries = Vec::new();
            for entry in fs::read_dir(&base)? {
                let entry = entry?;
                let path = entry.path();
                let Ok(name) = entry.file_name().into_string() else {
                    continue;
                };
                if path.is_dir() {
                    entries.push(Pending {
                        subtree,
                        stem: name,
                        path,
                        expanded: true,
                    });
                } else if let Some(stem) = name.strip_suffix(".json") {
                    entries.push(Pending {
                        subtree,
                        stem: stem.to_string(),
                        path,
                        expanded: false,
                    });
                } else {
                    debug!(path = %path.display(), "ignoring unrecognized entry");
                }
            }
            entries.sort_by(|a, b| a.stem.cmp(&b.stem));
            pending.extend(entries);
        }
        Ok(Self { pending })
    }
}

impl DocumentReader for DirReader {
    fn next_record(&mut self) -> Result<Option<Record>> {
        let Some(doc) = self.pending.pop_front() else {
            return Ok(None);
        };
        let value: Map<String, Value> = if doc.expanded {
            let mut entries = Vec::new();
            collect_tree(&doc.path, String::new(), &mut entries)?;
            layout::unflatten(entries)?
        } else {
            serde_json::from_slice(&fs::read(&doc.path)?)?
        };
        Record::from_source(doc.subtree.restore_id(&doc.stem), value).map(Some)
    }
}

fn collect_tree(
    dir: &Path,
    prefix: String,
    out: &mut Vec<(String, Option<Vec<u8>>)>,
) -> Result<()> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        children.push((name, entry.path()));
    }
    children.sort();
    for (name, path) in children {
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if path.is_dir() {
            out.push((rel.clone(), None));
            collect_tree(&path, rel, out)?;
        } else {
            out.push((rel, Some(fs::read(&path)?)));
        }
    }
    Ok(())
}

/// Writes records into a layout directory.
pub struct DirWriter {
    root: PathBuf,
    expand: bool,
}

impl DirWriter {
    /// Creates the destination root. Subtree directories appear only once
    /// a document of that kind is written.
    pub fn create(root: impl AsRef<Path>, expand: bool) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root, expand })
    }

    fn write_expanded(&self, dir: &Path, record: &Record) -> Result<()> {
        // Two ids can mangle to the same stem; start from a clean subtree
        // so the later document fully replaces the earlier one.
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        fs::create_dir_all(dir)?;
        for entry in layout::flatten(&record.value)? {
            match entry {
                FlatEntry::File { path, body } => {
                    let full = dir.join(&path);
                    if let Some(parent) = full.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(full, body)?;
                }
                FlatEntry::Dir { path } => fs::create_dir_all(dir.join(&path))?,
            }
        }
        Ok(())
    }
}

impl DocumentWriter for DirWriter {
    fn write(&mut self, record: &Record) -> Result<()> {
        let (subtree, stem) = layout::route_id(&record.id);
        let base = self.root.join(subtree.dir_name());
        fs::create_dir_all(&base)?;
        if self.expand {
            self.write_expanded(&base.join(&stem), record)
        } else {
            fs::write(base.join(format!("{stem}.json")), layout::doc_bytes(record)?)?;
            Ok(())
        }
    }
}
