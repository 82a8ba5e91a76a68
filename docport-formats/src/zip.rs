//! ZIP archive source and destination (`zip://<zipfile>`).
//!
//! The archive holds the same tree a directory destination produces,
//! nested under a top-level folder named after the archive's file stem
//! (`beers.zip` contains `beers/docs/...`). The reader also accepts
//! archives whose subtrees sit at the top level or under a differently
//! named folder.
//!
//! [`ZipWriter::finish`] must be called; the central directory is only
//! written then, and an unfinished archive is unreadable.

use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use docport_api::{DocumentReader, DocumentWriter, Error, Record, Result};
use serde_json::{Map, Value};
use tracing::debug;
use zip::write::SimpleFileOptions;

use crate::layout::{self, DESIGN_DOCS_DIR, DOCS_DIR, FlatEntry, Subtree};

fn zip_err(e: zip::result::ZipError) -> Error {
    Error::Zip(e.to_string())
}

fn rank(subtree: Subtree) -> u8 {
    match subtree {
        Subtree::Docs => 0,
        Subtree::DesignDocs => 1,
    }
}

enum Doc {
    Simple {
        member: String,
    },
    /// Inner paths relative to the document root; `None` members are
    /// directory markers.
    Expanded {
        members: Vec<(String, Option<String>)>,
    },
}

/// Streams records out of a ZIP archive.
pub struct ZipReader {
    archive: zip::ZipArchive<File>,
    pending: VecDeque<(Subtree, String, Doc)>,
}

impl ZipReader {
    /// Indexes the member list up front; bodies are decompressed lazily.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let archive = zip::ZipArchive::new(file).map_err(zip_err)?;
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();

        let mut docs: BTreeMap<(u8, String), Doc> = BTreeMap::new();
        for name in names {
            let is_dir = name.ends_with('/');
            let segments: Vec<&str> = name.split('/').filter(|s| !s.is_empty()).collect();
            let Some((subtree, rest)) = classify(&segments) else {
                debug!(member = %name, "ignoring member outside the document layout");
                continue;
            };
            match rest {
                [] => {}
                [stem] if is_dir => {
                    docs.entry((rank(subtree), (*stem).to_string()))
                        .or_insert_with(|| Doc::Expanded {
                            members: Vec::new(),
                        });
                }
                [leaf] => {
                    let Some(stem) = leaf.strip_suffix(".json") else {
                        debug!(member = %name, "ignoring member outside the document layout");
                        continue;
                    };
                    docs.insert(
                        (rank(subtree), stem.to_string()),
                        Doc::Simple { member: name },
                    );
                }
                [stem, inner @ ..] => {
                    let entry = docs
                        .entry((rank(subtree), (*stem).to_string()))
                        .or_insert_with(|| Doc::Expanded {
                            members: Vec::new(),
                        });
                    if let Doc::Expanded { members } = entry {
                        let rel = inner.join("/");
                        members.push((rel, (!is_dir).then(|| name.clone())));
                    }
                }
            }
        }

        Ok(Self {
            archive,
            pending: docs
                .into_iter()
                .map(|((rank, stem), doc)| {
                    let subtree = if rank == 0 {
                        Subtree::Docs
                    } else {
                        Subtree::DesignDocs
                    };
                    (subtree, stem, doc)
                })
                .collect(),
        })
    }

    fn read_member(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut member = self.archive.by_name(name).map_err(zip_err)?;
        let mut body = Vec::with_capacity(member.size() as usize);
        member.read_to_end(&mut body)?;
        Ok(body)
    }
}

/// Locates the `docs/` or `design_docs/` segment: either leading, or one
/// folder deep for archives with a top-level prefix.
fn classify<'a>(segments: &'a [&'a str]) -> Option<(Subtree, &'a [&'a str])> {
    fn subtree_of(segment: &str) -> Option<Subtree> {
        match segment {
            DOCS_DIR => Some(Subtree::Docs),
            DESIGN_DOCS_DIR => Some(Subtree::DesignDocs),
            _ => None,
        }
    }
    if let [first, rest @ ..] = segments {
        if let Some(subtree) = subtree_of(first) {
            return Some((subtree, rest));
        }
        if let [second, inner @ ..] = rest {
            if let Some(subtree) = subtree_of(second) {
                return Some((subtree, inner));
            }
        }
    }
    None
}

impl DocumentReader for ZipReader {
    fn next_record(&mut self) -> Result<Option<Record>> {
        let Some((subtree, stem, doc)) = self.pending.pop_front() else {
            return Ok(None);
        };
        let value: Map<String, Value> = match doc {
            Doc::Simple { member } => serde_json::from_slice(&self.read_member(&member)?)?,
            Doc::Expanded { mut members } => {
                members.sort();
                let mut entries = Vec::with_capacity(members.len());
                for (rel, member) in members {
                    let body = match member {
                        Some(member) => Some(self.read_member(&member)?),
                        None => None,
                    };
                    entries.push((rel, body));
                }
                layout::unflatten(entries)?
            }
        };
        Record::from_source(subtree.restore_id(&stem), value).map(Some)
    }
}

/// Writes records into a ZIP archive.
pub struct ZipWriter {
    inner: Option<zip::ZipWriter<File>>,
    prefix: String,
    expand: bool,
}

impl ZipWriter {
    /// Creates (truncating) the destination archive.
    pub fn create(path: impl AsRef<Path>, expand: bool) -> Result<Self> {
        let path = path.as_ref();
        let prefix = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Zip(format!(
                    "cannot derive an archive folder name from {}",
                    path.display()
                ))
            })?;
        let file = File::create(path)?;
        Ok(Self {
            inner: Some(zip::ZipWriter::new(file)),
            prefix,
            expand,
        })
    }

    fn inner(&mut self) -> Result<&mut zip::ZipWriter<File>> {
        self.inner
            .as_mut()
            .ok_or_else(|| Error::Zip("archive already finished".to_string()))
    }
}

impl DocumentWriter for ZipWriter {
    fn write(&mut self, record: &Record) -> Result<()> {
        let (subtree, stem) = layout::route_id(&record.id);
        let base = format!("{}/{}/{stem}", self.prefix, subtree.dir_name());
        let options = SimpleFileOptions::default();
        if self.expand {
            let entries = layout::flatten(&record.value)?;
            let zip = self.inner()?;
            zip.add_directory(base.as_str(), options).map_err(zip_err)?;
            for entry in entries {
                match entry {
                    FlatEntry::File { path, body } => {
                        zip.start_file(format!("{base}/{path}"), options)
                            .map_err(zip_err)?;
                        zip.write_all(&body)?;
                    }
                    FlatEntry::Dir { path } => {
                        zip.add_directory(format!("{base}/{path}"), options)
                            .map_err(zip_err)?;
                    }
                }
            }
        } else {
            let body = layout::doc_bytes(record)?;
            let zip = self.inner()?;
            zip.start_file(format!("{base}.json"), options)
                .map_err(zip_err)?;
            zip.write_all(&body)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(zip) = self.inner.take() {
            zip.finish().map_err(zip_err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn record(id: &str, value: Value) -> Record {
        let Value::Object(map) = value else {
            panic!("expected object")
        };
        Record::new(id, map)
    }

    fn read_all(path: &Path) -> Vec<Record> {
        let mut reader = ZipReader::open(path).unwrap();
        reader.records().collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn plain_round_trip_uses_stem_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("beers.zip");

        let mut writer = ZipWriter::create(&path, false).unwrap();
        writer.write(&record("stout", json!({"abv": 7.0}))).unwrap();
        writer.write(&record("ale", json!({"abv": 5.0}))).unwrap();
        writer
            .write(&record("_design/views", json!({"views": {}})))
            .unwrap();
        writer.finish().unwrap();

        let archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"beers/docs/stout.json"));
        assert!(names.contains(&"beers/design_docs/views.json"));

        let records = read_all(&path);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["ale", "stout", "_design/views"]);
        assert_eq!(records[1].value["abv"], json!(7.0));
    }

    #[test]
    fn expanded_round_trip_preserves_structure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("beers.zip");
        let body = json!({
            "name": "pale",
            "ratings": {"alice": 9, "none": {}}
        });

        let mut writer = ZipWriter::create(&path, true).unwrap();
        writer.write(&record("beer", body.clone())).unwrap();
        writer.finish().unwrap();

        let records = read_all(&path);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "beer");
        assert_eq!(Value::Object(records[0].value.clone()), body);
    }

    #[test]
    fn accepts_archives_without_a_prefix_folder() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flat.zip");

        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("docs/a.json", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"{\"n\": 1}").unwrap();
        zip.finish().unwrap();

        let records = read_all(&path);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "a");
    }

    #[test]
    fn write_after_finish_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("done.zip");

        let mut writer = ZipWriter::create(&path, false).unwrap();
        writer.write(&record("a", json!({}))).unwrap();
        writer.finish().unwrap();
        let err = writer.write(&record("b", json!({}))).unwrap_err();
        assert!(matches!(err, Error::Zip(_)));
    }

    #[test]
    fn empty_archive_yields_no_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.zip");
        zip::ZipWriter::new(File::create(&path).unwrap())
            .finish()
            .unwrap();

        assert!(read_all(&path).is_empty());
    }
}
