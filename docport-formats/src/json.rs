//! JSON Lines source and destination (`json:<filename>`).
//!
//! One record per line, `{"id": ..., "value": {...}}`, values verbatim.
//! Blank lines are skipped on read. Unlike CSV this backend is lossless.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use docport_api::{DocumentReader, DocumentWriter, Record, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Deserialize)]
struct Line {
    id: String,
    value: Map<String, Value>,
}

#[derive(Serialize)]
struct LineRef<'a> {
    id: &'a str,
    value: &'a Map<String, Value>,
}

/// Streams records out of a JSON Lines file.
pub struct JsonReader {
    lines: Lines<BufReader<File>>,
}

impl JsonReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
        })
    }
}

impl DocumentReader for JsonReader {
    fn next_record(&mut self) -> Result<Option<Record>> {
        for line in self.lines.by_ref() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: Line = serde_json::from_str(&line)?;
            return Record::from_source(parsed.id, parsed.value).map(Some);
        }
        Ok(None)
    }
}

/// Appends records to a JSON Lines file, one compact line each.
pub struct JsonWriter {
    writer: BufWriter<File>,
}

impl JsonWriter {
    /// Creates (truncating) the destination file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl DocumentWriter for JsonWriter {
    fn write(&mut self, record: &Record) -> Result<()> {
        let line = LineRef {
            id: &record.id,
            value: &record.value,
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docport_api::Error;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn round_trips_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.json");

        let mut writer = JsonWriter::create(&path).unwrap();
        for (id, value) in [
            ("a", json!({"n": 1, "tags": ["x", "y"]})),
            ("_design/views", json!({"views": {"all": {"map": "fn"}}})),
        ] {
            let Value::Object(map) = value else { unreachable!() };
            writer.write(&Record::new(id, map)).unwrap();
        }
        writer.finish().unwrap();

        let mut reader = JsonReader::open(&path).unwrap();
        let records = reader.records().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value["tags"], json!(["x", "y"]));
        assert!(records[1].is_design());
    }

    #[test]
    fn skips_blank_lines_and_strips_meta_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hand.json");
        std::fs::write(
            &path,
            "{\"id\":\"a\",\"value\":{\"_rev\":\"1-x\",\"n\":1}}\n\n{\"id\":\"b\",\"value\":{}}\n",
        )
        .unwrap();

        let mut reader = JsonReader::open(&path).unwrap();
        let records = reader.records().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value.get("_rev"), None);
        assert_eq!(records[0].value["n"], json!(1));
    }

    #[test]
    fn malformed_line_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"id\":\"a\",\"value\":{}}\nnot json\n").unwrap();

        let mut reader = JsonReader::open(&path).unwrap();
        assert!(reader.next_record().unwrap().is_some());
        assert!(matches!(reader.next_record(), Err(Error::Json(_))));
    }

    #[test]
    fn lines_without_a_value_member_are_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.json");
        std::fs::write(&path, "{\"id\":\"a\"}\n").unwrap();

        let mut reader = JsonReader::open(&path).unwrap();
        assert!(matches!(reader.next_record(), Err(Error::Json(_))));
    }
}
