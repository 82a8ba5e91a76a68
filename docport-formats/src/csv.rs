//! CSV source and destination (`csv:<filename>`).
//!
//! The header row is taken from the first record written: an `id` column
//! first, then that record's keys in sorted order. Later records may omit
//! header keys (empty cell) but may not introduce new ones — dropping a key
//! silently would break the read-back guarantee, so that aborts instead.
//!
//! Cells hold raw text for string values and compact JSON for everything
//! else; the reader parses a cell as JSON when it can and falls back to a
//! plain string. CSV is the one lossy backend: value types survive only as
//! far as that encoding carries them.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use docport_api::{DocumentReader, DocumentWriter, Error, Record, Result};
use serde_json::{Map, Value};
use tracing::debug;

const ID_COLUMN: &str = "id";

/// Streams records out of a CSV file.
pub struct CsvReader {
    rows: csv::StringRecordsIntoIter<File>,
    header: csv::StringRecord,
    id_index: usize,
    path: PathBuf,
    /// Header-only or empty files yield an empty sequence.
    empty: bool,
}

impl CsvReader {
    /// Opens a CSV source.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or has columns but no `id`
    /// column. A file without any header is treated as an empty source.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = csv::ReaderBuilder::new()
            .from_path(&path)
            .map_err(|e| Error::Csv(e.to_string()))?;
        let header = reader
            .headers()
            .map_err(|e| Error::Csv(e.to_string()))?
            .clone();
        let empty = header.is_empty();
        let id_index = match header.iter().position(|name| name == ID_COLUMN) {
            Some(index) => index,
            None if empty => 0,
            None => {
                return Err(Error::Csv(format!(
                    "missing required column {ID_COLUMN:?} in {}",
                    path.display()
                )));
            }
        };
        debug!(path = %path.display(), columns = header.len(), "opened csv source");
        Ok(Self {
            rows: reader.into_records(),
            header,
            id_index,
            path,
            empty,
        })
    }
}

impl DocumentReader for CsvReader {
    fn next_record(&mut self) -> Result<Option<Record>> {
        if self.empty {
            return Ok(None);
        }
        let row = match self.rows.next() {
            None => return Ok(None),
            Some(Err(e)) => {
                return Err(Error::Csv(format!("{}: {e}", self.path.display())));
            }
            Some(Ok(row)) => row,
        };

        let id = row.get(self.id_index).unwrap_or("");
        if id.is_empty() {
            return Err(Error::EmptyDocId);
        }

        // Rows and header have equal length; the csv reader rejects ragged rows.
        let mut value = Map::new();
        for (index, (column, cell)) in self.header.iter().zip(row.iter()).enumerate() {
            if index == self.id_index || cell.is_empty() {
                continue;
            }
            value.insert(column.to_string(), decode_cell(cell));
        }
        Record::from_source(id, value).map(Some)
    }
}

/// Writes records to a CSV file, one row each.
pub struct CsvWriter {
    writer: csv::Writer<File>,
    /// Value key → cell position, fixed by the first record. Positions
    /// start at 1; cell 0 always holds the document id.
    columns: HashMap<String, usize>,
    width: usize,
    header_written: bool,
}

impl CsvWriter {
    /// Creates (truncating) the destination file. The header is not
    /// written until the first record arrives.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let writer = csv::WriterBuilder::new()
            .from_path(path.as_ref())
            .map_err(|e| Error::Csv(e.to_string()))?;
        Ok(Self {
            writer,
            columns: HashMap::new(),
            width: 0,
            header_written: false,
        })
    }

    fn write_header(&mut self, record: &Record) -> Result<()> {
        let mut names: Vec<&str> = record.value.keys().map(String::as_str).collect();
        names.sort_unstable();

        let mut header = Vec::with_capacity(names.len() + 1);
        header.push(ID_COLUMN);
        header.extend(names.iter().copied());
        self.writer
            .write_record(&header)
            .map_err(|e| Error::Csv(e.to_string()))?;

        self.width = header.len();
        // Value keys only. A key literally named "id" gets its own column
        // and must never route into cell 0.
        self.columns = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name.to_string(), index + 1))
            .collect();
        self.header_written = true;
        Ok(())
    }
}

impl DocumentWriter for CsvWriter {
    fn write(&mut self, record: &Record) -> Result<()> {
        if !self.header_written {
            self.write_header(record)?;
        }

        let mut row = vec![String::new(); self.width];
        row[0] = record.id.clone();
        for (key, value) in &record.value {
            let index = *self.columns.get(key).ok_or_else(|| {
                Error::Csv(format!(
                    "document {:?} has key {key:?} not present in the csv header",
                    record.id
                ))
            })?;
            row[index] = encode_cell(value)?;
        }
        self.writer
            .write_record(&row)
            .map_err(|e| Error::Csv(e.to_string()))
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn encode_cell(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Ok(serde_json::to_string(other)?),
    }
}

fn decode_cell(cell: &str) -> Value {
    serde_json::from_str(cell).unwrap_or_else(|_| Value::String(cell.to_string()))
}
