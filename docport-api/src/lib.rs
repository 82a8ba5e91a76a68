//! docport public API: the document record model and the reader/writer
//! contract every backend implements.
//!
//! A migration run streams [`Record`]s out of one [`DocumentReader`] and
//! into one [`DocumentWriter`], single-threaded and single-pass. This crate
//! holds only the types and traits of that contract; the format backends
//! live in `docport-formats` and the driver in `docport`.

mod error;

use serde_json::{Map, Value};

pub use error::{Error, Result};

/// Id prefix that marks a record as a design document.
///
/// Design documents are routed to a `design_docs/` subtree by the
/// directory and ZIP backends and counted separately by the driver.
pub const DESIGN_PREFIX: &str = "_design/";

/// A single document flowing through a migration pipeline.
///
/// `value` is the document body as a top-level JSON object. Keys beginning
/// with `_` are reserved for store metadata (`_id`, `_rev`, ...) and are
/// stripped when a record enters the pipeline through
/// [`Record::from_source`]. The `id` itself may begin with `_`
/// (design documents do).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub value: Map<String, Value>,
}

impl Record {
    /// Creates a record without source sanitization.
    ///
    /// Intended for programmatic construction; readers use
    /// [`Record::from_source`].
    pub fn new(id: impl Into<String>, value: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }

    /// Creates a record from data read out of a source.
    ///
    /// Rejects an empty id and drops every top-level key of `value` that
    /// begins with `_`. Nested keys are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyDocId`] if `id` is empty.
    pub fn from_source(id: impl Into<String>, value: Map<String, Value>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::EmptyDocId);
        }
        let value = value
            .into_iter()
            .filter(|(key, _)| !key.starts_with('_'))
            .collect();
        Ok(Self { id, value })
    }

    /// Whether this record is a design document (`_design/` id prefix).
    #[inline]
    pub fn is_design(&self) -> bool {
        self.id.starts_with(DESIGN_PREFIX)
    }
}

/// Produces a lazy, finite sequence of records from a source.
///
/// Construction is restartable (building a second reader over the same
/// source yields the same set); iteration is not. Normal exhaustion is
/// signalled by `Ok(None)`, never by an error.
pub trait DocumentReader {
    /// Returns the next record, or `Ok(None)` once the source is exhausted.
    ///
    /// A malformed row or an I/O failure aborts iteration with an error;
    /// there is no skip-and-continue.
    fn next_record(&mut self) -> Result<Option<Record>>;

    /// Iterator adapter over [`next_record`](Self::next_record).
    ///
    /// The iterator fuses after the first error or after exhaustion.
    fn records(&mut self) -> Records<'_, Self>
    where
        Self: Sized,
    {
        Records {
            reader: self,
            done: false,
        }
    }
}

/// Consumes records one at a time, persisting each to a destination.
///
/// Writes carry no batching or transactionality guarantee: each one is
/// independent and any failure propagates synchronously to the caller.
pub trait DocumentWriter {
    /// Persists one record.
    fn write(&mut self, record: &Record) -> Result<()>;

    /// Completes the destination.
    ///
    /// Backends that buffer (CSV) or need a closing structure (ZIP central
    /// directory) override this; for everything else it is a no-op. The
    /// migrate driver calls it once after the last write.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<R: DocumentReader + ?Sized> DocumentReader for Box<R> {
    fn next_record(&mut self) -> Result<Option<Record>> {
        (**self).next_record()
    }
}

impl<W: DocumentWriter + ?Sized> DocumentWriter for Box<W> {
    fn write(&mut self, record: &Record) -> Result<()> {
        (**self).write(record)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Iterator over a reader's records, created by [`DocumentReader::records`].
pub struct Records<'a, R: DocumentReader> {
    reader: &'a mut R,
    done: bool,
}

impl<R: DocumentReader> Iterator for Records<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn from_source_strips_underscore_keys() {
        let record = Record::from_source(
            "beer_1",
            obj(json!({"_id": "beer_1", "_rev": "1-abc", "name": "pale", "abv": 5.2})),
        )
        .unwrap();

        assert_eq!(record.id, "beer_1");
        assert_eq!(record.value.len(), 2);
        assert_eq!(record.value["name"], json!("pale"));
        assert_eq!(record.value["abv"], json!(5.2));
    }

    #[test]
    fn from_source_keeps_nested_underscore_keys() {
        let record = Record::from_source("d", obj(json!({"outer": {"_inner": 1}}))).unwrap();
        assert_eq!(record.value["outer"], json!({"_inner": 1}));
    }

    #[test]
    fn from_source_rejects_empty_id() {
        let err = Record::from_source("", Map::new()).unwrap_err();
        assert!(matches!(err, Error::EmptyDocId));
    }

    #[test]
    fn design_detection() {
        let design = Record::new("_design/views", Map::new());
        let doc = Record::new("_designer", Map::new());
        assert!(design.is_design());
        assert!(!doc.is_design());
    }

    struct StaticReader {
        items: Vec<Result<Record>>,
    }

    impl DocumentReader for StaticReader {
        fn next_record(&mut self) -> Result<Option<Record>> {
            if self.items.is_empty() {
                Ok(None)
            } else {
                self.items.remove(0).map(Some)
            }
        }
    }

    #[test]
    fn records_iterator_fuses_after_error() {
        let mut reader = StaticReader {
            items: vec![
                Ok(Record::new("a", Map::new())),
                Err(Error::Source("broken row".into())),
                Ok(Record::new("b", Map::new())),
            ],
        };

        let collected: Vec<_> = reader.records().collect();
        assert_eq!(collected.len(), 2);
        assert!(collected[0].is_ok());
        assert!(collected[1].is_err());
    }
}
