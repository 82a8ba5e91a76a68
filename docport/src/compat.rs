//! Pre-0.2 names, kept importable for existing callers.
//!
//! Everything here is a deprecated alias of its current counterpart and
//! warns at compile time. New code imports from the crate root.

use docport_api::{DocumentReader, DocumentWriter, Result};

use crate::{Locator, MigrateStats};

#[deprecated(since = "0.2.0", note = "renamed to `Locator`")]
pub type SourceSpec = Locator;

#[deprecated(since = "0.2.0", note = "renamed to `DocumentReader`")]
pub use docport_api::DocumentReader as Reader;

#[deprecated(since = "0.2.0", note = "renamed to `DocumentWriter`")]
pub use docport_api::DocumentWriter as Writer;

/// The pre-0.2 name of [`migrate`](crate::migrate).
#[deprecated(since = "0.2.0", note = "renamed to `migrate`")]
pub fn copy_all<R, W>(reader: R, writer: W) -> Result<MigrateStats>
where
    R: DocumentReader,
    W: DocumentWriter,
{
    crate::migrate(reader, writer)
}

#[cfg(test)]
mod tests {
    use docport_api::{DocumentReader, DocumentWriter, Record, Result};

    struct Empty;

    impl DocumentReader for Empty {
        fn next_record(&mut self) -> Result<Option<Record>> {
            Ok(None)
        }
    }

    struct Null;

    impl DocumentWriter for Null {
        fn write(&mut self, _record: &Record) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    #[allow(deprecated)]
    fn old_names_still_resolve() {
        use super::{Reader, SourceSpec, Writer, copy_all};

        fn _reader_position(_: &mut dyn Reader) {}
        fn _writer_position(_: &mut dyn Writer) {}

        let locator: SourceSpec = "csv:out.csv".parse().unwrap();
        assert_eq!(locator.scheme(), "csv");

        let stats = copy_all(Empty, Null).unwrap();
        assert_eq!(stats.total(), 0);
    }
}
