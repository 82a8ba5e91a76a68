//! # docport
//!
//! Move documents between CouchDB databases, CSV files, JSON Lines files,
//! directory trees and ZIP archives.
//!
//! A migration is one pass: a [`DocumentReader`] streams [`Record`]s out
//! of the source, [`migrate`] checks ids and counts, a [`DocumentWriter`]
//! stores them. Endpoints are named by [`Locator`] strings such as
//! `couchdb://localhost:5984/beers` or `zip://backup.zip`.
//!
//! ## 🚀 Quickstart
//!
//! ```rust,no_run
//! use docport::{Locator, migrate, open_reader, open_writer};
//!
//! fn main() -> docport::Result<()> {
//!     let source: Locator = "couchdb://localhost:5984/beers".parse()?;
//!     let destination: Locator = "zip://beers-backup.zip".parse()?;
//!
//!     let reader = open_reader(&source)?;
//!     let writer = open_writer(&destination)?;
//!     let stats = migrate(reader, writer)?;
//!     println!(
//!         "copied {} documents in {:.1}s",
//!         stats.total(),
//!         stats.duration_secs
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## 💡 Core Concepts
//!
//! - **[`Record`]**: one document, an id plus a JSON object body. Ids
//!   starting with `_design/` mark design documents.
//! - **[`Locator`]**: a parsed endpoint name; [`open_reader`] and
//!   [`open_writer`] turn it into a boxed endpoint.
//! - **[`migrate`] / [`migrate_with_progress`]**: the single-pass driver
//!   with id checking and counting.
//! - **[`crypto`]**: field-level encryption contracts, independent of the
//!   migration pipeline.
//!
//! Deprecated pre-0.2 names remain importable from [`compat`].

pub mod compat;
mod migrate;

pub use docport_api::{
    DESIGN_PREFIX, DocumentReader, DocumentWriter, Error, Record, Records, Result,
};
pub use docport_crypto as crypto;
pub use docport_formats::{
    CouchDbReader, CouchDbWriter, CsvReader, CsvWriter, DirReader, DirWriter, JsonReader,
    JsonWriter, Locator, ZipReader, ZipWriter,
};

pub use crate::migrate::{MigrateStats, migrate, migrate_with_progress};

/// Opens the reader for a locator.
pub fn open_reader(locator: &Locator) -> Result<Box<dyn DocumentReader>> {
    Ok(match locator {
        Locator::CouchDb(url) => Box::new(CouchDbReader::open(url)?),
        Locator::Csv(path) => Box::new(CsvReader::open(path)?),
        Locator::Json(path) => Box::new(JsonReader::open(path)?),
        Locator::Dir(path) => Box::new(DirReader::open(path)?),
        Locator::Zip(path) => Box::new(ZipReader::open(path)?),
    })
}

/// Opens the writer for a locator, storing each document in one piece.
pub fn open_writer(locator: &Locator) -> Result<Box<dyn DocumentWriter>> {
    Ok(match locator {
        Locator::CouchDb(url) => Box::new(CouchDbWriter::create(url)?),
        Locator::Csv(path) => Box::new(CsvWriter::create(path)?),
        Locator::Json(path) => Box::new(JsonWriter::create(path)?),
        Locator::Dir(path) => Box::new(DirWriter::create(path, false)?),
        Locator::Zip(path) => Box::new(ZipWriter::create(path, false)?),
    })
}

/// Opens a writer that stores documents in expanded form, one file per
/// leaf value. Only directory and ZIP destinations support this.
pub fn open_expanded_writer(locator: &Locator) -> Result<Box<dyn DocumentWriter>> {
    match locator {
        Locator::Dir(path) => Ok(Box::new(DirWriter::create(path, true)?)),
        Locator::Zip(path) => Ok(Box::new(ZipWriter::create(path, true)?)),
        other => Err(Error::Destination(format!(
            "expanded documents require a dir or zip destination, got {}",
            other.scheme()
        ))),
    }
}
