//! Format backends for document migration.
//!
//! Each backend module pairs a [`DocumentReader`](docport_api::DocumentReader)
//! with a [`DocumentWriter`](docport_api::DocumentWriter) for one locator
//! scheme. [`Locator`] parses the scheme strings that name them.

pub mod couchdb;
pub mod csv;
pub mod dir;
pub mod json;
pub mod layout;
pub mod locator;
pub mod zip;

pub use crate::couchdb::{CouchDbReader, CouchDbWriter};
pub use crate::csv::{CsvReader, CsvWriter};
pub use crate::dir::{DirReader, DirWriter};
pub use crate::json::{JsonReader, JsonWriter};
pub use crate::locator::Locator;
pub use crate::zip::{ZipReader, ZipWriter};
