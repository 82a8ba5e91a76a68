//! Locator strings select a migration source or destination.
//!
//! Supported forms:
//!
//! ```text
//! couchdb://<host>[:<port>]/<database>
//! csv:<filename>
//! json:<filename>
//! dir://<directory>
//! zip://<zipfile>
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use docport_api::{Error, Result};
use url::Url;

/// Default CouchDB port, used when the locator omits one.
pub const COUCHDB_DEFAULT_PORT: u16 = 5984;

/// A parsed source/destination locator.
///
/// Parsing is strict: an unknown scheme, an empty path, or a `couchdb`
/// URL without exactly one database segment is rejected. `Display`
/// reproduces the canonical string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// `couchdb://host:port/db` — the URL keeps the `couchdb` scheme;
    /// backends map it to plain HTTP.
    CouchDb(Url),
    /// `csv:<filename>`
    Csv(PathBuf),
    /// `json:<filename>` — a JSON Lines file.
    Json(PathBuf),
    /// `dir://<directory>`
    Dir(PathBuf),
    /// `zip://<zipfile>`
    Zip(PathBuf),
}

impl Locator {
    /// The locator's scheme keyword.
    pub fn scheme(&self) -> &'static str {
        match self {
            Locator::CouchDb(_) => "couchdb",
            Locator::Csv(_) => "csv",
            Locator::Json(_) => "json",
            Locator::Dir(_) => "dir",
            Locator::Zip(_) => "zip",
        }
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.starts_with("couchdb://") {
            let url = Url::parse(s).map_err(|e| Error::Locator(format!("{s:?}: {e}")))?;
            validate_couchdb(&url)?;
            return Ok(Locator::CouchDb(url));
        }
        if let Some(path) = s.strip_prefix("dir://") {
            return nonempty(path, s).map(|p| Locator::Dir(PathBuf::from(p)));
        }
        if let Some(path) = s.strip_prefix("zip://") {
            return nonempty(path, s).map(|p| Locator::Zip(PathBuf::from(p)));
        }
        if let Some(path) = s.strip_prefix("csv:") {
            return nonempty(path, s).map(|p| Locator::Csv(PathBuf::from(p)));
        }
        if let Some(path) = s.strip_prefix("json:") {
            return nonempty(path, s).map(|p| Locator::Json(PathBuf::from(p)));
        }
        Err(Error::Locator(format!("unrecognized scheme in {s:?}")))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::CouchDb(url) => write!(f, "{url}"),
            Locator::Csv(p) => write!(f, "csv:{}", p.display()),
            Locator::Json(p) => write!(f, "json:{}", p.display()),
            Locator::Dir(p) => write!(f, "dir://{}", p.display()),
            Locator::Zip(p) => write!(f, "zip://{}", p.display()),
        }
    }
}

fn nonempty<'a>(path: &'a str, whole: &str) -> Result<&'a str> {
    if path.is_empty() {
        Err(Error::Locator(format!("missing path in {whole:?}")))
    } else {
        Ok(path)
    }
}

fn validate_couchdb(url: &Url) -> Result<()> {
    if url.host_str().is_none() {
        return Err(Error::Locator(format!("missing host in {url}")));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::Locator(format!(
            "couchdb locator must not carry a query or fragment: {url}"
        )));
    }
    couchdb_database(url).map(|_| ())
}

/// Extracts the single database segment from a couchdb locator URL.
pub(crate) fn couchdb_database(url: &Url) -> Result<&str> {
    let mut segments = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()))
        .ok_or_else(|| Error::Locator(format!("missing database in {url}")))?;
    let db = segments
        .next()
        .ok_or_else(|| Error::Locator(format!("missing database in {url}")))?;
    if segments.next().is_some() {
        return Err(Error::Locator(format!(
            "couchdb locator must name exactly one database: {url}"
        )));
    }
    Ok(db)
}
