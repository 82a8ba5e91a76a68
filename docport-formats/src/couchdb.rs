//! CouchDB source and destination (`couchdb://host[:port]/db`).
//!
//! The reader pages through `_all_docs?include_docs=true`, asking for one
//! row beyond the page size to learn whether another page exists and
//! continuing from the last seen id (which the next page repeats and the
//! reader drops). The writer PUTs the database first, then one PUT per
//! document; an update conflict on an existing document aborts the run.

use std::collections::VecDeque;
use std::time::Duration;

use docport_api::{DocumentReader, DocumentWriter, Error, Record, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::locator::{COUCHDB_DEFAULT_PORT, couchdb_database};

/// Rows fetched per `_all_docs` request.
const PAGE_SIZE: usize = 500;
const HTTP_TIMEOUT_SECS: u64 = 30;

fn http_err(e: reqwest::Error) -> Error {
    Error::Http(e.to_string())
}

fn client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .map_err(http_err)
}

/// Rewrites a `couchdb://` locator URL as the plain-http base of the
/// database, filling in the default port.
fn http_base(url: &Url) -> Result<Url> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::Locator(format!("missing host in {url}")))?;
    let port = url.port().unwrap_or(COUCHDB_DEFAULT_PORT);
    let db = couchdb_database(url)?;
    Url::parse(&format!("http://{host}:{port}/{db}"))
        .map_err(|e| Error::Locator(e.to_string()))
}

fn doc_url(base: &Url, id: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::Http(format!("cannot extend url {base}")))?
        .push(id);
    Ok(url)
}

fn all_docs_url(base: &Url, page_size: usize, start_from: Option<&str>) -> Result<Url> {
    let mut url = doc_url(base, "_all_docs")?;
    let mut query = url.query_pairs_mut();
    query.append_pair("include_docs", "true");
    query.append_pair("limit", &(page_size + 1).to_string());
    if let Some(id) = start_from {
        query.append_pair("startkey", &serde_json::to_string(id)?);
    }
    drop(query);
    Ok(url)
}

#[derive(Deserialize)]
struct AllDocs {
    rows: Vec<AllDocsRow>,
}

#[derive(Deserialize)]
struct AllDocsRow {
    id: String,
    doc: Option<Value>,
}

/// Converts one page of rows, dropping the leading row when it repeats
/// the continuation id.
fn page_records(rows: Vec<AllDocsRow>, skip_id: Option<&str>) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        if index == 0 && skip_id == Some(row.id.as_str()) {
            continue;
        }
        let Some(Value::Object(doc)) = row.doc else {
            return Err(Error::Http(format!(
                "row for document {:?} carries no document body",
                row.id
            )));
        };
        records.push(Record::from_source(row.id, doc)?);
    }
    Ok(records)
}

/// Streams records out of a CouchDB database.
pub struct CouchDbReader {
    client: reqwest::blocking::Client,
    base: Url,
    buffer: VecDeque<Record>,
    last_id: Option<String>,
    done: bool,
}

impl CouchDbReader {
    /// Connects and verifies the database exists. Documents are fetched
    /// page by page as the iteration advances.
    pub fn open(url: &Url) -> Result<Self> {
        let client = client()?;
        let base = http_base(url)?;
        let response = client.get(base.clone()).send().map_err(http_err)?;
        let status = response.status();
        if status.as_u16() == 404 {
            return Err(Error::Source(format!("database not found: {base}")));
        }
        if !status.is_success() {
            return Err(Error::Http(format!("GET {base} returned {status}")));
        }
        Ok(Self {
            client,
            base,
            buffer: VecDeque::new(),
            last_id: None,
            done: false,
        })
    }

    fn fetch_page(&mut self) -> Result<()> {
        let url = all_docs_url(&self.base, PAGE_SIZE, self.last_id.as_deref())?;
        let response = self.client.get(url.clone()).send().map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(format!("GET {url} returned {status}")));
        }
        let page: AllDocs = response.json().map_err(http_err)?;

        if page.rows.len() <= PAGE_SIZE {
            self.done = true;
        }
        let records = page_records(page.rows, self.last_id.as_deref())?;
        debug!(count = records.len(), done = self.done, "fetched page");
        if let Some(last) = records.last() {
            self.last_id = Some(last.id.clone());
        }
        self.buffer.extend(records);
        Ok(())
    }
}

impl DocumentReader for CouchDbReader {
    fn next_record(&mut self) -> Result<Option<Record>> {
        while self.buffer.is_empty() && !self.done {
            self.fetch_page()?;
        }
        Ok(self.buffer.pop_front())
    }
}

/// Writes records into a CouchDB database, creating it if necessary.
pub struct CouchDbWriter {
    client: reqwest::blocking::Client,
    base: Url,
}

impl CouchDbWriter {
    pub fn create(url: &Url) -> Result<Self> {
        let writer = Self {
            client: client()?,
            base: http_base(url)?,
        };
        writer.ensure_database()?;
        Ok(writer)
    }

    fn ensure_database(&self) -> Result<()> {
        let response = self
            .client
            .put(self.base.clone())
            .send()
            .map_err(http_err)?;
        let status = response.status();
        // 412 means the database is already there.
        if status.is_success() || status.as_u16() == 412 {
            Ok(())
        } else {
            Err(Error::Destination(format!(
                "cannot create database at {}: {status}",
                self.base
            )))
        }
    }
}

impl DocumentWriter for CouchDbWriter {
    fn write(&mut self, record: &Record) -> Result<()> {
        let url = doc_url(&self.base, &record.id)?;
        let response = self
            .client
            .put(url.clone())
            .json(&record.value)
            .send()
            .map_err(http_err)?;
        let status = response.status();
        if status.as_u16() == 409 {
            return Err(Error::Destination(format!(
                "document {:?} already exists in the destination database",
                record.id
            )));
        }
        if !status.is_success() {
            return Err(Error::Destination(format!("PUT {url} returned {status}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        http_base(&Url::parse("couchdb://db.example.com/beers").unwrap()).unwrap()
    }

    #[test]
    fn http_base_fills_in_the_default_port() {
        assert_eq!(base().as_str(), "http://db.example.com:5984/beers");

        let explicit = Url::parse("couchdb://db.example.com:1984/beers").unwrap();
        assert_eq!(
            http_base(&explicit).unwrap().as_str(),
            "http://db.example.com:1984/beers"
        );
    }

    #[test]
    fn first_page_url_has_no_continuation_key() {
        let url = all_docs_url(&base(), 2, None).unwrap();
        assert_eq!(
            url.as_str(),
            "http://db.example.com:5984/beers/_all_docs?include_docs=true&limit=3"
        );
    }

    #[test]
    fn continuation_key_is_json_quoted() {
        let url = all_docs_url(&base(), 2, Some("beer_42")).unwrap();
        assert!(url.as_str().ends_with("&startkey=%22beer_42%22"));
    }

    #[test]
    fn doc_urls_keep_design_ids_one_segment() {
        let url = doc_url(&base(), "_design/views").unwrap();
        assert_eq!(
            url.as_str(),
            "http://db.example.com:5984/beers/_design%2Fviews"
        );
    }

    fn row(id: &str, doc: Value) -> AllDocsRow {
        AllDocsRow {
            id: id.to_string(),
            doc: Some(doc),
        }
    }

    #[test]
    fn page_records_drops_the_continuation_row() {
        let rows = vec![
            row("a", json!({"_id": "a", "_rev": "1-x", "n": 1})),
            row("b", json!({"_id": "b", "_rev": "1-y", "n": 2})),
        ];
        let records = page_records(rows, Some("a")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "b");
        assert_eq!(records[0].value.get("_rev"), None);
        assert_eq!(records[0].value["n"], json!(2));
    }

    #[test]
    fn page_records_only_skips_a_matching_leader() {
        let rows = vec![row("b", json!({})), row("c", json!({}))];
        let records = page_records(rows, Some("a")).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn rows_without_a_body_are_an_error() {
        let rows = vec![AllDocsRow {
            id: "a".to_string(),
            doc: None,
        }];
        assert!(matches!(page_records(rows, None), Err(Error::Http(_))));
    }
}
