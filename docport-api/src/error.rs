use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by every docport backend and the migrate driver.
///
/// Backend crates fold the error types of their own dependencies (csv, zip,
/// reqwest) into the string-carrying variants so that this enum stays free
/// of those dependencies.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid locator: {0}")]
    Locator(String),

    #[error("document id must not be empty")]
    EmptyDocId,

    #[error("duplicate document id: {0}")]
    DuplicateDocId(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("zip archive error: {0}")]
    Zip(String),

    #[error("source error: {0}")]
    Source(String),

    #[error("destination error: {0}")]
    Destination(String),
}
