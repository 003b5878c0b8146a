use thiserror::Error;

/// Structural input errors. These mean the dump itself is broken (a feed
/// format or versioning break), not that a single record is merely odd.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("record exceeds the {limit}-byte frame buffer without a newline")]
    RecordTooLong { limit: usize },
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error("dump read failed: {0}")]
    Io(#[from] std::io::Error),
}
