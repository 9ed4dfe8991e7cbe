use common::DateFormatError;
use redb::{CommitError, DatabaseError, StorageError, TableError, TransactionError};

#[derive(Debug)]
pub enum BrainzError {
    Http(reqwest::Error),
    Status { url: String, status: u16 },
    Json(serde_json::Error),
    Date(DateFormatError),
    Cache(redb::Error),
    Io(std::io::Error),
    Malformed(String),
    NotFound(String),
}

impl std::fmt::Display for BrainzError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrainzError::Http(err) => write!(f, "http error: {}", err),
            BrainzError::Status { url, status } => write!(f, "http {} for {}", status, url),
            BrainzError::Json(err) => write!(f, "json error: {}", err),
            BrainzError::Date(err) => write!(f, "{}", err),
            BrainzError::Cache(err) => write!(f, "cache error: {}", err),
            BrainzError::Io(err) => write!(f, "io error: {}", err),
            BrainzError::Malformed(message) => write!(f, "malformed response: {}", message),
            BrainzError::NotFound(what) => write!(f, "not found: {}", what),
        }
    }
}

impl std::error::Error for BrainzError {}

impl From<reqwest::Error> for BrainzError {
    fn from(err: reqwest::Error) -> Self {
        BrainzError::Http(err)
    }
}

impl From<serde_json::Error> for BrainzError {
    fn from(err: serde_json::Error) -> Self {
        BrainzError::Json(err)
    }
}

impl From<DateFormatError> for BrainzError {
    fn from(err: DateFormatError) -> Self {
        BrainzError::Date(err)
    }
}

impl From<std::io::Error> for BrainzError {
    fn from(err: std::io::Error) -> Self {
        BrainzError::Io(err)
    }
}

impl From<redb::Error> for BrainzError {
    fn from(err: redb::Error) -> Self {
        BrainzError::Cache(err)
    }
}

impl From<DatabaseError> for BrainzError {
    fn from(err: DatabaseError) -> Self {
        BrainzError::Cache(err.into())
    }
}

impl From<TableError> for BrainzError {
    fn from(err: TableError) -> Self {
        BrainzError::Cache(err.into())
    }
}

impl From<TransactionError> for BrainzError {
    fn from(err: TransactionError) -> Self {
        BrainzError::Cache(err.into())
    }
}

impl From<StorageError> for BrainzError {
    fn from(err: StorageError) -> Self {
        BrainzError::Cache(err.into())
    }
}

impl From<CommitError> for BrainzError {
    fn from(err: CommitError) -> Self {
        BrainzError::Cache(err.into())
    }
}
