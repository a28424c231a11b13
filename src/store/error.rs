use std::time::Duration;

/// Failure reported by a store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The operation did not complete before its deadline
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    /// The backend could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The backend rejected or failed the operation
    #[error("store error: {0}")]
    Backend(String),
    /// A stored document could not be mapped to a book
    #[error("corrupt document: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        match *err.kind {
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
                Self::Unavailable(err.to_string())
            }
            ErrorKind::BsonDeserialization(_) => Self::Corrupt(err.to_string()),
            _ => Self::Backend(err.to_string()),
        }
    }
}
