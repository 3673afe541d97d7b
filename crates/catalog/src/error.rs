use thiserror::Error;

/// Catalog Store error taxonomy (§7 "InvariantError: BUG markers... fatal;
/// no retry" plus the ordinary I/O and driver failure modes).
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("catalog invariant violated: {0}")]
    InvariantViolation(String),

    #[error("blocking task panicked: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for CatalogError {
    fn from(err: tokio::task::JoinError) -> Self {
        CatalogError::TaskJoin(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
