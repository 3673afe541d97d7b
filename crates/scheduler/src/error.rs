//! Scheduler error taxonomy (§7), grounded on the teacher's
//! `engine-runtime::error::MigrationError` layered-enum shape: every
//! downstream crate's error is wrapped here so the CLI has exactly one type
//! to map onto an exit code.

use model::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("connector error: {0}")]
    Connector(#[from] pgconn::ConnectorError),

    #[error("database error: {0}")]
    Database(#[from] pgconn::DbError),

    #[error("planner error: {0}")]
    Planner(#[from] planner::PlannerError),

    #[error("worker task panicked or was cancelled: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("a worker pool queue was unlinked mid-run: {0}")]
    QueueClosed(String),

    #[error("run aborted: {0}")]
    Cancelled(String),

    #[error("unexpected: {0}")]
    Unexpected(String),
}

impl MigrationError {
    /// Maps an error to the process exit code the CLI should return (§6
    /// "Exit codes"). Connector failures are distinguished by which side of
    /// the migration they came from wherever that's still known to the
    /// caller; callers without that context fall back to `InternalError`.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            MigrationError::Cancelled(_) => ExitCode::Quit,
            MigrationError::Connector(_) | MigrationError::Database(_) => ExitCode::Source,
            _ => ExitCode::InternalError,
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;
