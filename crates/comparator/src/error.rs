use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComparatorError {
    #[error(transparent)]
    Catalog(#[from] catalog::CatalogError),

    #[error(transparent)]
    Connector(#[from] pgconn::ConnectorError),

    #[error(transparent)]
    Database(#[from] pgconn::DbError),

    #[error(transparent)]
    Planner(#[from] planner::PlannerError),

    #[error("worker task panicked or was cancelled: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("table queue closed before every worker finished")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, ComparatorError>;
