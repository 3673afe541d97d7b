use thiserror::Error;

/// Planner error taxonomy (§7 "SchemaFetch: catalog-query failure -> abort
/// before spawning workers").
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("catalog query failed: {0}")]
    Catalog(#[from] pgconn::DbError),

    #[error("catalog store error: {0}")]
    Store(#[from] catalog::CatalogError),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
