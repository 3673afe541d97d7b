//! Comparator (§4.5/§4.7): after a migration, re-fetches both schemas and
//! checksums every matched table on both ends concurrently, reporting
//! divergences. Reuses Stage A (schema fetch) and the Catalog Store from
//! the `planner`/`catalog` crates rather than duplicating them.

pub mod data;
pub mod error;
pub mod schema;

pub use data::compare_data;
pub use error::{ComparatorError, Result};
pub use schema::{compare_schemas, SchemaComparisonReport, SchemaMismatch};
