//! Migration Planner (§4.4): Stage A schema fetch and Stage B table
//! partitioning. Everything downstream (Stage C onward) reads what these
//! two stages persist to the source Catalog Store.

pub mod error;
pub mod partition;
pub mod schema_fetch;

pub use error::{PlannerError, Result};
pub use partition::plan_partitions;
pub use schema_fetch::{SchemaFetchOutcome, fetch_schema};
