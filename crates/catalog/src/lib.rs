//! The Catalog Store (§4.1): an embedded, single-file relational store
//! (one per role: source, filter, target) holding the source inventory and
//! every mutable tracking row the scheduler reads to advance stages.
//!
//! `rusqlite::Connection` is synchronous; [`CatalogStore`] wraps it so every
//! public method runs on a blocking task and surfaces [`CatalogError`] to
//! async callers, the same "wrap the sync driver, stay async at the edges"
//! shape used for this workspace's other embedded stores.

mod comparison;
mod error;
mod inventory;
mod progress;
mod schema;
mod store;
mod timings;

pub use comparison::ComparisonResult;
pub use error::{CatalogError, Result};
pub use progress::Claim;
pub use store::{CatalogStore, CatalogTriplet, Role};
