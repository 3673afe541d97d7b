//! Thin, explicit Postgres connector (§4.3): connection management, catalog
//! enumeration, `COPY` streaming, vendor dump/restore invocation, and the
//! sequence/large-object helpers used by Stage D and the large-objects
//! worker. Narrowed to Postgres-only, grounded on the teacher's
//! `connectors::sql::postgres` adapter shape.

pub mod catalog_queries;
pub mod connection;
pub mod copy;
pub mod dump_restore;
pub mod error;
pub mod large_objects;
pub mod sequences;

pub use catalog_queries::{fetch_indexes, fetch_sequences, fetch_tables, ObjectFilter};
pub use connection::{PgConnection, connect_shared, export_snapshot};
pub use copy::copy_partition;
pub use error::{ConnectorError, DbError};
