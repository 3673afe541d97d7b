//! Stable value types shared by every pgcopydb crate: the source inventory,
//! the mutable tracking-row shapes the catalog persists, run configuration
//! knobs, and the process exit-code taxonomy.

pub mod exit_code;
pub mod ids;
pub mod options;
pub mod source_object;
pub mod tracking;

pub use exit_code::ExitCode;
pub use ids::{ObjectId, PartId, RunId};
pub use options::{MigrationOptions, RestoreOptions};
pub use source_object::{FilteredItem, FilteredKind, Index, Sequence, SourceTable, TablePartition};
pub use tracking::{SummaryRow, TimingLabel, TimingRow, VacuumSummaryRow};
