//! Mutable tracking-row shapes persisted by the Catalog Store (§3).
//!
//! These are read back by the scheduler to decide when a table is eligible
//! to advance to its next stage (§3 invariants 1-3) and by the summarizer to
//! assemble `summary.json`.

use serde::{Deserialize, Serialize};

/// What a `summary` row is keyed by: a copy part, an index, or a constraint.
/// Distinct key kinds let an index and the constraint that reuses its index
/// hold separate rows for the same underlying object (§3 invariant 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryKind {
    TablePart { table_oid: u32, part_num: u32 },
    Index { index_oid: u32 },
    Constraint { con_oid: u32 },
}

/// One row of the `summary` table: per-object progress and timing.
///
/// `done_epoch == 0` means the work is still in flight; at most one live
/// `pid` may hold such a row for a given key (§3 invariant 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub pid: u32,
    pub kind: SummaryKind,
    pub start_epoch: i64,
    pub done_epoch: i64,
    pub duration_ms: i64,
    pub bytes: i64,
    pub command: String,
}

impl SummaryRow {
    pub fn is_done(&self) -> bool {
        self.done_epoch > 0
    }

    pub fn is_in_flight(&self) -> bool {
        self.done_epoch == 0
    }
}

/// One row of the `vacuum_summary` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VacuumSummaryRow {
    pub pid: u32,
    pub table_oid: u32,
    pub start_epoch: i64,
    pub done_epoch: i64,
    pub duration_ms: i64,
}

/// The fixed enumeration of named top-level phases tracked in `timings` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingLabel {
    CatalogQueries,
    DumpSchema,
    PrepareSchema,
    TotalData,
    CopyData,
    CreateIndex,
    AlterTable,
    Vacuum,
    SetSequences,
    LargeObjects,
    FinalizeSchema,
    Total,
}

impl TimingLabel {
    pub const ALL: [TimingLabel; 12] = [
        TimingLabel::CatalogQueries,
        TimingLabel::DumpSchema,
        TimingLabel::PrepareSchema,
        TimingLabel::TotalData,
        TimingLabel::CopyData,
        TimingLabel::CreateIndex,
        TimingLabel::AlterTable,
        TimingLabel::Vacuum,
        TimingLabel::SetSequences,
        TimingLabel::LargeObjects,
        TimingLabel::FinalizeSchema,
        TimingLabel::Total,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimingLabel::CatalogQueries => "catalog_queries",
            TimingLabel::DumpSchema => "dump_schema",
            TimingLabel::PrepareSchema => "prepare_schema",
            TimingLabel::TotalData => "total_data",
            TimingLabel::CopyData => "copy_data",
            TimingLabel::CreateIndex => "create_index",
            TimingLabel::AlterTable => "alter_table",
            TimingLabel::Vacuum => "vacuum",
            TimingLabel::SetSequences => "set_sequences",
            TimingLabel::LargeObjects => "large_objects",
            TimingLabel::FinalizeSchema => "finalize_schema",
            TimingLabel::Total => "total",
        }
    }
}

/// One row of the `timings` table: a cumulative, named phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRow {
    pub label: TimingLabel,
    pub conn: String,
    pub start_epoch: i64,
    pub done_epoch: i64,
    pub duration_ms: i64,
    pub duration_pretty: String,
    pub count: i64,
    pub bytes: i64,
    pub bytes_pretty: String,
}

impl TimingRow {
    pub fn new(label: TimingLabel, conn: impl Into<String>) -> Self {
        Self {
            label,
            conn: conn.into(),
            start_epoch: 0,
            done_epoch: 0,
            duration_ms: 0,
            duration_pretty: String::new(),
            count: 0,
            bytes: 0,
            bytes_pretty: String::new(),
        }
    }

    /// Refreshes the pretty-printed columns from the raw counters; called on
    /// `stop` (§4.1 "Timing record").
    pub fn refresh_pretty(&mut self) {
        self.duration_pretty = pretty_duration_ms(self.duration_ms);
        self.bytes_pretty = pretty_bytes(self.bytes);
    }
}

pub fn pretty_duration_ms(ms: i64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{:.1}m", ms as f64 / 60_000.0)
    }
}

pub fn pretty_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
