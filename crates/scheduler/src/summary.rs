//! `summary.json` assembly (§4.5), grounded on the teacher's
//! `engine-config::report::summary::SummaryReport` shape — a thin,
//! `Serialize`-only report struct — enriched here with the per-phase
//! timing table and run-wide counters the spec's summary actually needs.

use crate::metrics::MetricsSnapshot;
use model::TimingRow;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub tables_copied: usize,
    pub indexes_built: usize,
    pub constraints_built: usize,
    pub sequences_reset: usize,
    pub timings: Vec<TimingRow>,
    pub metrics: MetricsSnapshot,
}
