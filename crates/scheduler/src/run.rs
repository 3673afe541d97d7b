//! Scheduler entry point (§4.3 Stages A-E): fetches and persists the source
//! schema, partitions large tables, restores the pre-data dump section,
//! then runs Stage C's worker pools (copy/index-constraint/vacuum),
//! Stage D's sequence reset, and the large-objects worker concurrently,
//! before Stage E's post-data restore and summary assembly.

use crate::context::{RunConfig, WorkerContext};
use crate::error::{MigrationError, Result};
use crate::metrics::Metrics;
use crate::queues::{IndexWork, QUEUE_CAPACITY};
use crate::retry::RetryPolicy;
use crate::summary::SummaryReport;
use crate::{queues, stage_e, workers};
use catalog::CatalogTriplet;
use concurrency::{CancelFlags, NamedQueue, NamedSemaphore};
use model::{ObjectId, PartId, SourceTable, TimingLabel};
use pgconn::PgConnection;
use std::collections::HashMap;
use std::sync::Arc;

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub async fn run(config: RunConfig, cancel: CancelFlags) -> Result<SummaryReport> {
    let triplet = CatalogTriplet::open_triplet(&config.run_dir)?;
    triplet.source.timing_start(TimingLabel::Total, "scheduler", now_epoch()).await?;

    let schema_source = PgConnection::connect(&config.source_conninfo).await?;
    let snapshot_id = if config.options.consistent {
        Some(pgconn::export_snapshot(schema_source.client()).await.map_err(pgconn::DbError::from)?)
    } else {
        None
    };

    triplet.source.timing_start(TimingLabel::CatalogQueries, "source", now_epoch()).await?;
    let outcome =
        planner::fetch_schema(schema_source.client(), &triplet.source, &config.filter, config.options.resume).await?;
    triplet.source.timing_stop(TimingLabel::CatalogQueries, now_epoch()).await?;

    let partitions = planner::plan_partitions(&outcome.tables, config.options.split_tables_larger_than);
    triplet.source.upsert_table_partitions(partitions.clone()).await?;

    let dump_dir = config.run_dir.join("schema");
    triplet.source.timing_start(TimingLabel::DumpSchema, "source", now_epoch()).await?;
    pgconn::dump_restore::dump_schema(&config.source_conninfo, &dump_dir).await?;
    triplet.source.timing_stop(TimingLabel::DumpSchema, now_epoch()).await?;

    triplet.target.timing_start(TimingLabel::PrepareSchema, "target", now_epoch()).await?;
    pgconn::dump_restore::restore_pre_data(&config.target_conninfo, &dump_dir, &config.options.restore_options).await?;
    triplet.target.timing_stop(TimingLabel::PrepareSchema, now_epoch()).await?;

    let ctx = WorkerContext {
        store: triplet.source.clone(),
        source_conninfo: config.source_conninfo.clone(),
        target_conninfo: config.target_conninfo.clone(),
        snapshot_id,
        cancel,
        metrics: Metrics::new(),
        retry: RetryPolicy::for_database(),
        resume: config.options.resume,
    };

    let tables: Arc<HashMap<u32, SourceTable>> = Arc::new(outcome.tables.iter().map(|t| (t.oid.0, t.clone())).collect());

    let (copy_tx, copy_rx) = NamedQueue::<PartId>::create("copy", QUEUE_CAPACITY);
    let (index_tx, index_rx) = NamedQueue::<IndexWork>::create("index", QUEUE_CAPACITY);
    let (vacuum_tx, vacuum_rx) = NamedQueue::<ObjectId>::create("vacuum", QUEUE_CAPACITY);

    let copy_rx = queues::shared(copy_rx);
    let index_rx = queues::shared(index_rx);
    let vacuum_rx = queues::shared(vacuum_rx);

    let table_copy_sem = NamedSemaphore::table_copy();
    let index_build_sem = NamedSemaphore::index_build(config.options.index_jobs);

    let copy_handles = workers::copy::spawn_pool(
        config.options.table_jobs,
        ctx.clone(),
        copy_rx,
        tables.clone(),
        index_tx.clone(),
        vacuum_tx.clone(),
        table_copy_sem,
    );
    let index_handles =
        workers::index::spawn_pool(config.options.index_jobs, ctx.clone(), index_rx, index_tx.clone(), index_build_sem);
    let vacuum_handles = workers::vacuum::spawn_pool(config.options.vacuum_jobs, ctx.clone(), vacuum_rx);

    let sequences_handle = tokio::spawn(workers::sequences::run(ctx.clone(), outcome.sequences.clone()));
    let large_objects_handle = tokio::spawn(workers::large_objects::run(ctx.clone(), config.options.skip_large_objects));

    for p in &partitions {
        copy_tx
            .send(PartId::new(p.table_oid, p.part_num))
            .await
            .map_err(|_| MigrationError::QueueClosed("copy queue".to_string()))?;
    }
    for _ in 0..config.options.table_jobs.max(1) {
        let _ = copy_tx.send_stop().await;
    }

    try_join_handles(copy_handles).await?;

    for _ in 0..config.options.index_jobs.max(1) {
        let _ = index_tx.send_stop().await;
    }
    for _ in 0..config.options.vacuum_jobs.max(1) {
        let _ = vacuum_tx.send_stop().await;
    }

    try_join_handles(index_handles).await?;
    try_join_handles(vacuum_handles).await?;

    sequences_handle.await??;
    large_objects_handle.await??;

    schema_source.close().await;

    triplet.target.timing_start(TimingLabel::FinalizeSchema, "target", now_epoch()).await?;
    stage_e::finalize_schema(
        &config.target_conninfo,
        &dump_dir,
        &triplet.source,
        &outcome.filtered,
        &config.options.restore_options,
    )
    .await?;
    triplet.target.timing_stop(TimingLabel::FinalizeSchema, now_epoch()).await?;
    triplet.source.timing_stop(TimingLabel::Total, now_epoch()).await?;

    assemble_summary(&triplet.source, &ctx.metrics, outcome.tables.len()).await
}

async fn try_join_handles(handles: Vec<tokio::task::JoinHandle<Result<()>>>) -> Result<()> {
    let results = futures_util::future::try_join_all(handles).await?;
    for r in results {
        r?;
    }
    Ok(())
}

async fn assemble_summary(store: &catalog::CatalogStore, metrics: &Metrics, tables_attempted: usize) -> Result<SummaryReport> {
    let timings = store.list_timings().await?;
    let count_of = |label: TimingLabel| timings.iter().find(|t| t.label == label).map(|t| t.count).unwrap_or(0);

    Ok(SummaryReport {
        tables_copied: tables_attempted,
        indexes_built: count_of(TimingLabel::CreateIndex) as usize,
        constraints_built: count_of(TimingLabel::AlterTable) as usize,
        sequences_reset: count_of(TimingLabel::SetSequences) as usize,
        timings,
        metrics: metrics.snapshot(),
    })
}
