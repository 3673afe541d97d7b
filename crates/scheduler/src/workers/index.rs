//! Stage C index/constraint worker loop (§4.3): one shared queue carries
//! both plain `CREATE INDEX` work and constraint-only work, consumed by the
//! same pool of `indexJobs` workers. A finalized index or constraint
//! triggers `count_indexes_left` against the parent table and, once it
//! reaches zero, promotes the table to "constraints + vacuum eligible".
//!
//! Indexes that back a non-unique, non-primary constraint (e.g. `EXCLUDE`)
//! are never built here directly — they are built once, as part of the
//! constraint's own `ALTER TABLE ... ADD CONSTRAINT ...`, during the
//! constraint phase. The index worker still claims and finalizes a summary
//! row for them immediately so `count_indexes_left` converges without
//! waiting on work that belongs to a later phase.

use crate::context::WorkerContext;
use crate::error::{MigrationError, Result};
use crate::queues::{recv_shared, IndexWork, SharedReceiver};
use catalog::Claim;
use concurrency::queue::ReceivedMessage;
use concurrency::{NamedQueue, NamedSemaphore, PidLiveness};
use model::{Index, ObjectId, TimingLabel};
use pgconn::PgConnection;
use std::time::Instant;
use tracing::info;

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn spawn_pool(
    index_jobs: usize,
    ctx: WorkerContext,
    rx: SharedReceiver<IndexWork>,
    constraint_tx: NamedQueue<IndexWork>,
    index_build_sem: NamedSemaphore,
) -> Vec<tokio::task::JoinHandle<Result<()>>> {
    (0..index_jobs.max(1))
        .map(|_| {
            let ctx = ctx.clone();
            let rx = rx.clone();
            let constraint_tx = constraint_tx.clone();
            let index_build_sem = index_build_sem.clone();
            tokio::spawn(async move { worker_loop(ctx, rx, constraint_tx, index_build_sem).await })
        })
        .collect()
}

async fn worker_loop(
    ctx: WorkerContext,
    rx: SharedReceiver<IndexWork>,
    constraint_tx: NamedQueue<IndexWork>,
    index_build_sem: NamedSemaphore,
) -> Result<()> {
    let target = PgConnection::connect(&ctx.target_conninfo).await?;

    loop {
        match recv_shared(&rx, &ctx.cancel).await {
            ReceivedMessage::Item(IndexWork::Index(index_oid)) => {
                handle_index(&ctx, target.client(), index_oid, &constraint_tx, &index_build_sem).await?;
            }
            ReceivedMessage::Item(IndexWork::Constraint(index_oid)) => {
                handle_constraint(&ctx, target.client(), index_oid, &index_build_sem).await?;
            }
            ReceivedMessage::Stop | ReceivedMessage::Closed | ReceivedMessage::Cancelled => break,
        }
    }

    target.close().await;
    Ok(())
}

/// The subset of a table's indexes actually built during the index phase:
/// plain indexes, and indexes reused by a primary-key/unique constraint.
fn buildable_now(siblings: &[Index]) -> Vec<ObjectId> {
    siblings.iter().filter(|i| !i.has_constraint() || i.constraint_reuses_index()).map(|i| i.oid).collect()
}

async fn handle_index(
    ctx: &WorkerContext,
    target: &tokio_postgres::Client,
    index_oid: ObjectId,
    constraint_tx: &NamedQueue<IndexWork>,
    index_build_sem: &NamedSemaphore,
) -> Result<()> {
    let index = ctx.store.lookup_index(index_oid).await?;
    let pid = PidLiveness::current_pid();
    let now = now_epoch();

    if let Claim::Acquired = ctx.store.claim_index(index_oid, pid, now).await? {
        if index.has_constraint() && !index.constraint_reuses_index() {
            // Deferred: its CREATE INDEX happens inside the constraint's own
            // ALTER TABLE during the constraint phase.
            ctx.store.finalize_index(index_oid, now_epoch(), 0, 0, "DEFERRED").await?;
        } else {
            let _permit = index_build_sem.acquire().await;
            let ddl = build_index_ddl(&index, ctx.resume);
            let start = Instant::now();
            ctx.retry
                .run(|| target.batch_execute(&ddl), crate::retry::classify_pg_error)
                .await
                .map_err(|e| {
                    ctx.metrics.increment_failures(1);
                    MigrationError::from(pgconn::DbError::from(e.into_inner()))
                })?;
            let duration_ms = start.elapsed().as_millis() as i64;
            ctx.store.finalize_index(index_oid, now_epoch(), duration_ms, 0, ddl).await?;
            ctx.store.timing_increment(TimingLabel::CreateIndex, 1, 0, duration_ms).await?;
        }
    }

    maybe_promote_table(ctx, index.table_oid, pid, constraint_tx).await
}

fn build_index_ddl(index: &Index, resume: bool) -> String {
    if !resume {
        return index.definition.clone();
    }
    index
        .definition
        .replacen("CREATE UNIQUE INDEX", "CREATE UNIQUE INDEX IF NOT EXISTS", 1)
        .replacen("CREATE INDEX", "CREATE INDEX IF NOT EXISTS", 1)
}

async fn maybe_promote_table(
    ctx: &WorkerContext,
    table_oid: ObjectId,
    pid: u32,
    constraint_tx: &NamedQueue<IndexWork>,
) -> Result<()> {
    let siblings = ctx.store.indexes_of_table(table_oid).await?;
    let buildable = buildable_now(&siblings);
    let done = ctx.store.count_indexes_done(&buildable).await?;

    if done as usize >= buildable.len() && ctx.store.claim_table_indexes_done(table_oid, pid).await? {
        info!(table_oid = table_oid.0, "all buildable indexes done, enqueuing constraints");
        for sibling in siblings.iter().filter(|i| i.has_constraint()) {
            constraint_tx
                .send(IndexWork::Constraint(sibling.oid))
                .await
                .map_err(|_| MigrationError::QueueClosed("constraint queue".to_string()))?;
        }
    }
    Ok(())
}

async fn handle_constraint(
    ctx: &WorkerContext,
    target: &tokio_postgres::Client,
    index_oid: ObjectId,
    index_build_sem: &NamedSemaphore,
) -> Result<()> {
    let index = ctx.store.lookup_index(index_oid).await?;
    let Some(con_oid) = index.constraint_oid else { return Ok(()) };
    let pid = PidLiveness::current_pid();
    let now = now_epoch();

    if let Claim::Acquired = ctx.store.claim_constraint(con_oid, pid, now).await? {
        let table = ctx.store.lookup_table(index.table_oid).await?;
        let sql = build_constraint_ddl(&table.qualified_name(), &index);

        let start = Instant::now();
        if index.constraint_reuses_index() {
            ctx.retry
                .run(|| target.batch_execute(&sql), crate::retry::classify_pg_error)
                .await
                .map_err(|e| {
                    ctx.metrics.increment_failures(1);
                    MigrationError::from(pgconn::DbError::from(e.into_inner()))
                })?;
        } else {
            let _permit = index_build_sem.acquire().await;
            ctx.retry
                .run(|| target.batch_execute(&sql), crate::retry::classify_pg_error)
                .await
                .map_err(|e| {
                    ctx.metrics.increment_failures(1);
                    MigrationError::from(pgconn::DbError::from(e.into_inner()))
                })?;
        }
        let duration_ms = start.elapsed().as_millis() as i64;
        ctx.store.finalize_constraint(con_oid, now_epoch(), duration_ms, sql).await?;
        ctx.store.timing_increment(TimingLabel::AlterTable, 1, 0, duration_ms).await?;
    }

    Ok(())
}

fn build_constraint_ddl(table_qname: &str, index: &Index) -> String {
    let constraint_name = index.constraint_name.as_deref().unwrap_or(&index.name);
    if index.constraint_reuses_index() {
        let kind = if index.is_primary { "PRIMARY KEY" } else { "UNIQUE" };
        format!("ALTER TABLE {table_qname} ADD CONSTRAINT \"{constraint_name}\" {kind} USING INDEX \"{}\"", index.name)
    } else {
        let definition = index.constraint_definition.as_deref().unwrap_or_default();
        format!("ALTER TABLE {table_qname} ADD CONSTRAINT \"{constraint_name}\" {definition}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ObjectId as Oid;

    fn plain(oid: u32, table: u32) -> Index {
        Index {
            oid: Oid(oid),
            namespace: "public".into(),
            name: format!("idx{oid}"),
            table_oid: Oid(table),
            definition: "CREATE INDEX idx ON t (a)".into(),
            is_primary: false,
            is_unique: false,
            constraint_oid: None,
            constraint_name: None,
            constraint_definition: None,
        }
    }

    fn exclude_constraint(oid: u32, table: u32) -> Index {
        Index {
            oid: Oid(oid),
            namespace: "public".into(),
            name: format!("idx{oid}"),
            table_oid: Oid(table),
            definition: "CREATE INDEX idx ON t USING gist (a)".into(),
            is_primary: false,
            is_unique: false,
            constraint_oid: Some(Oid(900 + oid)),
            constraint_name: Some(format!("excl{oid}")),
            constraint_definition: Some("EXCLUDE USING gist (a WITH =)".into()),
        }
    }

    fn unique_constraint(oid: u32, table: u32) -> Index {
        Index {
            oid: Oid(oid),
            namespace: "public".into(),
            name: format!("idx{oid}"),
            table_oid: Oid(table),
            definition: "CREATE UNIQUE INDEX idx ON t (a)".into(),
            is_primary: false,
            is_unique: true,
            constraint_oid: Some(Oid(900 + oid)),
            constraint_name: Some(format!("uq{oid}")),
            constraint_definition: Some("UNIQUE (a)".into()),
        }
    }

    #[test]
    fn buildable_now_excludes_constraint_only_indexes() {
        let siblings = vec![plain(1, 1), exclude_constraint(2, 1), unique_constraint(3, 1)];
        let ids = buildable_now(&siblings);
        assert_eq!(ids, vec![Oid(1), Oid(3)]);
    }

    #[test]
    fn exclude_constraint_ddl_is_a_full_add_constraint() {
        let index = exclude_constraint(2, 1);
        let ddl = build_constraint_ddl("\"public\".\"t\"", &index);
        assert!(ddl.contains("ADD CONSTRAINT \"excl2\" EXCLUDE USING gist"));
    }

    #[test]
    fn unique_constraint_ddl_reuses_the_index() {
        let index = unique_constraint(3, 1);
        let ddl = build_constraint_ddl("\"public\".\"t\"", &index);
        assert!(ddl.contains("ADD CONSTRAINT \"uq3\" UNIQUE USING INDEX \"idx3\""));
    }

    #[test]
    fn resumed_index_ddl_adds_if_not_exists() {
        let index = plain(1, 1);
        assert_eq!(build_index_ddl(&index, true), "CREATE INDEX IF NOT EXISTS idx ON t (a)");
        assert_eq!(build_index_ddl(&index, false), "CREATE INDEX idx ON t (a)");
    }
}
