//! Claim/finalize primitives backing the invariants of §3, plus the
//! first-writer-wins election rows that decide when a table is eligible to
//! advance to its next stage.

use crate::error::Result;
use crate::store::CatalogStore;
use concurrency::PidLiveness;
use model::ObjectId;
use rusqlite::{OptionalExtension, params};

fn part_key(table_oid: ObjectId, part_num: u32) -> String {
    format!("part:{}:{}", table_oid.0, part_num)
}

fn index_key(index_oid: ObjectId) -> String {
    format!("idx:{}", index_oid.0)
}

fn con_key(con_oid: ObjectId) -> String {
    format!("con:{}", con_oid.0)
}

/// Outcome of a claim attempt (§3 invariant 1): either this caller is now
/// the sole holder, or someone else (alive) already holds the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    Acquired,
    HeldByOther,
}

impl Claim {
    pub fn acquired(self) -> bool {
        matches!(self, Claim::Acquired)
    }
}

impl CatalogStore {
    /// Generic claim against `summary`: insert-or-ignore, then on conflict
    /// probe the holder's liveness and steal a stale row (§5).
    async fn claim_summary_row(
        &self,
        key: String,
        kind: &'static str,
        table_oid: Option<u32>,
        part_num: Option<u32>,
        index_oid: Option<u32>,
        con_oid: Option<u32>,
        pid: u32,
        now: i64,
    ) -> Result<Claim> {
        self.write(move |conn| {
            let existing: Option<(i64, i64)> = conn
                .query_row(
                    "SELECT pid, done_epoch FROM summary WHERE key = ?1",
                    params![key],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()?;

            match existing {
                None => {
                    conn.execute(
                        "INSERT INTO summary (key, kind, table_oid, part_num, index_oid, con_oid, pid, start_epoch)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                        params![key, kind, table_oid, part_num, index_oid, con_oid, pid, now],
                    )?;
                    Ok(Claim::Acquired)
                }
                Some((_, done_epoch)) if done_epoch > 0 => Ok(Claim::HeldByOther),
                Some((holder_pid, _)) => {
                    if PidLiveness::is_alive(holder_pid as u32) && holder_pid as u32 != pid {
                        Ok(Claim::HeldByOther)
                    } else {
                        // Stale pid (or a retry by the same worker): steal the row.
                        conn.execute(
                            "UPDATE summary SET pid = ?1, start_epoch = ?2 WHERE key = ?3",
                            params![pid, now, key],
                        )?;
                        Ok(Claim::Acquired)
                    }
                }
            }
        })
        .await
    }

    async fn finalize_summary_row(
        &self,
        key: String,
        done_epoch: i64,
        duration_ms: i64,
        bytes: i64,
        command: String,
    ) -> Result<()> {
        self.write(move |conn| {
            conn.execute(
                "UPDATE summary SET done_epoch = ?1, duration_ms = ?2, bytes = ?3, command = ?4 WHERE key = ?5",
                params![done_epoch, duration_ms, bytes, command, key],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn claim_part(&self, table_oid: ObjectId, part_num: u32, pid: u32, now: i64) -> Result<Claim> {
        self.claim_summary_row(
            part_key(table_oid, part_num),
            "table_part",
            Some(table_oid.0),
            Some(part_num),
            None,
            None,
            pid,
            now,
        )
        .await
    }

    pub async fn finalize_part(
        &self,
        table_oid: ObjectId,
        part_num: u32,
        done_epoch: i64,
        duration_ms: i64,
        bytes: i64,
        command: impl Into<String>,
    ) -> Result<()> {
        self.finalize_summary_row(part_key(table_oid, part_num), done_epoch, duration_ms, bytes, command.into())
            .await
    }

    pub async fn count_parts_done(&self, table_oid: ObjectId) -> Result<i64> {
        self.read(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM summary WHERE kind = 'table_part' AND table_oid = ?1 AND done_epoch > 0",
                params![table_oid.0],
                |r| r.get(0),
            )
        })
        .await
    }

    /// `s_table_parts_done`: first-writer-wins election that promotes a
    /// table to "indexes eligible" (§3 invariant 2).
    pub async fn claim_table_parts_done(&self, table_oid: ObjectId, pid: u32) -> Result<bool> {
        self.write(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO s_table_parts_done (table_oid, pid) VALUES (?1, ?2)",
                params![table_oid.0, pid],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    /// Counts how many of `index_oids` already have a finalized `summary`
    /// row. Callers subtract from the total to get "indexes left" (§4.3
    /// index worker "count_indexes_left"), passing only the subset of a
    /// table's indexes that are actually built during the index phase
    /// (plain indexes and PK/UNIQUE indexes reused by a constraint).
    pub async fn count_indexes_done(&self, index_oids: &[ObjectId]) -> Result<i64> {
        if index_oids.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = index_oids.iter().map(|o| index_key(*o)).collect();
        self.read(move |conn| {
            let placeholders = keys.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                "SELECT COUNT(*) FROM summary WHERE kind = 'index' AND done_epoch > 0 AND key IN ({placeholders})"
            );
            let params = rusqlite::params_from_iter(keys.iter());
            conn.query_row(&sql, params, |r| r.get(0))
        })
        .await
    }

    /// Plain (non-claiming) read of whether a table's indexes-done election
    /// has already been won by someone, used by the vacuum worker to gate
    /// its start on the constraint phase having begun (§3 invariant 2/3).
    pub async fn table_indexes_done(&self, table_oid: ObjectId) -> Result<bool> {
        self.read(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM s_table_indexes_done WHERE table_oid = ?1",
                params![table_oid.0],
                |r| r.get(0),
            )?;
            Ok(n > 0)
        })
        .await
    }

    pub async fn claim_index(&self, index_oid: ObjectId, pid: u32, now: i64) -> Result<Claim> {
        self.claim_summary_row(index_key(index_oid), "index", None, None, Some(index_oid.0), None, pid, now)
            .await
    }

    pub async fn finalize_index(
        &self,
        index_oid: ObjectId,
        done_epoch: i64,
        duration_ms: i64,
        bytes: i64,
        command: impl Into<String>,
    ) -> Result<()> {
        self.finalize_summary_row(index_key(index_oid), done_epoch, duration_ms, bytes, command.into())
            .await
    }

    pub async fn is_index_done(&self, index_oid: ObjectId) -> Result<bool> {
        self.read(move |conn| {
            let done: i64 = conn
                .query_row(
                    "SELECT done_epoch FROM summary WHERE key = ?1",
                    params![index_key(index_oid)],
                    |r| r.get(0),
                )
                .optional()?
                .unwrap_or(0);
            Ok(done > 0)
        })
        .await
    }

    /// `s_table_indexes_done`: first-writer-wins election that promotes a
    /// table to "constraints + vacuum eligible" (§3 invariant 3).
    pub async fn claim_table_indexes_done(&self, table_oid: ObjectId, pid: u32) -> Result<bool> {
        self.write(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO s_table_indexes_done (table_oid, pid) VALUES (?1, ?2)",
                params![table_oid.0, pid],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    pub async fn claim_constraint(&self, con_oid: ObjectId, pid: u32, now: i64) -> Result<Claim> {
        self.claim_summary_row(con_key(con_oid), "constraint", None, None, None, Some(con_oid.0), pid, now)
            .await
    }

    pub async fn finalize_constraint(
        &self,
        con_oid: ObjectId,
        done_epoch: i64,
        duration_ms: i64,
        command: impl Into<String>,
    ) -> Result<()> {
        self.finalize_summary_row(con_key(con_oid), done_epoch, duration_ms, 0, command.into())
            .await
    }

    /// Truncate-once (§3 invariant 5): claims the table-level truncate
    /// marker. The table-copy semaphore bounds concurrent access to this
    /// call; the marker itself persists across crashes.
    pub async fn claim_truncate(&self, table_oid: ObjectId, pid: u32, now: i64) -> Result<bool> {
        self.write(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO truncate_done (table_oid, pid, done_epoch) VALUES (?1, ?2, 0)",
                params![table_oid.0, pid],
            )?;
            let _ = now;
            Ok(changed == 1)
        })
        .await
    }

    pub async fn finalize_truncate(&self, table_oid: ObjectId, now: i64) -> Result<()> {
        self.write(move |conn| {
            conn.execute(
                "UPDATE truncate_done SET done_epoch = ?1 WHERE table_oid = ?2",
                params![now, table_oid.0],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn is_truncate_done(&self, table_oid: ObjectId) -> Result<bool> {
        self.read(move |conn| {
            let done: i64 = conn
                .query_row(
                    "SELECT done_epoch FROM truncate_done WHERE table_oid = ?1",
                    params![table_oid.0],
                    |r| r.get(0),
                )
                .optional()?
                .unwrap_or(0);
            Ok(done > 0)
        })
        .await
    }

    pub async fn claim_vacuum(&self, table_oid: ObjectId, pid: u32, now: i64) -> Result<Claim> {
        self.write(move |conn| {
            let existing: Option<(i64, i64)> = conn
                .query_row(
                    "SELECT pid, done_epoch FROM vacuum_summary WHERE table_oid = ?1",
                    params![table_oid.0],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()?;
            match existing {
                None => {
                    conn.execute(
                        "INSERT INTO vacuum_summary (table_oid, pid, start_epoch) VALUES (?1, ?2, ?3)",
                        params![table_oid.0, pid, now],
                    )?;
                    Ok(Claim::Acquired)
                }
                Some((_, done)) if done > 0 => Ok(Claim::HeldByOther),
                Some((holder_pid, _)) => {
                    if PidLiveness::is_alive(holder_pid as u32) && holder_pid as u32 != pid {
                        Ok(Claim::HeldByOther)
                    } else {
                        conn.execute(
                            "UPDATE vacuum_summary SET pid = ?1, start_epoch = ?2 WHERE table_oid = ?3",
                            params![pid, now, table_oid.0],
                        )?;
                        Ok(Claim::Acquired)
                    }
                }
            }
        })
        .await
    }

    pub async fn finalize_vacuum(&self, table_oid: ObjectId, done_epoch: i64, duration_ms: i64) -> Result<()> {
        self.write(move |conn| {
            conn.execute(
                "UPDATE vacuum_summary SET done_epoch = ?1, duration_ms = ?2 WHERE table_oid = ?3",
                params![done_epoch, duration_ms, table_oid.0],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Role;

    #[tokio::test]
    async fn exactly_one_worker_wins_the_parts_done_election() {
        let store = CatalogStore::open_in_memory(Role::Source).unwrap();
        let table = ObjectId(7);
        let a = store.claim_table_parts_done(table, 100).await.unwrap();
        let b = store.claim_table_parts_done(table, 200).await.unwrap();
        assert!(a);
        assert!(!b);
    }

    #[tokio::test]
    async fn a_stale_pid_claim_is_stolen() {
        let store = CatalogStore::open_in_memory(Role::Source).unwrap();
        let table = ObjectId(1);
        // Simulate a crashed worker with an implausible pid holding part 0.
        let claim = store.claim_part(table, 0, u32::MAX - 1, 1000).await.unwrap();
        assert_eq!(claim, Claim::Acquired);

        // Current process probes liveness of u32::MAX - 1 and finds it dead.
        let reclaimed = store.claim_part(table, 0, concurrency::PidLiveness::current_pid(), 2000).await.unwrap();
        assert_eq!(reclaimed, Claim::Acquired);
    }

    #[tokio::test]
    async fn a_live_holder_blocks_other_claimants() {
        let store = CatalogStore::open_in_memory(Role::Source).unwrap();
        let table = ObjectId(1);
        let my_pid = concurrency::PidLiveness::current_pid();
        store.claim_part(table, 0, my_pid, 1000).await.unwrap();
        let other = store.claim_part(table, 0, my_pid.wrapping_add(1), 1001).await.unwrap();
        // Our own pid is alive, so a different pid cannot steal it.
        assert_eq!(other, Claim::HeldByOther);
    }

    #[tokio::test]
    async fn finalize_marks_the_part_done() {
        let store = CatalogStore::open_in_memory(Role::Source).unwrap();
        let table = ObjectId(3);
        let pid = concurrency::PidLiveness::current_pid();
        store.claim_part(table, 0, pid, 1000).await.unwrap();
        store.finalize_part(table, 0, 2000, 1000, 4096, "COPY").await.unwrap();
        assert_eq!(store.count_parts_done(table).await.unwrap(), 1);
    }
}
