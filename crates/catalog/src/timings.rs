//! Timing records (§3, §4.1): one row per named top-level phase, refreshed
//! on `stop` with pretty-printed byte/duration columns for `summary.json`.

use crate::error::Result;
use crate::store::CatalogStore;
use model::tracking::{pretty_bytes, pretty_duration_ms};
use model::{TimingLabel, TimingRow};
use rusqlite::{OptionalExtension, params};

fn label_str(label: TimingLabel) -> &'static str {
    label.as_str()
}

impl CatalogStore {
    /// Starts (or restarts, for `--resume`) a named phase.
    pub async fn timing_start(&self, label: TimingLabel, conn_name: impl Into<String>, now: i64) -> Result<()> {
        let conn_name = conn_name.into();
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO timings (label, conn, start_epoch) VALUES (?1, ?2, ?3)
                 ON CONFLICT(label) DO UPDATE SET conn = excluded.conn, start_epoch = excluded.start_epoch",
                params![label_str(label), conn_name, now],
            )?;
            Ok(())
        })
        .await
    }

    /// Stops a phase, refreshing its pretty-printed byte/duration columns.
    pub async fn timing_stop(&self, label: TimingLabel, now: i64) -> Result<()> {
        self.write(move |conn| {
            let (start_epoch, bytes, count): (i64, i64, i64) = conn.query_row(
                "SELECT start_epoch, bytes, count FROM timings WHERE label = ?1",
                params![label_str(label)],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )?;
            let duration_ms = (now - start_epoch).max(0);
            let duration_pretty = pretty_duration_ms(duration_ms);
            let bytes_pretty = pretty_bytes(bytes);
            conn.execute(
                "UPDATE timings SET done_epoch = ?1, duration_ms = ?2, duration_pretty = ?3, bytes_pretty = ?4 WHERE label = ?5",
                params![now, duration_ms, duration_pretty, bytes_pretty, label_str(label)],
            )?;
            let _ = count;
            Ok(())
        })
        .await
    }

    /// Accumulates counters for a cumulative phase without changing its
    /// start/done markers (used by phases spanning many worker tasks).
    pub async fn timing_increment(&self, label: TimingLabel, count: i64, bytes: i64, duration_ms: i64) -> Result<()> {
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO timings (label, count, bytes, duration_ms) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(label) DO UPDATE SET
                    count = timings.count + excluded.count,
                    bytes = timings.bytes + excluded.bytes,
                    duration_ms = timings.duration_ms + excluded.duration_ms",
                params![label_str(label), count, bytes, duration_ms],
            )?;
            let bytes_total: i64 = conn.query_row(
                "SELECT bytes FROM timings WHERE label = ?1",
                params![label_str(label)],
                |r| r.get(0),
            )?;
            let duration_total: i64 = conn.query_row(
                "SELECT duration_ms FROM timings WHERE label = ?1",
                params![label_str(label)],
                |r| r.get(0),
            )?;
            conn.execute(
                "UPDATE timings SET bytes_pretty = ?1, duration_pretty = ?2 WHERE label = ?3",
                params![pretty_bytes(bytes_total), pretty_duration_ms(duration_total), label_str(label)],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn list_timings(&self) -> Result<Vec<TimingRow>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT label, conn, start_epoch, done_epoch, duration_ms, duration_pretty, count, bytes, bytes_pretty FROM timings",
            )?;
            let rows = stmt.query_map([], row_to_timing)?;
            rows.collect()
        })
        .await
    }

    pub async fn get_timing(&self, label: TimingLabel) -> Result<Option<TimingRow>> {
        self.read(move |conn| {
            conn.query_row(
                "SELECT label, conn, start_epoch, done_epoch, duration_ms, duration_pretty, count, bytes, bytes_pretty FROM timings WHERE label = ?1",
                params![label_str(label)],
                row_to_timing,
            )
            .optional()
        })
        .await
    }
}

fn row_to_timing(row: &rusqlite::Row) -> rusqlite::Result<TimingRow> {
    let label_text: String = row.get(0)?;
    Ok(TimingRow {
        label: parse_label(&label_text),
        conn: row.get(1)?,
        start_epoch: row.get(2)?,
        done_epoch: row.get(3)?,
        duration_ms: row.get(4)?,
        duration_pretty: row.get(5)?,
        count: row.get(6)?,
        bytes: row.get(7)?,
        bytes_pretty: row.get(8)?,
    })
}

fn parse_label(s: &str) -> TimingLabel {
    TimingLabel::ALL
        .into_iter()
        .find(|l| l.as_str() == s)
        .unwrap_or(TimingLabel::Total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CatalogStore, Role};

    #[tokio::test]
    async fn start_then_stop_computes_duration() {
        let store = CatalogStore::open_in_memory(Role::Source).unwrap();
        store.timing_start(TimingLabel::CopyData, "source", 1_000).await.unwrap();
        store.timing_increment(TimingLabel::CopyData, 1, 4096, 0).await.unwrap();
        store.timing_stop(TimingLabel::CopyData, 5_000).await.unwrap();

        let row = store.get_timing(TimingLabel::CopyData).await.unwrap().unwrap();
        assert_eq!(row.duration_ms, 4_000);
        assert_eq!(row.bytes, 4096);
        assert!(!row.duration_pretty.is_empty());
    }
}
