//! Transaction state machine (§4.4, §4.6): `Idle -> InTransaction` on BEGIN,
//! back to `Idle` on COMMIT. A transaction whose DML fires before its
//! COMMIT accumulates into an ordered sequence of output records; the
//! emitter walks that sequence in insertion order rather than the
//! intrusive linked list the wire protocol's own reference producer uses —
//! a plain `Vec` already gives us append-order iteration for free.
//!
//! Rules this machine enforces, straight out of the spec:
//! - a non-continued transaction emits BEGIN lazily, on its first DML;
//! - a transaction with zero DML still emits BEGIN+COMMIT as a heartbeat;
//! - SWITCH (WAL rotation) or a mid-transaction KEEPALIVE both mark the
//!   transaction that continues past the boundary as `continued`, and a
//!   continued transaction emits no BEGIN of its own;
//! - if a segment ends with a transaction still open and neither COMMIT
//!   nor SWITCH closed it, whatever that transaction already emitted in
//!   this segment is discarded and replaced by a single KEEPALIVE at the
//!   last LSN seen — this is the "endpos reached mid-transaction" case.

use crate::emitter;
use crate::error::{Result, TransformError};
use crate::lsn::Lsn;
use crate::message::Message;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub enum OutputRecord {
    Begin { xid: u32, lsn: Lsn, timestamp: DateTime<Utc> },
    Commit { xid: u32, lsn: Lsn, timestamp: DateTime<Utc> },
    Dml(String),
    Switch { lsn: Lsn, timestamp: DateTime<Utc> },
    Keepalive { lsn: Lsn, timestamp: DateTime<Utc> },
}

struct OpenTransaction {
    xid: u32,
    /// index into `records` where this transaction's output would start,
    /// were it ever emitted. Used to roll back on endpos-without-commit.
    start_idx: usize,
    begin_lsn: Lsn,
    begin_timestamp: DateTime<Utc>,
    emitted_begin: bool,
    continued: bool,
    last_lsn: Lsn,
}

#[derive(Default)]
pub struct Transformer {
    open: Option<OpenTransaction>,
    records: Vec<OutputRecord>,
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the per-segment output buffer for a new WAL segment/file,
    /// preserving any transaction left open by a SWITCH at the previous
    /// segment's end.
    pub fn begin_new_segment(&mut self) {
        self.records.clear();
        if let Some(open) = &mut self.open {
            open.start_idx = 0;
        }
    }

    pub fn take_segment_output(&mut self) -> Vec<OutputRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn has_open_transaction(&self) -> bool {
        self.open.is_some()
    }

    fn check_marker_xid(open: &OpenTransaction, xid: Option<u32>, action: &str) -> Result<()> {
        if let Some(x) = xid {
            if x != 0 && x != open.xid {
                return Err(TransformError::Parse(format!(
                    "{action} carried xid {x} but the open transaction is {}",
                    open.xid
                )));
            }
        }
        Ok(())
    }

    pub fn process(&mut self, msg: Message) -> Result<()> {
        match msg {
            Message::Begin { xid, lsn, timestamp } => {
                if self.open.is_some() {
                    return Err(TransformError::Parse("BEGIN received while a transaction was already open".to_string()));
                }
                self.open = Some(OpenTransaction {
                    xid,
                    start_idx: self.records.len(),
                    begin_lsn: lsn,
                    begin_timestamp: timestamp,
                    emitted_begin: false,
                    continued: false,
                    last_lsn: lsn,
                });
            }
            Message::Commit { xid, lsn, timestamp } => {
                let open = self
                    .open
                    .take()
                    .ok_or_else(|| TransformError::Parse("COMMIT received with no open transaction".to_string()))?;
                if open.xid != xid {
                    return Err(TransformError::Parse(format!(
                        "COMMIT xid {xid} does not match open transaction xid {}",
                        open.xid
                    )));
                }
                if !open.emitted_begin && !open.continued {
                    self.records.push(OutputRecord::Begin { xid: open.xid, lsn: open.begin_lsn, timestamp: open.begin_timestamp });
                }
                self.records.push(OutputRecord::Commit { xid, lsn, timestamp });
            }
            Message::Insert { xid, schema, table, new, warn_multi_row } => {
                if warn_multi_row {
                    tracing::warn!(%schema, %table, xid, "insert message carried more than one row, keeping only the first");
                }
                let sql = emitter::render_insert(&schema, &table, new.as_ref())?;
                self.emit_dml(xid, sql)?;
            }
            Message::Update { xid, schema, table, identity, new } => {
                let sql = emitter::render_update(&schema, &table, &identity, &new)?;
                self.emit_dml(xid, sql)?;
            }
            Message::Delete { xid, schema, table, identity } => {
                let sql = emitter::render_delete(&schema, &table, &identity)?;
                self.emit_dml(xid, sql)?;
            }
            Message::Truncate { xid, schema, table } => {
                let sql = emitter::render_truncate(&schema, &table);
                self.emit_dml(xid, sql)?;
            }
            Message::Switch { xid, lsn, timestamp } => {
                if let Some(open) = &self.open {
                    Self::check_marker_xid(open, xid, "SWITCH")?;
                }
                self.records.push(OutputRecord::Switch { lsn, timestamp });
                if let Some(open) = &mut self.open {
                    open.continued = true;
                    open.last_lsn = lsn;
                }
            }
            Message::Keepalive { xid, lsn, timestamp } => {
                if let Some(open) = &self.open {
                    Self::check_marker_xid(open, xid, "KEEPALIVE")?;
                }
                self.records.push(OutputRecord::Keepalive { lsn, timestamp });
                if let Some(open) = &mut self.open {
                    open.continued = true;
                    open.last_lsn = lsn;
                }
            }
        }
        Ok(())
    }

    fn emit_dml(&mut self, xid: u32, sql: String) -> Result<()> {
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| TransformError::Parse("DML received with no open transaction".to_string()))?;
        if open.xid != xid {
            return Err(TransformError::Parse(format!("DML xid {xid} does not match open transaction xid {}", open.xid)));
        }
        if !open.emitted_begin && !open.continued {
            self.records.push(OutputRecord::Begin { xid: open.xid, lsn: open.begin_lsn, timestamp: open.begin_timestamp });
            open.emitted_begin = true;
        }
        self.records.push(OutputRecord::Dml(sql));
        Ok(())
    }

    /// Called at true end-of-stream (the run's configured endpos was
    /// reached, not merely a WAL-file boundary). If a transaction is still
    /// open, its records emitted so far in this segment are discarded and
    /// replaced by a single KEEPALIVE carrying `last_lsn`.
    pub fn finalize_at_endpos(&mut self, last_lsn: Lsn, timestamp: DateTime<Utc>) -> bool {
        if let Some(open) = self.open.take() {
            self.records.truncate(open.start_idx);
            self.records.push(OutputRecord::Keepalive { lsn: last_lsn, timestamp });
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::parse_line;

    fn msg(json: &str) -> Message {
        parse_line(&format!(r#"{{"message": {json}}}"#)).unwrap()
    }

    #[test]
    fn zero_dml_transaction_still_emits_heartbeat() {
        let mut t = Transformer::new();
        t.process(msg(r#"{"action":"B","xid":1,"lsn":"0/1","timestamp":"2026-01-01T00:00:00Z"}"#)).unwrap();
        t.process(msg(r#"{"action":"C","xid":1,"lsn":"0/2","timestamp":"2026-01-01T00:00:01Z"}"#)).unwrap();
        let records = t.take_segment_output();
        assert!(matches!(records[0], OutputRecord::Begin { xid: 1, .. }));
        assert!(matches!(records[1], OutputRecord::Commit { xid: 1, .. }));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn switch_mid_transaction_carries_over_without_second_begin() {
        let mut t = Transformer::new();
        t.process(msg(r#"{"action":"B","xid":42,"lsn":"0/1","timestamp":"2026-01-01T00:00:00Z"}"#)).unwrap();
        t.process(msg(r#"{"action":"I","xid":42,"schema":"public","table":"t",
            "new":[{"columnnames":["id"],"columnvalues":[{"type":"int8","value":1}]}]}"#))
            .unwrap();
        t.process(msg(r#"{"action":"I","xid":42,"schema":"public","table":"t",
            "new":[{"columnnames":["id"],"columnvalues":[{"type":"int8","value":2}]}]}"#))
            .unwrap();
        t.process(msg(r#"{"action":"X","lsn":"0/9","timestamp":"2026-01-01T00:00:02Z"}"#)).unwrap();
        let segment_a = t.take_segment_output();
        assert_eq!(segment_a.len(), 4);
        assert!(matches!(segment_a[0], OutputRecord::Begin { .. }));
        assert!(matches!(segment_a[3], OutputRecord::Switch { .. }));
        assert!(t.has_open_transaction());

        t.begin_new_segment();
        t.process(msg(r#"{"action":"I","xid":42,"schema":"public","table":"t",
            "new":[{"columnnames":["id"],"columnvalues":[{"type":"int8","value":3}]}]}"#))
            .unwrap();
        t.process(msg(r#"{"action":"C","xid":42,"lsn":"0/A0","timestamp":"2026-01-01T00:00:03Z"}"#)).unwrap();
        let segment_b = t.take_segment_output();
        assert_eq!(segment_b.len(), 2);
        assert!(matches!(segment_b[0], OutputRecord::Dml(_)));
        assert!(matches!(segment_b[1], OutputRecord::Commit { .. }));
    }

    #[test]
    fn endpos_mid_transaction_replaces_pending_output_with_keepalive() {
        let mut t = Transformer::new();
        t.process(msg(r#"{"action":"B","xid":7,"lsn":"0/1","timestamp":"2026-01-01T00:00:00Z"}"#)).unwrap();
        t.process(msg(r#"{"action":"I","xid":7,"schema":"public","table":"t",
            "new":[{"columnnames":["id"],"columnvalues":[{"type":"int8","value":1}]}]}"#))
            .unwrap();
        let replaced = t.finalize_at_endpos(Lsn::parse("0/2").unwrap(), Utc::now());
        assert!(replaced);
        let records = t.take_segment_output();
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], OutputRecord::Keepalive { .. }));
        assert!(!t.has_open_transaction());
    }

    #[test]
    fn dml_outside_transaction_is_rejected() {
        let mut t = Transformer::new();
        let err = t.process(msg(r#"{"action":"I","xid":1,"schema":"public","table":"t",
            "new":[{"columnnames":["id"],"columnvalues":[{"type":"int8","value":1}]}]}"#));
        assert!(err.is_err());
    }
}
