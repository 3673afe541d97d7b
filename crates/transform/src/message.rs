//! Logical-decoding message parsing (§4.4/§4.6): each input line is a JSON
//! envelope carrying one message, in either of two dialects some sources
//! use — the message embedded as a JSON string, or as a nested object.
//! Both decode to the same [`Message`] the state machine consumes.

use crate::error::{Result, TransformError};
use crate::lsn::Lsn;
use crate::value::{single_tuple, RawTuple, Tuple};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub enum Message {
    Begin { xid: u32, lsn: Lsn, timestamp: DateTime<Utc> },
    Commit { xid: u32, lsn: Lsn, timestamp: DateTime<Utc> },
    Insert { xid: u32, schema: String, table: String, new: Option<Tuple>, warn_multi_row: bool },
    Update { xid: u32, schema: String, table: String, identity: Tuple, new: Tuple },
    Delete { xid: u32, schema: String, table: String, identity: Tuple },
    Truncate { xid: u32, schema: String, table: String },
    /// WAL-file boundary, not a transactional event: `xid` is `None` unless
    /// the source tags it with the transaction whose DML it interrupted.
    Switch { xid: Option<u32>, lsn: Lsn, timestamp: DateTime<Utc> },
    Keepalive { xid: Option<u32>, lsn: Lsn, timestamp: DateTime<Utc> },
}

impl Message {
    pub fn lsn(&self) -> Lsn {
        match self {
            Message::Begin { lsn, .. }
            | Message::Commit { lsn, .. }
            | Message::Switch { lsn, .. }
            | Message::Keepalive { lsn, .. } => *lsn,
            Message::Insert { .. } | Message::Update { .. } | Message::Delete { .. } | Message::Truncate { .. } => {
                // DML carries no lsn of its own in this wire format; callers
                // track the enclosing transaction's lsn separately.
                Lsn::default()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    message: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    action: String,
    #[serde(default)]
    xid: Option<u32>,
    #[serde(default)]
    lsn: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    schema: Option<String>,
    #[serde(default, rename = "table")]
    table: Option<String>,
    #[serde(default)]
    identity: Option<Vec<RawTuple>>,
    #[serde(default)]
    new: Option<Vec<RawTuple>>,
}

/// Parses one JSON-lines record. Accepts both dialects this format's
/// sources use: `{"message": "...json string..."}` and
/// `{"message": {...object...}}`.
pub fn parse_line(line: &str) -> Result<Message> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(TransformError::Parse("empty line".to_string()));
    }
    let envelope: Envelope = serde_json::from_str(trimmed)
        .map_err(|e| TransformError::Parse(format!("malformed envelope: {e}")))?;
    let raw: RawMessage = match envelope.message {
        serde_json::Value::String(s) => {
            serde_json::from_str(&s).map_err(|e| TransformError::Parse(format!("malformed embedded message: {e}")))?
        }
        obj @ serde_json::Value::Object(_) => {
            serde_json::from_value(obj).map_err(|e| TransformError::Parse(format!("malformed message object: {e}")))?
        }
        other => return Err(TransformError::Parse(format!("unsupported message shape: {other}"))),
    };
    to_message(raw)
}

fn parse_timestamp(raw: &Option<String>) -> Result<DateTime<Utc>> {
    match raw {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| TransformError::Parse(format!("malformed timestamp {s:?}: {e}"))),
        None => Ok(Utc::now()),
    }
}

fn parse_lsn(raw: &Option<String>, action: &str) -> Result<Lsn> {
    match raw {
        Some(s) => Lsn::parse(s),
        None => Err(TransformError::Parse(format!("{action} message missing lsn"))),
    }
}

fn require_xid(raw: &RawMessage) -> Result<u32> {
    raw.xid.ok_or_else(|| TransformError::Parse(format!("{} message missing xid", raw.action)))
}

fn require_schema_table(raw: &RawMessage) -> Result<(String, String)> {
    let schema = raw.schema.clone().ok_or_else(|| TransformError::Parse(format!("{} message missing schema", raw.action)))?;
    let table = raw.table.clone().ok_or_else(|| TransformError::Parse(format!("{} message missing table", raw.action)))?;
    Ok((schema, table))
}

fn to_message(raw: RawMessage) -> Result<Message> {
    let timestamp = parse_timestamp(&raw.timestamp)?;
    match raw.action.as_str() {
        "B" => Ok(Message::Begin { xid: require_xid(&raw)?, lsn: parse_lsn(&raw.lsn, "BEGIN")?, timestamp }),
        "C" => Ok(Message::Commit { xid: require_xid(&raw)?, lsn: parse_lsn(&raw.lsn, "COMMIT")?, timestamp }),
        "I" => {
            let (schema, table) = require_schema_table(&raw)?;
            let (new, warn_multi_row) = crate::value::first_tuple_lenient(raw.new)?;
            Ok(Message::Insert { xid: require_xid(&raw)?, schema, table, new, warn_multi_row })
        }
        "U" => {
            let (schema, table) = require_schema_table(&raw)?;
            let identity = single_tuple(raw.identity, "UPDATE identity")?
                .ok_or_else(|| TransformError::Parse("UPDATE message missing identity tuple".to_string()))?;
            let new = single_tuple(raw.new, "UPDATE new")?
                .ok_or_else(|| TransformError::Parse("UPDATE message missing new tuple".to_string()))?;
            Ok(Message::Update { xid: require_xid(&raw)?, schema, table, identity, new })
        }
        "D" => {
            let (schema, table) = require_schema_table(&raw)?;
            let identity = single_tuple(raw.identity, "DELETE identity")?
                .ok_or_else(|| TransformError::Parse("DELETE message missing identity tuple".to_string()))?;
            Ok(Message::Delete { xid: require_xid(&raw)?, schema, table, identity })
        }
        "T" => {
            let (schema, table) = require_schema_table(&raw)?;
            Ok(Message::Truncate { xid: require_xid(&raw)?, schema, table })
        }
        "X" => Ok(Message::Switch { xid: raw.xid, lsn: parse_lsn(&raw.lsn, "SWITCH")?, timestamp }),
        "K" => Ok(Message::Keepalive { xid: raw.xid, lsn: parse_lsn(&raw.lsn, "KEEPALIVE")?, timestamp }),
        other => Err(TransformError::Parse(format!("unrecognized message action {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_dialect_begin() {
        let line = r#"{"message": "{\"action\":\"B\",\"xid\":42,\"lsn\":\"0/A00\",\"timestamp\":\"2026-01-01T00:00:00Z\"}"}"#;
        match parse_line(line).unwrap() {
            Message::Begin { xid, lsn, .. } => {
                assert_eq!(xid, 42);
                assert_eq!(lsn, Lsn::parse("0/A00").unwrap());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn parses_object_dialect_insert() {
        let line = r#"{"message": {"action":"I","xid":7,"schema":"public","table":"widgets",
            "new":[{"columnnames":["id","name"],"columnvalues":[
                {"type":"int8","value":1},{"type":"text","value":"bolt"}]}]}}"#;
        match parse_line(line).unwrap() {
            Message::Insert { schema, table, new, warn_multi_row, .. } => {
                assert_eq!(schema, "public");
                assert_eq!(table, "widgets");
                assert!(!warn_multi_row);
                let tuple = new.unwrap();
                assert_eq!(tuple.columns, vec!["id", "name"]);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_line("not json at all").is_err());
    }

    #[test]
    fn rejects_update_without_identity() {
        let line = r#"{"message": {"action":"U","xid":7,"schema":"public","table":"widgets",
            "new":[{"columnnames":["id"],"columnvalues":[{"type":"int8","value":1}]}]}}"#;
        assert!(parse_line(line).is_err());
    }
}
