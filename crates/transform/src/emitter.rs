//! SQL rendering (§4.4 "Output rules"): DML messages become explicit,
//! double-quoted `schema.relation` statements with an explicit column
//! list. INSERT carries `OVERRIDING SYSTEM VALUE` so identity-column
//! values replicate verbatim; UPDATE/DELETE build their WHERE clause from
//! the identity tuple. Control records (BEGIN/COMMIT/SWITCH/KEEPALIVE)
//! are written as a short tag followed by a JSON payload, so a downstream
//! reader can tell transaction boundaries and WAL markers apart from
//! ordinary SQL without parsing every line as SQL first.

use crate::error::{Result, TransformError};
use crate::state_machine::OutputRecord;
use crate::value::{Tuple, Value};
use serde_json::json;

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn value_to_sql(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "TRUE".to_string() } else { "FALSE".to_string() },
        Value::Int8(i) => i.to_string(),
        Value::Float8(f) => {
            if f.is_finite() {
                f.to_string()
            } else if f.is_nan() {
                "'NaN'".to_string()
            } else if *f > 0.0 {
                "'Infinity'".to_string()
            } else {
                "'-Infinity'".to_string()
            }
        }
        Value::Text(s) => quote_literal(s),
        Value::Bytea { data, pre_quoted } => {
            if *pre_quoted {
                data.clone()
            } else {
                format!("'\\x{data}'")
            }
        }
    }
}

pub fn render_insert(schema: &str, table: &str, new: Option<&Tuple>) -> Result<String> {
    let tuple = new.ok_or_else(|| TransformError::Parse("INSERT message carried no new tuple".to_string()))?;
    let columns = tuple.columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
    let values = tuple.values.iter().map(value_to_sql).collect::<Vec<_>>().join(", ");
    Ok(format!(
        "INSERT INTO {}.{} ({columns}) OVERRIDING SYSTEM VALUE VALUES ({values});",
        quote_ident(schema),
        quote_ident(table)
    ))
}

fn where_clause(identity: &Tuple) -> String {
    identity
        .columns
        .iter()
        .zip(identity.values.iter())
        .map(|(c, v)| format!("{} = {}", quote_ident(c), value_to_sql(v)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

pub fn render_update(schema: &str, table: &str, identity: &Tuple, new: &Tuple) -> Result<String> {
    if identity.columns.is_empty() {
        return Err(TransformError::Parse("UPDATE message carried an empty identity tuple".to_string()));
    }
    let set_clause = new
        .columns
        .iter()
        .zip(new.values.iter())
        .map(|(c, v)| format!("{} = {}", quote_ident(c), value_to_sql(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "UPDATE {}.{} SET {set_clause} WHERE {};",
        quote_ident(schema),
        quote_ident(table),
        where_clause(identity)
    ))
}

pub fn render_delete(schema: &str, table: &str, identity: &Tuple) -> Result<String> {
    if identity.columns.is_empty() {
        return Err(TransformError::Parse("DELETE message carried an empty identity tuple".to_string()));
    }
    Ok(format!("DELETE FROM {}.{} WHERE {};", quote_ident(schema), quote_ident(table), where_clause(identity)))
}

pub fn render_truncate(schema: &str, table: &str) -> String {
    format!("TRUNCATE TABLE {}.{};", quote_ident(schema), quote_ident(table))
}

/// Renders one output record as a line for the target SQL file. Control
/// records are written as `-- <TAG> {json}` so they stay valid, ignorable
/// SQL comments for any tool that just wants to `psql -f` the file, while
/// still being greppable/parseable by a downstream apply process that
/// cares about transaction boundaries.
pub fn render_line(record: &OutputRecord) -> String {
    match record {
        OutputRecord::Begin { xid, lsn, timestamp } => {
            format!("-- BEGIN {}", json!({"xid": xid, "lsn": lsn.to_string(), "timestamp": timestamp.to_rfc3339()}))
        }
        OutputRecord::Commit { xid, lsn, timestamp } => {
            format!("-- COMMIT {}", json!({"xid": xid, "lsn": lsn.to_string(), "timestamp": timestamp.to_rfc3339()}))
        }
        OutputRecord::Dml(sql) => sql.clone(),
        OutputRecord::Switch { lsn, timestamp } => {
            format!("-- SWITCH {}", json!({"lsn": lsn.to_string(), "timestamp": timestamp.to_rfc3339()}))
        }
        OutputRecord::Keepalive { lsn, timestamp } => {
            format!("-- KEEPALIVE {}", json!({"lsn": lsn.to_string(), "timestamp": timestamp.to_rfc3339()}))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(cols: &[&str], vals: Vec<Value>) -> Tuple {
        Tuple { columns: cols.iter().map(|s| s.to_string()).collect(), values: vals }
    }

    #[test]
    fn insert_uses_overriding_system_value() {
        let new = tuple(&["id", "name"], vec![Value::Int8(1), Value::Text("o'brien".to_string())]);
        let sql = render_insert("public", "widgets", Some(&new)).unwrap();
        assert_eq!(sql, "INSERT INTO \"public\".\"widgets\" (\"id\", \"name\") OVERRIDING SYSTEM VALUE VALUES (1, 'o''brien');");
    }

    #[test]
    fn update_sets_from_new_and_filters_by_identity() {
        let identity = tuple(&["id"], vec![Value::Int8(1)]);
        let new = tuple(&["id", "name"], vec![Value::Int8(1), Value::Text("bolt".to_string())]);
        let sql = render_update("public", "widgets", &identity, &new).unwrap();
        assert_eq!(
            sql,
            "UPDATE \"public\".\"widgets\" SET \"id\" = 1, \"name\" = 'bolt' WHERE \"id\" = 1;"
        );
    }

    #[test]
    fn delete_builds_conjunctive_where_from_identity() {
        let identity = tuple(&["a", "b"], vec![Value::Int8(1), Value::Null]);
        let sql = render_delete("public", "widgets", &identity).unwrap();
        assert_eq!(sql, "DELETE FROM \"public\".\"widgets\" WHERE \"a\" = 1 AND \"b\" = NULL;");
    }

    #[test]
    fn bytea_pre_quoted_passes_through_verbatim() {
        let new = tuple(&["blob"], vec![Value::Bytea { data: "E'\\\\x1234'".to_string(), pre_quoted: true }]);
        let sql = render_insert("public", "blobs", Some(&new)).unwrap();
        assert!(sql.contains("E'\\\\x1234'"));
    }
}
