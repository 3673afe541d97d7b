//! Tuple/value model for DML messages (§4.4): a tuple is a parallel array
//! of column names and typed values drawn from a small closed set — null,
//! boolean, signed 64-bit, double, text, or bytea with a pre-quoted flag.

use crate::error::{Result, TransformError};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int8(i64),
    Float8(f64),
    Text(String),
    /// `pre_quoted` marks a bytea literal the source already rendered as a
    /// complete SQL literal (e.g. `E'\\x1234'`); otherwise `data` is the raw
    /// hex payload and the emitter wraps it itself.
    Bytea { data: String, pre_quoted: bool },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum RawValue {
    Null,
    Bool { value: bool },
    Int8 { value: i64 },
    Float8 { value: f64 },
    Text { value: String },
    Bytea { value: String, #[serde(default)] quoted: bool },
}

impl From<RawValue> for Value {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Null => Value::Null,
            RawValue::Bool { value } => Value::Bool(value),
            RawValue::Int8 { value } => Value::Int8(value),
            RawValue::Float8 { value } => Value::Float8(value),
            RawValue::Text { value } => Value::Text(value),
            RawValue::Bytea { value, quoted } => Value::Bytea { data: value, pre_quoted: quoted },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawTuple {
    #[serde(rename = "columnnames")]
    pub columns: Vec<String>,
    #[serde(rename = "columnvalues")]
    pub values: Vec<RawValue>,
}

#[derive(Debug, Clone, Default)]
pub struct Tuple {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl Tuple {
    fn from_raw(raw: RawTuple) -> Result<Self> {
        if raw.columns.len() != raw.values.len() {
            return Err(TransformError::Parse(format!(
                "tuple has {} column names but {} values",
                raw.columns.len(),
                raw.values.len()
            )));
        }
        Ok(Tuple { columns: raw.columns, values: raw.values.into_iter().map(Value::from).collect() })
    }
}

/// Converts the raw per-message tuple list into the single row the
/// transformer actually supports. The wire format carries a list to leave
/// room for batched multi-row messages, but a non-empty count other than
/// one is never produced by the sources this transformer reads from; `what`
/// names the field for the error message.
pub(crate) fn single_tuple(raw: Option<Vec<RawTuple>>, what: &'static str) -> Result<Option<Tuple>> {
    match raw {
        None => Ok(None),
        Some(rows) if rows.len() == 1 => Ok(Some(Tuple::from_raw(rows.into_iter().next().unwrap())?)),
        Some(rows) => Err(TransformError::Parse(format!("{what} carried {} rows, only single-row tuples are supported", rows.len()))),
    }
}

/// Like [`single_tuple`] but tolerant: if more than one row arrives, the
/// first is kept and the rest discarded with a log warning left to the
/// caller, rather than aborting the segment. Used for INSERT's `new`
/// tuple, where a multi-VALUES batch is conceivable on the wire but no
/// known source ever emits one.
pub(crate) fn first_tuple_lenient(raw: Option<Vec<RawTuple>>) -> Result<(Option<Tuple>, bool)> {
    match raw {
        None => Ok((None, false)),
        Some(mut rows) if rows.len() <= 1 => {
            Ok((rows.pop().map(Tuple::from_raw).transpose()?, false))
        }
        Some(mut rows) => {
            let first = rows.remove(0);
            Ok((Some(Tuple::from_raw(first)?), true))
        }
    }
}
