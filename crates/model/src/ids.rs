use serde::{Deserialize, Serialize};
use std::fmt;

/// A database-assigned 32-bit object id (Postgres `oid`), stable across a run.
///
/// `0` is the sentinel value returned by lookups that find nothing (§4.1,
/// "Lookup by id: zero-row result returns an entity with id 0").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub const NONE: ObjectId = ObjectId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ObjectId {
    fn from(v: u32) -> Self {
        ObjectId(v)
    }
}

/// Identifies one run directory; used as a catalog-file discriminant and as
/// a queue payload tag when more than one run shares a process (tests).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunId {
    fn from(v: &str) -> Self {
        RunId(v.to_string())
    }
}

/// Identifies one `(tableoid, partnum)` unit of copy work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartId {
    pub table_oid: ObjectId,
    pub part_num: u32,
}

impl PartId {
    pub fn new(table_oid: ObjectId, part_num: u32) -> Self {
        Self {
            table_oid,
            part_num,
        }
    }

    pub fn whole_table(table_oid: ObjectId) -> Self {
        Self::new(table_oid, 0)
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table_oid, self.part_num)
    }
}
