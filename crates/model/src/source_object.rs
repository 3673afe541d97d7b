//! `SourceObject` variants (§3): stable descriptions of the things a
//! migration moves, keyed by the source database's own object id.

use crate::ids::ObjectId;
use serde::{Deserialize, Serialize};

/// One column of a table, in ordinal position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub ordinal: i32,
}

/// A table enumerated from the source catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTable {
    pub oid: ObjectId,
    pub namespace: String,
    pub relname: String,
    /// Vendor dump restore-list label, used to filter `pg_restore` output.
    pub restore_list_label: String,
    pub estimated_bytes: i64,
    pub estimated_rows: i64,
    /// Name of a unique integer column usable for partitioning, if any.
    pub part_key: Option<String>,
    pub attributes: Vec<Attribute>,
    pub indexes: Vec<ObjectId>,
    pub exclude_data: bool,
}

impl SourceTable {
    pub fn qualified_name(&self) -> String {
        format!("\"{}\".\"{}\"", self.namespace, self.relname)
    }

    /// Whether this table carries a usable partition key (§4.3 Stage B).
    pub fn is_partitionable(&self) -> bool {
        self.part_key.is_some()
    }
}

/// One byte-balanced slice of a table's rows, generated during Stage B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePartition {
    pub table_oid: ObjectId,
    pub part_num: u32,
    pub part_count: u32,
    /// `COPY (SELECT ... WHERE <predicate>) TO STDOUT`; empty for single-part tables.
    pub predicate: String,
}

/// An index enumerated from the source catalog. May additionally back a
/// constraint, in which case `constraint_*` fields are populated (§3 invariant 4:
/// index and constraint summary rows are tracked as distinct entities even
/// when they share the same underlying index object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub oid: ObjectId,
    pub namespace: String,
    pub name: String,
    pub table_oid: ObjectId,
    pub definition: String,
    pub is_primary: bool,
    pub is_unique: bool,
    pub constraint_oid: Option<ObjectId>,
    pub constraint_name: Option<String>,
    pub constraint_definition: Option<String>,
}

impl Index {
    pub fn has_constraint(&self) -> bool {
        self.constraint_oid.is_some()
    }

    /// A constraint that can be installed with `ADD CONSTRAINT ... USING INDEX`
    /// rather than rebuilding the index from scratch (§4.3 constraint worker).
    pub fn constraint_reuses_index(&self) -> bool {
        self.has_constraint() && (self.is_primary || self.is_unique)
    }
}

/// A sequence enumerated from the source catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub oid: ObjectId,
    pub namespace: String,
    pub relname: String,
    pub last_value: i64,
    pub is_called: bool,
}

impl Sequence {
    pub fn qualified_name(&self) -> String {
        format!("\"{}\".\"{}\"", self.namespace, self.relname)
    }
}

/// Kind tag distinguishing the filtered-object hash's entries (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilteredKind {
    Table,
    Index,
    Constraint,
    Sequence,
    Unknown,
}

/// An object excluded from the migration by inclusion/exclusion filters;
/// used to skip matching entries during post-data restore (Stage E).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilteredItem {
    pub oid: ObjectId,
    pub restore_list_label: String,
    pub kind: FilteredKind,
}
