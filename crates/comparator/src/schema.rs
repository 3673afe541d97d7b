//! Schema comparison (§4.5/§4.7): re-fetch both inventories into their own
//! Catalog Store, then look up each source object on the target by
//! qualified name and report every mismatch. Per §9's Open Questions, an
//! object's index list is walked pairwise against its counterpart in
//! declaration order and only the first divergence is reported — there is
//! no best-match pairing across reordered or renamed indexes.

use catalog::CatalogStore;
use model::{Index, Sequence, SourceTable};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SchemaMismatch {
    MissingTable { qualified_name: String },
    AttributeCount { qualified_name: String, source: usize, target: usize },
    AttributeNames { qualified_name: String, source: Vec<String>, target: Vec<String> },
    IndexDivergence { qualified_name: String, detail: String },
    MissingSequence { qualified_name: String },
    SequenceLastValue { qualified_name: String, source: i64, target: i64 },
    SequenceIsCalled { qualified_name: String, source: bool, target: bool },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaComparisonReport {
    pub mismatches: Vec<SchemaMismatch>,
}

impl SchemaComparisonReport {
    pub fn has_mismatches(&self) -> bool {
        !self.mismatches.is_empty()
    }
}

/// Runs the full comparison against two already-populated Catalog Stores
/// (one per side, each opened with [`catalog::Role::Source`] under its own
/// run-directory namespace, per §6's `source/` and `target/` layout).
pub async fn compare_schemas(source_store: &CatalogStore, target_store: &CatalogStore) -> catalog::Result<SchemaComparisonReport> {
    let source_tables = source_store.list_tables().await?;
    let target_tables = target_store.list_tables().await?;
    let source_indexes = source_store.list_indexes().await?;
    let target_indexes = target_store.list_indexes().await?;
    let source_sequences = source_store.list_sequences().await?;
    let target_sequences = target_store.list_sequences().await?;

    let mut mismatches = Vec::new();

    let target_tables_by_name: HashMap<String, &SourceTable> =
        target_tables.iter().map(|t| (t.qualified_name(), t)).collect();
    let target_indexes_by_table: HashMap<u32, Vec<&Index>> = {
        let mut map: HashMap<u32, Vec<&Index>> = HashMap::new();
        for idx in &target_indexes {
            map.entry(idx.table_oid.0).or_default().push(idx);
        }
        map
    };

    for table in &source_tables {
        let qualified_name = table.qualified_name();
        let Some(counterpart) = target_tables_by_name.get(&qualified_name) else {
            mismatches.push(SchemaMismatch::MissingTable { qualified_name });
            continue;
        };

        if table.attributes.len() != counterpart.attributes.len() {
            mismatches.push(SchemaMismatch::AttributeCount {
                qualified_name: qualified_name.clone(),
                source: table.attributes.len(),
                target: counterpart.attributes.len(),
            });
        } else {
            let source_names: Vec<String> = table.attributes.iter().map(|a| a.name.clone()).collect();
            let target_names: Vec<String> = counterpart.attributes.iter().map(|a| a.name.clone()).collect();
            if source_names != target_names {
                mismatches.push(SchemaMismatch::AttributeNames { qualified_name: qualified_name.clone(), source: source_names, target: target_names });
            }
        }

        let mut source_table_indexes: Vec<&Index> = source_indexes.iter().filter(|i| i.table_oid == table.oid).collect();
        let mut target_table_indexes: Vec<&Index> = target_indexes_by_table.get(&counterpart.oid.0).cloned().unwrap_or_default();
        source_table_indexes.sort_by(|a, b| a.name.cmp(&b.name));
        target_table_indexes.sort_by(|a, b| a.name.cmp(&b.name));

        if let Some(detail) = first_index_divergence(&source_table_indexes, &target_table_indexes) {
            mismatches.push(SchemaMismatch::IndexDivergence { qualified_name, detail });
        }
    }

    let target_sequences_by_name: HashMap<String, &Sequence> =
        target_sequences.iter().map(|s| (s.qualified_name(), s)).collect();
    for seq in &source_sequences {
        let qualified_name = seq.qualified_name();
        match target_sequences_by_name.get(&qualified_name) {
            None => mismatches.push(SchemaMismatch::MissingSequence { qualified_name }),
            Some(counterpart) => {
                if seq.last_value != counterpart.last_value {
                    mismatches.push(SchemaMismatch::SequenceLastValue {
                        qualified_name: qualified_name.clone(),
                        source: seq.last_value,
                        target: counterpart.last_value,
                    });
                }
                if seq.is_called != counterpart.is_called {
                    mismatches.push(SchemaMismatch::SequenceIsCalled { qualified_name, source: seq.is_called, target: counterpart.is_called });
                }
            }
        }
    }

    Ok(SchemaComparisonReport { mismatches })
}

/// Walks two already name-sorted index lists pairwise and returns a
/// description of the first position where they diverge, or `None` if
/// every position (up to the shorter list's length, plus a length check)
/// matches. This is a positional walk, not a best-match search.
fn first_index_divergence(source: &[&Index], target: &[&Index]) -> Option<String> {
    for (pos, pair) in source.iter().zip(target.iter()).enumerate() {
        let (s, t) = pair;
        if s.name != t.name {
            return Some(format!("position {pos}: index name {:?} vs {:?}", s.name, t.name));
        }
        if s.definition != t.definition {
            return Some(format!("index {:?}: definition differs", s.name));
        }
        if s.is_primary != t.is_primary || s.is_unique != t.is_unique {
            return Some(format!("index {:?}: isPrimary/isUnique flags differ", s.name));
        }
        if s.constraint_name != t.constraint_name {
            return Some(format!("index {:?}: constraint name differs", s.name));
        }
        if s.constraint_definition != t.constraint_definition {
            return Some(format!("index {:?}: constraint definition differs", s.name));
        }
    }
    if source.len() != target.len() {
        return Some(format!("index count differs: source has {}, target has {}", source.len(), target.len()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Role;
    use model::{Attribute, ObjectId};

    fn table(oid: u32, name: &str, attrs: &[&str]) -> SourceTable {
        SourceTable {
            oid: ObjectId(oid),
            namespace: "public".to_string(),
            relname: name.to_string(),
            restore_list_label: format!("TABLE public {name}"),
            estimated_bytes: 0,
            estimated_rows: 0,
            part_key: None,
            attributes: attrs.iter().enumerate().map(|(i, a)| Attribute { name: a.to_string(), ordinal: i as i32 }).collect(),
            indexes: Vec::new(),
            exclude_data: false,
        }
    }

    #[tokio::test]
    async fn reports_missing_table_on_target() {
        let source = CatalogStore::open_in_memory(Role::Source).unwrap();
        let target = CatalogStore::open_in_memory(Role::Source).unwrap();
        source.upsert_tables(vec![table(1, "widgets", &["id"])], false).await.unwrap();
        target.upsert_tables(vec![], false).await.unwrap();

        let report = compare_schemas(&source, &target).await.unwrap();
        assert!(report.has_mismatches());
        assert!(matches!(&report.mismatches[0], SchemaMismatch::MissingTable { qualified_name } if qualified_name.contains("widgets")));
    }

    #[tokio::test]
    async fn reports_attribute_count_mismatch() {
        let source = CatalogStore::open_in_memory(Role::Source).unwrap();
        let target = CatalogStore::open_in_memory(Role::Source).unwrap();
        source.upsert_tables(vec![table(1, "widgets", &["id", "name"])], false).await.unwrap();
        target.upsert_tables(vec![table(2, "widgets", &["id"])], false).await.unwrap();

        let report = compare_schemas(&source, &target).await.unwrap();
        assert!(matches!(&report.mismatches[0], SchemaMismatch::AttributeCount { .. }));
    }

    #[tokio::test]
    async fn matching_inventories_report_no_mismatches() {
        let source = CatalogStore::open_in_memory(Role::Source).unwrap();
        let target = CatalogStore::open_in_memory(Role::Source).unwrap();
        source.upsert_tables(vec![table(1, "widgets", &["id"])], false).await.unwrap();
        target.upsert_tables(vec![table(2, "widgets", &["id"])], false).await.unwrap();

        let report = compare_schemas(&source, &target).await.unwrap();
        assert!(!report.has_mismatches());
    }
}
