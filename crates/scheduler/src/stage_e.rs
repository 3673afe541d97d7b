//! Stage E — finalize schema (§4.3): restores the post-data dump section,
//! excluding every object the scheduler already built itself or that the
//! object filter dropped, by restore-list label.

use crate::error::Result;
use catalog::CatalogStore;
use model::{FilteredItem, RestoreOptions};
use std::path::Path;

pub async fn finalize_schema(
    target_conninfo: &str,
    dump_dir: &Path,
    store: &CatalogStore,
    filtered: &[FilteredItem],
    restore_options: &RestoreOptions,
) -> Result<()> {
    let mut skip_labels: Vec<String> = filtered.iter().map(|f| f.restore_list_label.clone()).collect();

    for index in store.list_indexes().await? {
        if store.is_index_done(index.oid).await? {
            skip_labels.push(format!("INDEX {} {}", index.namespace, index.name));
            if let Some(name) = &index.constraint_name {
                skip_labels.push(format!("CONSTRAINT {} {}", index.namespace, name));
            }
        }
    }

    pgconn::dump_restore::restore_post_data(target_conninfo, dump_dir, &skip_labels, restore_options).await?;
    Ok(())
}
