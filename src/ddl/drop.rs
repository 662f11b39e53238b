//! Dropping managed views.

use tracing::info;

use crate::connection::Database;
use crate::ddl::SyncStatus;
use crate::error::{ViewError, ViewResult};
use crate::registry::ViewDefinition;
use crate::utils::quote_relation;

/// Drop a managed view if it exists. Cascades, since dependants managed by
/// the same registry get recreated on the next sync.
pub async fn clear_view(db: &Database, view: &ViewDefinition) -> ViewResult<SyncStatus> {
    let relation = quote_relation(&view.db_table);
    let statement = if view.is_materialized() {
        format!("DROP MATERIALIZED VIEW IF EXISTS {relation} CASCADE;")
    } else {
        format!("DROP VIEW IF EXISTS {relation} CASCADE;")
    };
    db.client()
        .batch_execute(&statement)
        .await
        .map_err(|e| ViewError::db(format!("drop view {}", view.db_table), e))?;
    info!(view = %view.name, relation = %view.db_table, "dropped view");
    Ok(SyncStatus::Dropped)
}
