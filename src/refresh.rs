//! Refreshing materialized views.

use tracing::info;

use crate::connection::Database;
use crate::error::{ViewError, ViewResult};
use crate::registry::ViewDefinition;
use crate::utils::quote_relation;

/// Refresh one materialized view.
///
/// `CONCURRENTLY` is only used when requested *and* the view declares a
/// concurrent index; PostgreSQL rejects concurrent refresh without a unique
/// index covering all rows.
pub async fn refresh_materialized_view(
    db: &Database,
    view: &ViewDefinition,
    concurrently: bool,
) -> ViewResult<()> {
    let statement = refresh_statement(
        &quote_relation(&view.db_table),
        concurrently && view.concurrent_index.is_some(),
    );
    db.client()
        .batch_execute(&statement)
        .await
        .map_err(|e| ViewError::db(format!("refresh materialized view {}", view.db_table), e))?;
    info!(view = %view.name, alias = %db.alias(), "refreshed materialized view");
    Ok(())
}

pub(crate) fn refresh_statement(quoted_relation: &str, concurrently: bool) -> String {
    if concurrently {
        format!("REFRESH MATERIALIZED VIEW CONCURRENTLY {quoted_relation};")
    } else {
        format!("REFRESH MATERIALIZED VIEW {quoted_relation};")
    }
}
