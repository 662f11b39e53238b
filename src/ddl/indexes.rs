//! Index upkeep on materialized views.

use postgres_protocol::escape::escape_identifier;
use tokio_postgres::Transaction;
use tracing::info;

use crate::catalog;
use crate::error::{ViewError, ViewResult};
use crate::registry::ViewDefinition;
use crate::utils::{quote_relation, schema_and_name};

/// Name of the unique index backing `REFRESH ... CONCURRENTLY`.
///
/// A dot in the relation name (custom schema) becomes an underscore, so the
/// index name stays a plain identifier.
pub fn concurrent_index_name(relation: &str, columns: &str) -> String {
    let columns = columns
        .split(',')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("_");
    format!("{}_{}_index", relation.replace('.', "_"), columns)
}

pub(crate) async fn create_concurrent_index(
    tx: &Transaction<'_>,
    relation: &str,
    columns: &str,
) -> ViewResult<()> {
    let index_name = concurrent_index_name(relation, columns);
    tx.batch_execute(&format!(
        "CREATE UNIQUE INDEX {} ON {} ({columns});",
        escape_identifier(&index_name),
        quote_relation(relation),
    ))
    .await
    .map_err(|e| ViewError::db(format!("create concurrent index on {relation}"), e))
}

/// Reconcile the indexes on an existing materialized view with the declared
/// ones: drop indexes that are no longer declared, create declared indexes
/// that are missing.
///
/// Called when the changed-SQL check decides the view body itself needs no
/// recreate; the body check says nothing about indexes.
pub async fn ensure_indexes(
    tx: &Transaction<'_>,
    pinned_schema: Option<&str>,
    view: &ViewDefinition,
) -> ViewResult<()> {
    let (schema, table) = schema_and_name(pinned_schema, &view.db_table);
    let existing = catalog::list_indexes(tx, &schema, &table).await?;

    let concurrent = view
        .concurrent_index
        .as_ref()
        .map(|columns| concurrent_index_name(&view.db_table, columns));
    let mut required: std::collections::HashSet<String> =
        view.indexes.iter().map(|i| i.name.clone()).collect();
    if let Some(name) = &concurrent {
        required.insert(name.clone());
    }

    for index_name in existing.difference(&required) {
        tx.batch_execute(&format!(
            "DROP INDEX {}.{};",
            escape_identifier(&schema),
            escape_identifier(index_name),
        ))
        .await
        .map_err(|e| ViewError::db(format!("drop index {index_name}"), e))?;
        info!(view = %view.db_table, index = %index_name, "dropped undeclared index");
    }

    for index_name in required.difference(&existing) {
        if Some(index_name) == concurrent.as_ref() {
            let columns = view
                .concurrent_index
                .as_deref()
                .unwrap_or_default();
            create_concurrent_index(tx, &view.db_table, columns).await?;
            info!(view = %view.db_table, "created concurrent-refresh index");
        } else if let Some(index) = view.indexes.iter().find(|i| &i.name == index_name) {
            tx.batch_execute(&index.create_sql(&view.db_table))
                .await
                .map_err(|e| ViewError::db(format!("create index {}", index.name), e))?;
            info!(view = %view.db_table, index = %index.name, "created declared index");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_column_name() {
        assert_eq!(
            concurrent_index_name("viewtest_materializedrelatedviewwithindex", "id"),
            "viewtest_materializedrelatedviewwithindex_id_index"
        );
    }

    #[test]
    fn schema_qualified_name_flattens_the_dot() {
        assert_eq!(
            concurrent_index_name("test_schema.my_custom_view_with_index", "id"),
            "test_schema_my_custom_view_with_index_id_index"
        );
    }

    #[test]
    fn multi_column_lists_are_joined() {
        assert_eq!(
            concurrent_index_name("app_monthly", "id, model_id"),
            "app_monthly_id_model_id_index"
        );
    }
}
