//! Creating and replacing views and materialized views.

use tokio_postgres::Transaction;
use tracing::info;

use crate::catalog;
use crate::ddl::indexes::{create_concurrent_index, ensure_indexes};
use crate::ddl::SyncStatus;
use crate::error::{ViewError, ViewResult};
use crate::registry::ViewDefinition;
use crate::utils::{normalize_query, quote_relation, schema_and_name};

/// Install a plain view, replacing an existing one where possible.
///
/// Steps:
/// 1. Check whether the view already exists; with `update = false` an
///    existing view is left untouched.
/// 2. Probe for schema conflicts by copying the current view into a
///    temporary view and attempting `CREATE OR REPLACE` of the copy inside
///    a savepoint. A failed probe means the new definition drops or retypes
///    columns the old one had.
/// 3. Without a conflict, `CREATE OR REPLACE VIEW`. With one, `force`
///    decides between drop-cascade-and-recreate and reporting
///    [`SyncStatus::ForceRequired`].
pub async fn create_view(
    tx: &mut Transaction<'_>,
    pinned_schema: Option<&str>,
    view: &ViewDefinition,
    update: bool,
    force: bool,
) -> ViewResult<SyncStatus> {
    let (schema, name) = schema_and_name(pinned_schema, &view.db_table);
    let exists = catalog::view_exists(&*tx, &schema, &name).await?;
    if exists && !update {
        return Ok(SyncStatus::Exists);
    }

    let relation = quote_relation(&view.db_table);
    let query = normalize_query(&view.sql);

    let mut force_required = false;
    if exists {
        tx.batch_execute(&format!(
            "CREATE TEMPORARY VIEW check_conflict AS SELECT * FROM {relation};"
        ))
        .await
        .map_err(|e| ViewError::db(format!("copy view {} for conflict check", view.db_table), e))?;

        let probe = format!("CREATE OR REPLACE TEMPORARY VIEW check_conflict AS {query};");
        let savepoint = tx
            .savepoint("pg_views_conflict_check")
            .await
            .map_err(|e| ViewError::db("open conflict-check savepoint", e))?;
        let probe_result = savepoint.batch_execute(&probe).await;
        match probe_result {
            Ok(()) => savepoint
                .commit()
                .await
                .map_err(|e| ViewError::db("release conflict-check savepoint", e))?,
            Err(_) => {
                force_required = true;
                savepoint
                    .rollback()
                    .await
                    .map_err(|e| ViewError::db("roll back conflict-check savepoint", e))?;
            }
        }

        tx.batch_execute("DROP VIEW IF EXISTS check_conflict;")
            .await
            .map_err(|e| ViewError::db("drop conflict-check view", e))?;
    }

    let status = if !force_required {
        tx.batch_execute(&format!("CREATE OR REPLACE VIEW {relation} AS {query};"))
            .await
            .map_err(|e| ViewError::db(format!("create or replace view {}", view.db_table), e))?;
        if exists {
            SyncStatus::Updated
        } else {
            SyncStatus::Created
        }
    } else if force {
        tx.batch_execute(&format!("DROP VIEW IF EXISTS {relation} CASCADE;"))
            .await
            .map_err(|e| ViewError::db(format!("force-drop view {}", view.db_table), e))?;
        tx.batch_execute(&format!("CREATE VIEW {relation} AS {query};"))
            .await
            .map_err(|e| ViewError::db(format!("recreate view {}", view.db_table), e))?;
        SyncStatus::Forced
    } else {
        SyncStatus::ForceRequired
    };

    Ok(status)
}

/// Install a materialized view.
///
/// With `check_sql_changed`, an existing view is compared against the
/// declared SQL first: the declared query is materialized into a throwaway
/// `<name>_temp` view `WITH NO DATA` and the definitions PostgreSQL stores
/// for both are compared. Identical definitions keep the existing view (and
/// its data); only its indexes are reconciled. Anything else drops and
/// recreates the view.
pub async fn create_materialized_view(
    tx: &mut Transaction<'_>,
    pinned_schema: Option<&str>,
    view: &ViewDefinition,
    check_sql_changed: bool,
) -> ViewResult<SyncStatus> {
    let (schema, name) = schema_and_name(pinned_schema, &view.db_table);
    let exists = catalog::materialized_view_exists(&*tx, &schema, &name).await?;

    let relation = quote_relation(&view.db_table);
    let query = normalize_query(&view.sql);

    if check_sql_changed && exists {
        let temp_table = format!("{}_temp", view.db_table);
        let (_, temp_name) = schema_and_name(pinned_schema, &temp_table);
        let temp_relation = quote_relation(&temp_table);

        drop_materialized(tx, &temp_relation).await?;
        tx.batch_execute(&format!(
            "CREATE MATERIALIZED VIEW {temp_relation} AS {query} WITH NO DATA;"
        ))
        .await
        .map_err(|e| ViewError::db(format!("materialize probe for {}", view.db_table), e))?;

        let current = catalog::materialized_view_definition(&*tx, &schema, &name).await?;
        let declared = catalog::materialized_view_definition(&*tx, &schema, &temp_name).await?;
        drop_materialized(tx, &temp_relation).await?;

        if current.is_some() && current == declared {
            ensure_indexes(tx, pinned_schema, view).await?;
            return Ok(SyncStatus::Exists);
        }
    }

    if exists {
        drop_materialized(tx, &relation).await?;
        info!(view = %view.name, "dropped stale materialized view");
    }

    let data_clause = if view.with_data {
        "WITH DATA"
    } else {
        "WITH NO DATA"
    };
    tx.batch_execute(&format!(
        "CREATE MATERIALIZED VIEW {relation} AS {query} {data_clause};"
    ))
    .await
    .map_err(|e| ViewError::db(format!("create materialized view {}", view.db_table), e))?;

    if let Some(columns) = &view.concurrent_index {
        create_concurrent_index(tx, &view.db_table, columns).await?;
        info!(view = %view.name, "created concurrent-refresh index");
    }
    for index in &view.indexes {
        tx.batch_execute(&index.create_sql(&view.db_table))
            .await
            .map_err(|e| ViewError::db(format!("create index {}", index.name), e))?;
        info!(view = %view.name, index = %index.name, "created index");
    }

    Ok(if exists {
        SyncStatus::Updated
    } else {
        SyncStatus::Created
    })
}

pub(crate) async fn drop_materialized(
    tx: &Transaction<'_>,
    quoted_relation: &str,
) -> ViewResult<()> {
    tx.batch_execute(&format!(
        "DROP MATERIALIZED VIEW IF EXISTS {quoted_relation} CASCADE;"
    ))
    .await
    .map_err(|e| ViewError::db(format!("drop materialized view {quoted_relation}"), e))
}
