//! Read-only lookups against the PostgreSQL catalogs.

use std::collections::HashSet;

use tokio_postgres::GenericClient;

use crate::error::{ViewError, ViewResult};

/// Does a plain view with this schema and name exist?
pub async fn view_exists<C>(client: &C, schema: &str, name: &str) -> ViewResult<bool>
where
    C: GenericClient + Send + Sync,
{
    let row = client
        .query_one(
            "SELECT COUNT(*) FROM information_schema.views \
             WHERE table_schema = $1 AND table_name = $2",
            &[&schema, &name],
        )
        .await
        .map_err(|e| ViewError::db("count information_schema.views", e))?;
    Ok(row.get::<_, i64>(0) > 0)
}

/// Does a materialized view with this schema and name exist?
pub async fn materialized_view_exists<C>(client: &C, schema: &str, name: &str) -> ViewResult<bool>
where
    C: GenericClient + Send + Sync,
{
    let row = client
        .query_one(
            "SELECT COUNT(*) FROM pg_matviews \
             WHERE schemaname = $1 AND matviewname = $2",
            &[&schema, &name],
        )
        .await
        .map_err(|e| ViewError::db("count pg_matviews", e))?;
    Ok(row.get::<_, i64>(0) > 0)
}

/// The SQL definition PostgreSQL stores for a materialized view, if present.
pub async fn materialized_view_definition<C>(
    client: &C,
    schema: &str,
    name: &str,
) -> ViewResult<Option<String>>
where
    C: GenericClient + Send + Sync,
{
    let row = client
        .query_opt(
            "SELECT definition FROM pg_matviews \
             WHERE schemaname = $1 AND matviewname = $2",
            &[&schema, &name],
        )
        .await
        .map_err(|e| ViewError::db("read pg_matviews definition", e))?;
    Ok(row.map(|r| r.get(0)))
}

/// Names of all indexes currently present on a relation.
pub async fn list_indexes<C>(client: &C, schema: &str, table: &str) -> ViewResult<HashSet<String>>
where
    C: GenericClient + Send + Sync,
{
    let rows = client
        .query(
            "SELECT indexname FROM pg_indexes \
             WHERE tablename = $1 AND schemaname = $2",
            &[&table, &schema],
        )
        .await
        .map_err(|e| ViewError::db("list pg_indexes", e))?;
    Ok(rows.iter().map(|r| r.get(0)).collect())
}
