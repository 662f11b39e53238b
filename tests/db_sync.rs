//! End-to-end tests against a live PostgreSQL.
//!
//! Gated behind the `db_test` feature; point `PG_VIEWS_TEST_DSN` at a
//! scratch database first:
//!
//! ```sh
//! PG_VIEWS_TEST_DSN='host=localhost user=postgres dbname=pg_views_test' \
//!     cargo test --features db_test
//! ```
#![cfg(feature = "db_test")]

use pg_views::config::DatabaseSettings;
use pg_views::{
    clear_views, refresh_views, sync_views, ConnectionSet, DefaultRouter, IndexSpec, Settings,
    SignalHub, SyncOptions, SyncStatus, ViewDefinition, ViewRegistry, DEFAULT_DB_ALIAS,
};

fn dsn() -> String {
    std::env::var("PG_VIEWS_TEST_DSN").expect("PG_VIEWS_TEST_DSN must point at a scratch database")
}

async fn connections() -> ConnectionSet {
    let mut settings = Settings::default();
    settings.databases.insert(
        DEFAULT_DB_ALIAS.to_string(),
        DatabaseSettings {
            url: dsn(),
            schema: None,
        },
    );
    ConnectionSet::connect(&settings).await.unwrap()
}

async fn execute(connections: &ConnectionSet, sql: &str) {
    connections
        .get(DEFAULT_DB_ALIAS)
        .unwrap()
        .client()
        .batch_execute(sql)
        .await
        .unwrap();
}

async fn count(connections: &ConnectionSet, sql: &str) -> i64 {
    connections
        .get(DEFAULT_DB_ALIAS)
        .unwrap()
        .client()
        .query_one(sql, &[])
        .await
        .unwrap()
        .get(0)
}

#[tokio::test]
async fn sync_creates_then_reports_exists() {
    let mut connections = connections().await;
    execute(
        &connections,
        "DROP TABLE IF EXISTS dbt_model CASCADE; \
         CREATE TABLE dbt_model (id SERIAL PRIMARY KEY, name TEXT);",
    )
    .await;

    let mut registry = ViewRegistry::new();
    registry
        .register(ViewDefinition::plain(
            "dbt.Related",
            "dbt_related",
            "SELECT id AS model_id, id FROM dbt_model",
        ))
        .unwrap();
    registry
        .register(
            ViewDefinition::plain(
                "dbt.Dependant",
                "dbt_dependant",
                "SELECT model_id FROM dbt_related",
            )
            .with_dependencies(&["dbt.Related"]),
        )
        .unwrap();

    let signals = SignalHub::new();
    let options = SyncOptions {
        update: false,
        ..SyncOptions::default()
    };

    let report = sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        DEFAULT_DB_ALIAS,
        &options,
    )
    .await
    .unwrap();
    assert_eq!(report.status("dbt.Related"), Some(SyncStatus::Created));
    assert_eq!(report.status("dbt.Dependant"), Some(SyncStatus::Created));

    let views = count(
        &connections,
        "SELECT COUNT(*) FROM pg_views WHERE viewname LIKE 'dbt_%'",
    )
    .await;
    assert_eq!(views, 2);

    // Second pass with update = false leaves matching views alone.
    let report = sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        DEFAULT_DB_ALIAS,
        &options,
    )
    .await
    .unwrap();
    assert_eq!(report.status("dbt.Related"), Some(SyncStatus::Exists));
}

#[tokio::test]
async fn force_recreates_conflicting_views_in_dependency_order() {
    let mut connections = connections().await;
    execute(
        &connections,
        "DROP TABLE IF EXISTS dbt_force_model CASCADE; \
         CREATE TABLE dbt_force_model (id SERIAL PRIMARY KEY, name TEXT);",
    )
    .await;
    // Simulate an old state with a different column set.
    execute(
        &connections,
        "CREATE VIEW dbt_force_related AS SELECT id AS model_id, name FROM dbt_force_model; \
         CREATE VIEW dbt_force_dependant AS SELECT name FROM dbt_force_related;",
    )
    .await;

    let mut registry = ViewRegistry::new();
    registry
        .register(ViewDefinition::plain(
            "dbt.ForceRelated",
            "dbt_force_related",
            "SELECT id AS model_id, id FROM dbt_force_model",
        ))
        .unwrap();
    registry
        .register(
            ViewDefinition::plain(
                "dbt.ForceDependant",
                "dbt_force_dependant",
                "SELECT model_id FROM dbt_force_related",
            )
            .with_dependencies(&["dbt.ForceRelated"]),
        )
        .unwrap();

    let signals = SignalHub::new();

    // Without force, the conflicting view is reported, not replaced.
    let report = sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        DEFAULT_DB_ALIAS,
        &SyncOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(
        report.status("dbt.ForceRelated"),
        Some(SyncStatus::ForceRequired)
    );

    let report = sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        DEFAULT_DB_ALIAS,
        &SyncOptions {
            force: true,
            ..SyncOptions::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(report.status("dbt.ForceRelated"), Some(SyncStatus::Forced));

    // The old `name` column is gone from both views.
    let client = connections.get(DEFAULT_DB_ALIAS).unwrap().client();
    assert!(client
        .query_one("SELECT name FROM dbt_force_related", &[])
        .await
        .is_err());
}

#[tokio::test]
async fn materialized_views_refresh_and_check_sql_changed() {
    let mut connections = connections().await;
    execute(
        &connections,
        "DROP TABLE IF EXISTS dbt_obs CASCADE; \
         DROP MATERIALIZED VIEW IF EXISTS dbt_obs_monthly CASCADE; \
         CREATE TABLE dbt_obs (id SERIAL PRIMARY KEY, date DATE, temperature INT);",
    )
    .await;

    let mut registry = ViewRegistry::new();
    registry
        .register(
            ViewDefinition::materialized(
                "dbt.Monthly",
                "dbt_obs_monthly",
                "SELECT date_trunc('month', date) AS month, count(*) AS n \
                 FROM dbt_obs GROUP BY 1",
            )
            .with_index(IndexSpec::new("dbt_obs_monthly_month_idx", &["month"])),
        )
        .unwrap();

    let signals = SignalHub::new();
    let options = SyncOptions {
        check_sql_changed: true,
        ..SyncOptions::default()
    };

    let report = sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        DEFAULT_DB_ALIAS,
        &options,
    )
    .await
    .unwrap();
    assert_eq!(report.status("dbt.Monthly"), Some(SyncStatus::Created));

    execute(
        &connections,
        "INSERT INTO dbt_obs (date, temperature) VALUES ('2022-01-01', 10), ('2022-01-03', 20);",
    )
    .await;

    // Unchanged SQL: the view (and its stale data) survive the sync.
    let report = sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        DEFAULT_DB_ALIAS,
        &options,
    )
    .await
    .unwrap();
    assert_eq!(report.status("dbt.Monthly"), Some(SyncStatus::Exists));
    assert_eq!(count(&connections, "SELECT COUNT(*) FROM dbt_obs_monthly").await, 0);

    let refreshed = refresh_views(
        &registry,
        &DefaultRouter,
        &connections,
        DEFAULT_DB_ALIAS,
        false,
    )
    .await
    .unwrap();
    assert_eq!(refreshed, vec!["dbt.Monthly".to_string()]);
    assert_eq!(count(&connections, "SELECT COUNT(*) FROM dbt_obs_monthly").await, 1);

    // Pretend the database still holds an older definition.
    execute(
        &connections,
        "DROP MATERIALIZED VIEW dbt_obs_monthly CASCADE; \
         CREATE MATERIALIZED VIEW dbt_obs_monthly AS \
         SELECT date_trunc('day', date) AS month, count(*) AS n FROM dbt_obs GROUP BY 1;",
    )
    .await;

    let report = sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        DEFAULT_DB_ALIAS,
        &options,
    )
    .await
    .unwrap();
    assert_eq!(report.status("dbt.Monthly"), Some(SyncStatus::Updated));
    // Recreated WITH DATA from the declared monthly rollup.
    assert_eq!(count(&connections, "SELECT COUNT(*) FROM dbt_obs_monthly").await, 1);
}

#[tokio::test]
async fn unchanged_sync_reconciles_indexes() {
    let mut connections = connections().await;
    execute(
        &connections,
        "DROP TABLE IF EXISTS dbt_idx_model CASCADE; \
         DROP MATERIALIZED VIEW IF EXISTS dbt_idx_view CASCADE; \
         CREATE TABLE dbt_idx_model (id SERIAL PRIMARY KEY, name TEXT);",
    )
    .await;

    let mut registry = ViewRegistry::new();
    registry
        .register(
            ViewDefinition::materialized(
                "dbt.Indexed",
                "dbt_idx_view",
                "SELECT id AS model_id, id FROM dbt_idx_model",
            )
            .with_concurrent_index("id")
            .with_index(IndexSpec::new("dbt_idx_view_model_idx", &["model_id"])),
        )
        .unwrap();

    let signals = SignalHub::new();
    let options = SyncOptions {
        check_sql_changed: true,
        ..SyncOptions::default()
    };
    sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        DEFAULT_DB_ALIAS,
        &options,
    )
    .await
    .unwrap();

    // Drop the declared index and plant a stray one.
    execute(
        &connections,
        "DROP INDEX dbt_idx_view_model_idx; \
         CREATE INDEX dbt_idx_view_stray_idx ON dbt_idx_view (id);",
    )
    .await;

    let report = sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        DEFAULT_DB_ALIAS,
        &options,
    )
    .await
    .unwrap();
    assert_eq!(report.status("dbt.Indexed"), Some(SyncStatus::Exists));

    let indexes: i64 = count(
        &connections,
        "SELECT COUNT(*) FROM pg_indexes \
         WHERE tablename = 'dbt_idx_view' AND schemaname = 'public'",
    )
    .await;
    assert_eq!(indexes, 2);
    let stray: i64 = count(
        &connections,
        "SELECT COUNT(*) FROM pg_indexes WHERE indexname = 'dbt_idx_view_stray_idx'",
    )
    .await;
    assert_eq!(stray, 0);
}

#[tokio::test]
async fn pinned_views_only_sync_on_their_alias() {
    let dsn = dsn();
    let mut settings = Settings::default();
    settings.databases.insert(
        DEFAULT_DB_ALIAS.to_string(),
        DatabaseSettings {
            url: dsn.clone(),
            schema: None,
        },
    );
    settings.databases.insert(
        "weather_db".to_string(),
        DatabaseSettings {
            url: dsn,
            schema: None,
        },
    );
    let mut connections = ConnectionSet::connect(&settings).await.unwrap();

    connections
        .get(DEFAULT_DB_ALIAS)
        .unwrap()
        .client()
        .batch_execute(
            "DROP TABLE IF EXISTS dbt_weather CASCADE; \
             CREATE TABLE dbt_weather (id SERIAL PRIMARY KEY, date DATE);",
        )
        .await
        .unwrap();

    let mut registry = ViewRegistry::new();
    registry
        .register(
            ViewDefinition::materialized(
                "weather.Monthly",
                "dbt_weather_monthly",
                "SELECT date_trunc('month', date) AS month, count(*) AS n \
                 FROM dbt_weather GROUP BY 1",
            )
            .pinned_to("weather_db"),
        )
        .unwrap();
    registry
        .register(ViewDefinition::plain(
            "dbt.Plain",
            "dbt_weather_plain",
            "SELECT id FROM dbt_weather",
        ))
        .unwrap();

    let signals = SignalHub::new();

    let report = sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        DEFAULT_DB_ALIAS,
        &SyncOptions::default(),
    )
    .await
    .unwrap();
    assert!(report.status("weather.Monthly").is_none());
    assert!(report.skipped.contains(&"weather.Monthly".to_string()));
    assert_eq!(report.status("dbt.Plain"), Some(SyncStatus::Created));

    let report = sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        "weather_db",
        &SyncOptions::default(),
    )
    .await
    .unwrap();
    assert!(report.status("weather.Monthly").is_some());
    assert!(report.status("dbt.Plain").is_none());

    // Refresh on the default alias ignores the pinned view.
    let refreshed = refresh_views(
        &registry,
        &DefaultRouter,
        &connections,
        DEFAULT_DB_ALIAS,
        false,
    )
    .await
    .unwrap();
    assert!(refreshed.is_empty());

    let refreshed = refresh_views(&registry, &DefaultRouter, &connections, "weather_db", false)
        .await
        .unwrap();
    assert_eq!(refreshed, vec!["weather.Monthly".to_string()]);
}

#[tokio::test]
async fn clear_drops_routed_views() {
    let mut connections = connections().await;
    execute(
        &connections,
        "DROP TABLE IF EXISTS dbt_clear_model CASCADE; \
         CREATE TABLE dbt_clear_model (id SERIAL PRIMARY KEY);",
    )
    .await;

    let mut registry = ViewRegistry::new();
    registry
        .register(ViewDefinition::plain(
            "dbt.ClearMe",
            "dbt_clear_view",
            "SELECT id FROM dbt_clear_model",
        ))
        .unwrap();

    let signals = SignalHub::new();
    sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        DEFAULT_DB_ALIAS,
        &SyncOptions::default(),
    )
    .await
    .unwrap();

    let dropped = clear_views(&registry, &DefaultRouter, &connections, DEFAULT_DB_ALIAS)
        .await
        .unwrap();
    assert_eq!(dropped, vec!["dbt.ClearMe".to_string()]);

    let remaining = count(
        &connections,
        "SELECT COUNT(*) FROM pg_views WHERE viewname = 'dbt_clear_view'",
    )
    .await;
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn pinned_schema_hosts_unqualified_views() {
    let dsn = dsn();
    // Schema must exist before search_path is applied on connect.
    {
        let connections = connections().await;
        execute(&connections, "CREATE SCHEMA IF NOT EXISTS dbt_other;").await;
    }

    let mut settings = Settings::default();
    settings.databases.insert(
        DEFAULT_DB_ALIAS.to_string(),
        DatabaseSettings {
            url: dsn,
            schema: Some("dbt_other".to_string()),
        },
    );
    let mut connections = ConnectionSet::connect(&settings).await.unwrap();
    execute(
        &connections,
        "DROP TABLE IF EXISTS dbt_schema_model CASCADE; \
         CREATE TABLE dbt_schema_model (id SERIAL PRIMARY KEY, date DATE);",
    )
    .await;

    let mut registry = ViewRegistry::new();
    registry
        .register(ViewDefinition::plain(
            "dbt.SchemaView",
            "dbt_schema_view",
            "SELECT id FROM dbt_schema_model",
        ))
        .unwrap();

    let signals = SignalHub::new();
    sync_views(
        &registry,
        &DefaultRouter,
        &signals,
        &mut connections,
        DEFAULT_DB_ALIAS,
        &SyncOptions::default(),
    )
    .await
    .unwrap();

    let schema: String = connections
        .get(DEFAULT_DB_ALIAS)
        .unwrap()
        .client()
        .query_one(
            "SELECT schemaname::text FROM pg_views WHERE viewname = 'dbt_schema_view'",
            &[],
        )
        .await
        .unwrap()
        .get(0);
    assert_eq!(schema, "dbt_other");
}
