//! The synchronization engine: dependency-ordered sync, refresh, and clear
//! passes over the declared views.

use tracing::{info, warn};

use crate::config::SyncOptions;
use crate::connection::ConnectionSet;
use crate::ddl::{self, SyncStatus};
use crate::dependency::plan_backlog;
use crate::error::{ViewError, ViewResult};
use crate::refresh::refresh_materialized_view;
use crate::registry::{ViewKind, ViewRegistry};
use crate::router::Router;
use crate::signals::{AllViewsSynced, SignalHub, ViewSynced};

/// What a sync pass did, per view.
#[derive(Debug)]
pub struct SyncReport {
    /// Logical name and resulting status, in execution order.
    pub statuses: Vec<(String, SyncStatus)>,
    /// Views the router excluded from this database.
    pub skipped: Vec<String>,
}

impl SyncReport {
    pub fn status(&self, name: &str) -> Option<SyncStatus> {
        self.statuses
            .iter()
            .find(|(view, _)| view == name)
            .map(|(_, status)| *status)
    }
}

/// Installs every declared view on one database, in dependency order.
pub struct ViewSyncer<'a> {
    registry: &'a ViewRegistry,
    router: &'a dyn Router,
    signals: &'a SignalHub,
}

impl<'a> ViewSyncer<'a> {
    pub fn new(registry: &'a ViewRegistry, router: &'a dyn Router, signals: &'a SignalHub) -> Self {
        Self {
            registry,
            router,
            signals,
        }
    }

    /// Run one sync pass against the database aliased `using`.
    ///
    /// Every view the router allows on `using` is created or updated inside
    /// its own transaction. A `view_synced` signal fires per view and
    /// `all_views_synced` fires once the whole backlog settled.
    pub async fn run(
        &self,
        connections: &mut ConnectionSet,
        using: &str,
        options: &SyncOptions,
    ) -> ViewResult<SyncReport> {
        let plan = plan_backlog(self.registry.views(), |view| {
            self.router.allow_sync(using, view)
        })?;

        if !plan.ordered.is_empty() && connections.get(using).is_none() {
            return Err(ViewError::UnknownDatabase {
                alias: using.to_string(),
            });
        }

        let mut statuses = Vec::with_capacity(plan.ordered.len());
        for view in &plan.ordered {
            // view_connection re-checks routing; planning already filtered,
            // so this only resolves the alias.
            let db = connections
                .view_connection(self.router, view, using, true)
                .ok_or_else(|| ViewError::UnknownDatabase {
                    alias: using.to_string(),
                })?;
            let pinned_schema = db.schema_name().map(str::to_string);

            let mut tx = db
                .client_mut()
                .transaction()
                .await
                .map_err(|e| ViewError::db("begin view sync transaction", e))?;
            let status = match view.kind {
                ViewKind::Materialized => {
                    ddl::create_materialized_view(
                        &mut tx,
                        pinned_schema.as_deref(),
                        view,
                        options.check_sql_changed,
                    )
                    .await?
                }
                ViewKind::Plain => {
                    ddl::create_view(
                        &mut tx,
                        pinned_schema.as_deref(),
                        view,
                        options.update,
                        options.force,
                    )
                    .await?
                }
            };
            tx.commit()
                .await
                .map_err(|e| ViewError::db("commit view sync transaction", e))?;

            self.signals.send_view_synced(&ViewSynced {
                view: view.name.clone(),
                status,
                has_changed: status.has_changed(),
                update: options.update,
                force: options.force,
                using: using.to_string(),
            });

            let message = match status {
                SyncStatus::Created => "created",
                SyncStatus::Updated => "updated",
                SyncStatus::Exists => "already exists, skipping",
                SyncStatus::Forced => "forced overwrite of existing schema",
                SyncStatus::ForceRequired => {
                    "exists with incompatible schema, force required to update"
                }
                SyncStatus::Dropped => "dropped",
            };
            info!(view = %view.name, using = %using, "view {}", message);

            statuses.push((view.name.clone(), status));
        }

        for view in &plan.skipped {
            info!(view = %view.name, using = %using, "skipping view, not routed to this database");
        }

        self.signals
            .send_all_views_synced(&AllViewsSynced {
                using: using.to_string(),
            });

        Ok(SyncReport {
            statuses,
            skipped: plan.skipped.iter().map(|v| v.name.clone()).collect(),
        })
    }
}

/// Refreshes declared materialized views in dependency order.
pub struct ViewRefresher<'a> {
    registry: &'a ViewRegistry,
    router: &'a dyn Router,
}

impl<'a> ViewRefresher<'a> {
    pub fn new(registry: &'a ViewRegistry, router: &'a dyn Router) -> Self {
        Self { registry, router }
    }

    /// Refresh every materialized view routed to `using`, dependants after
    /// their dependencies. Returns the logical names refreshed.
    pub async fn run(
        &self,
        connections: &ConnectionSet,
        using: &str,
        concurrently: bool,
    ) -> ViewResult<Vec<String>> {
        let plan = plan_backlog(self.registry.views(), |view| {
            self.router.allow_sync(using, view)
        })?;

        let mut refreshed = Vec::new();
        for view in &plan.ordered {
            if !view.is_materialized() {
                continue;
            }
            let alias = self.router.db_for_refresh(view);
            let Some(db) = connections.get(&alias) else {
                warn!(view = %view.name, alias = %alias, "no connection to refresh view");
                continue;
            };
            refresh_materialized_view(db, view, concurrently).await?;
            refreshed.push(view.name.clone());
        }
        Ok(refreshed)
    }
}

/// Sync every declared view against the database aliased `using`.
pub async fn sync_views(
    registry: &ViewRegistry,
    router: &dyn Router,
    signals: &SignalHub,
    connections: &mut ConnectionSet,
    using: &str,
    options: &SyncOptions,
) -> ViewResult<SyncReport> {
    ViewSyncer::new(registry, router, signals)
        .run(connections, using, options)
        .await
}

/// Refresh every declared materialized view routed to `using`.
pub async fn refresh_views(
    registry: &ViewRegistry,
    router: &dyn Router,
    connections: &ConnectionSet,
    using: &str,
    concurrently: bool,
) -> ViewResult<Vec<String>> {
    ViewRefresher::new(registry, router)
        .run(connections, using, concurrently)
        .await
}

/// Drop every declared view routed to `using`. Used before table migrations
/// that existing views would block. Returns the logical names dropped.
pub async fn clear_views(
    registry: &ViewRegistry,
    router: &dyn Router,
    connections: &ConnectionSet,
    using: &str,
) -> ViewResult<Vec<String>> {
    let mut dropped = Vec::new();
    for view in registry.views() {
        if !router.allow_sync(using, view) {
            continue;
        }
        let db = connections
            .get(using)
            .ok_or_else(|| ViewError::UnknownDatabase {
                alias: using.to_string(),
            })?;
        ddl::clear_view(db, view).await?;
        dropped.push(view.name.clone());
    }
    Ok(dropped)
}
