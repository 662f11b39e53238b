//! Declare PostgreSQL views and materialized views next to the tables your
//! schema system already manages, and keep the database in step with the
//! declarations.
//!
//! A [`ViewRegistry`] holds [`ViewDefinition`]s: the SQL body, plain or
//! materialized, declared indexes, dependencies on other declared views,
//! and an optional pin to a named database connection. The sync engine
//! ([`ViewSyncer`]) installs them in dependency order, replacing stale
//! definitions and leaving matching ones alone; [`ViewRefresher`] refreshes
//! materialized views the same way. A [`Router`] decides which declared
//! views belong on which connection in a [`ConnectionSet`].
//!
//! ```no_run
//! use pg_views::{
//!     ConnectionSet, DefaultRouter, Settings, SignalHub, SyncOptions, ViewDefinition,
//!     ViewRegistry,
//! };
//!
//! # async fn example() -> pg_views::ViewResult<()> {
//! let mut registry = ViewRegistry::new();
//! registry.register(ViewDefinition::materialized(
//!     "reports.MonthlyObservation",
//!     "reports_monthly_observation",
//!     "SELECT date_trunc('month', date) AS month, count(*) FROM observation GROUP BY 1",
//! ))?;
//!
//! let settings = Settings::from_file("pg_views.json")?;
//! let mut connections = ConnectionSet::connect(&settings).await?;
//! let signals = SignalHub::new();
//!
//! pg_views::sync_views(
//!     &registry,
//!     &DefaultRouter,
//!     &signals,
//!     &mut connections,
//!     pg_views::DEFAULT_DB_ALIAS,
//!     &SyncOptions::default(),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod connection;
pub mod ddl;
pub mod error;
pub mod refresh;
pub mod registry;
pub mod router;
pub mod signals;
pub mod sync;

mod dependency;
mod utils;
mod validation;

pub use config::{Settings, SyncOptions, DEFAULT_DB_ALIAS};
pub use connection::{ConnectionSet, Database};
pub use ddl::SyncStatus;
pub use error::{ViewError, ViewResult};
pub use refresh::refresh_materialized_view;
pub use registry::{IndexSpec, ViewDefinition, ViewKind, ViewRegistry};
pub use router::{DefaultRouter, Router};
pub use signals::{AllViewsSynced, SignalHub, ViewSynced};
pub use sync::{clear_views, refresh_views, sync_views, SyncReport, ViewRefresher, ViewSyncer};

/// Crate version, for hosts that surface it in diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
