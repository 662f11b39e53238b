//! Crate configuration: tunables, connection settings, and per-run options.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ViewError, ViewResult};

/// Alias used for views that are not pinned to a specific database.
pub const DEFAULT_DB_ALIAS: &str = "default";

/// Maximum number of passes over the sync backlog before the dependency
/// graph is considered unresolvable.
pub const MAX_SYNC_PASSES: usize = 10;

/// Connection settings for a single named database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// `tokio-postgres` connection string or URL.
    pub url: String,
    /// Optional schema pinned onto the session via `search_path`. Views
    /// whose relation name is not schema-qualified land here.
    #[serde(default)]
    pub schema: Option<String>,
}

/// Deserializable settings for the whole sync engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Database alias to connection settings.
    pub databases: HashMap<String, DatabaseSettings>,
    /// Default for [`SyncOptions::check_sql_changed`] when syncing from a
    /// host's post-migrate hook.
    #[serde(default)]
    pub materialized_views_check_sql_changed: bool,
}

impl Settings {
    /// Parse settings from a JSON document.
    pub fn from_json(text: &str) -> ViewResult<Self> {
        serde_json::from_str(text).map_err(|e| ViewError::Config {
            setting: "settings".to_string(),
            reason: e.to_string(),
        })
    }

    /// Read and parse settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ViewResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ViewError::Config {
            setting: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&text)
    }
}

/// Per-run options for a sync pass.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Attempt to update existing plain views in place.
    pub update: bool,
    /// Drop and recreate plain views whose existing schema conflicts with
    /// the declared definition.
    pub force: bool,
    /// Recreate materialized views only when their stored SQL differs from
    /// the declared SQL.
    pub check_sql_changed: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            update: true,
            force: false,
            check_sql_changed: false,
        }
    }
}
