//! DDL against live connections: create, replace, drop, and index upkeep.

pub mod create;
pub mod drop;
pub mod indexes;

use std::fmt;

pub use create::{create_materialized_view, create_view};
pub use drop::clear_view;
pub use indexes::ensure_indexes;

use serde::{Deserialize, Serialize};

/// Outcome of one sync step for a single view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    /// The view did not exist and was created.
    Created,
    /// An existing view was replaced with the declared definition.
    Updated,
    /// The existing view already matched; nothing was done.
    Exists,
    /// The existing view's schema conflicted and was dropped and recreated
    /// under `force`.
    Forced,
    /// The existing view's schema conflicts; `force` is required to replace
    /// it and was not given.
    ForceRequired,
    /// The view was dropped.
    Dropped,
}

impl SyncStatus {
    /// Whether the database object changed as a result of this step.
    pub fn has_changed(self) -> bool {
        !matches!(self, SyncStatus::Exists | SyncStatus::ForceRequired)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Created => "CREATED",
            SyncStatus::Updated => "UPDATED",
            SyncStatus::Exists => "EXISTS",
            SyncStatus::Forced => "FORCED",
            SyncStatus::ForceRequired => "FORCE_REQUIRED",
            SyncStatus::Dropped => "DROPPED",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
