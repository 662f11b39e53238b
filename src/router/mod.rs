//! Connection routing for pinned views.

use crate::config::DEFAULT_DB_ALIAS;
use crate::registry::ViewDefinition;

/// Decides which database aliases a view belongs to.
///
/// The default implementations honor the per-view `database` pin: a pinned
/// view is only installed (and refreshed) on its own alias, everything else
/// lives on [`DEFAULT_DB_ALIAS`]. Hosts with richer routing rules implement
/// this trait themselves.
pub trait Router: Send + Sync {
    /// May `view` be installed on the connection named `alias`?
    fn allow_sync(&self, alias: &str, view: &ViewDefinition) -> bool {
        match view.database.as_deref() {
            Some(pin) => pin == alias,
            None => alias == DEFAULT_DB_ALIAS,
        }
    }

    /// Alias whose connection performs refreshes of `view`.
    fn db_for_refresh(&self, view: &ViewDefinition) -> String {
        view.database
            .clone()
            .unwrap_or_else(|| DEFAULT_DB_ALIAS.to_string())
    }
}

/// Pin-honoring router used when the host does not supply one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRouter;

impl Router for DefaultRouter {}
