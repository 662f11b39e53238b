//! In-process signals fired by the sync engine.
//!
//! Hosts subscribe callbacks to observe per-view outcomes (for cache
//! invalidation, metrics, or follow-up refreshes) without coupling to the
//! syncer itself.

use crate::ddl::SyncStatus;

/// Fired once per view that went through a sync pass.
#[derive(Debug, Clone)]
pub struct ViewSynced {
    /// Logical name of the view.
    pub view: String,
    pub status: SyncStatus,
    /// False when the database object was already up to date.
    pub has_changed: bool,
    pub update: bool,
    pub force: bool,
    /// Database alias the pass ran against.
    pub using: String,
}

/// Fired once after a sync pass settled every declared view.
#[derive(Debug, Clone)]
pub struct AllViewsSynced {
    pub using: String,
}

type ViewSyncedCallback = Box<dyn Fn(&ViewSynced) + Send + Sync>;
type AllViewsSyncedCallback = Box<dyn Fn(&AllViewsSynced) + Send + Sync>;

/// Subscriber registry for sync signals.
#[derive(Default)]
pub struct SignalHub {
    view_synced: Vec<ViewSyncedCallback>,
    all_views_synced: Vec<AllViewsSyncedCallback>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_view_synced<F>(&mut self, callback: F)
    where
        F: Fn(&ViewSynced) + Send + Sync + 'static,
    {
        self.view_synced.push(Box::new(callback));
    }

    pub fn on_all_views_synced<F>(&mut self, callback: F)
    where
        F: Fn(&AllViewsSynced) + Send + Sync + 'static,
    {
        self.all_views_synced.push(Box::new(callback));
    }

    pub(crate) fn send_view_synced(&self, event: &ViewSynced) {
        for callback in &self.view_synced {
            callback(event);
        }
    }

    pub(crate) fn send_all_views_synced(&self, event: &AllViewsSynced) {
        for callback in &self.all_views_synced {
            callback(event);
        }
    }
}

impl std::fmt::Debug for SignalHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalHub")
            .field("view_synced", &self.view_synced.len())
            .field("all_views_synced", &self.all_views_synced.len())
            .finish()
    }
}
