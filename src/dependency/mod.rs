//! Dependency-ordered planning of the sync backlog.

use std::collections::HashSet;

use tracing::info;

use crate::config::MAX_SYNC_PASSES;
use crate::error::{ViewError, ViewResult};
use crate::registry::ViewDefinition;

/// Outcome of planning: views to process in order, and views the router
/// excluded from this database.
#[derive(Debug)]
pub(crate) struct BacklogPlan<'a> {
    pub ordered: Vec<&'a ViewDefinition>,
    pub skipped: Vec<&'a ViewDefinition>,
}

/// Order views so every view comes after its declared dependencies.
///
/// Works the way the syncer drains its backlog: repeated passes, each pass
/// taking every view whose dependencies have all settled. Views that
/// `allowed` rejects are skipped; a skipped dependency counts as settled,
/// so its dependants can still be ordered on this database.
///
/// # Errors
/// `UnknownDependency` when a dependency names no registered view;
/// `DependencyCycle` when the backlog has not settled after
/// [`MAX_SYNC_PASSES`] passes.
pub(crate) fn plan_backlog<'a, F>(
    views: &'a [ViewDefinition],
    allowed: F,
) -> ViewResult<BacklogPlan<'a>>
where
    F: Fn(&ViewDefinition) -> bool,
{
    let known: HashSet<&str> = views.iter().map(|v| v.name.as_str()).collect();
    for view in views {
        for dependency in &view.dependencies {
            if !known.contains(dependency.as_str()) {
                return Err(ViewError::UnknownDependency {
                    view: view.name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    let mut backlog: Vec<&ViewDefinition> = views.iter().collect();
    let mut finished: HashSet<&str> = HashSet::new();
    let mut skipped_names: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::new();
    let mut skipped = Vec::new();
    let mut passes = 0;

    while !backlog.is_empty() && passes < MAX_SYNC_PASSES {
        passes += 1;
        let mut requeued = Vec::new();
        for view in backlog {
            if !allowed(view) {
                skipped_names.insert(view.name.as_str());
                skipped.push(view);
                continue;
            }
            let waiting = view
                .dependencies
                .iter()
                .any(|d| !finished.contains(d.as_str()) && !skipped_names.contains(d.as_str()));
            if waiting {
                info!(view = %view.name, "putting view at back of sync queue");
                requeued.push(view);
                continue;
            }
            finished.insert(view.name.as_str());
            ordered.push(view);
        }
        backlog = requeued;
    }

    if !backlog.is_empty() {
        return Err(ViewError::DependencyCycle {
            passes,
            unresolved: backlog.iter().map(|v| v.name.clone()).collect(),
        });
    }

    Ok(BacklogPlan { ordered, skipped })
}
