use thiserror::Error;

/// Main error type for view synchronization.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A statement against the database failed.
    #[error("database operation '{operation}' failed: {source}")]
    Database {
        operation: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// No connection is registered under the requested alias.
    #[error("unknown database alias '{alias}'")]
    UnknownDatabase { alias: String },

    /// A view with the same logical name is already registered.
    #[error("view '{name}' is already registered")]
    DuplicateView { name: String },

    /// The target relation name is not a valid (optionally schema-qualified)
    /// PostgreSQL identifier.
    #[error("invalid relation name '{name}': {reason}")]
    InvalidRelationName { name: String, reason: String },

    /// A declared column list contains something other than plain column
    /// identifiers.
    #[error("invalid column list '{columns}': {reason}")]
    InvalidColumnList { columns: String, reason: String },

    /// A view declares a dependency that no registered view provides.
    #[error("view '{view}' depends on unknown view '{dependency}'")]
    UnknownDependency { view: String, dependency: String },

    /// The sync backlog did not settle within the pass limit, which means
    /// the declared dependencies form a cycle.
    #[error("view dependencies did not settle after {passes} passes; unresolved: {}", unresolved.join(", "))]
    DependencyCycle {
        passes: usize,
        unresolved: Vec<String>,
    },

    /// Settings could not be read or parsed.
    #[error("configuration error for '{setting}': {reason}")]
    Config { setting: String, reason: String },
}

impl ViewError {
    pub(crate) fn db(operation: impl Into<String>, source: tokio_postgres::Error) -> Self {
        ViewError::Database {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for view synchronization operations.
pub type ViewResult<T> = Result<T, ViewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_cycle_lists_unresolved_views() {
        let err = ViewError::DependencyCycle {
            passes: 10,
            unresolved: vec!["app.A".into(), "app.B".into()],
        };
        assert_eq!(
            err.to_string(),
            "view dependencies did not settle after 10 passes; unresolved: app.A, app.B"
        );
    }

    #[test]
    fn unknown_dependency_names_both_sides() {
        let err = ViewError::UnknownDependency {
            view: "app.Dependant".into(),
            dependency: "app.Missing".into(),
        };
        assert!(err.to_string().contains("app.Dependant"));
        assert!(err.to_string().contains("app.Missing"));
    }
}
