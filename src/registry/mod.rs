//! Declared view definitions and the registry that holds them.

use serde::{Deserialize, Serialize};

use crate::error::{ViewError, ViewResult};
use crate::utils::quote_relation;
use crate::validation::{validate_column_list, validate_identifier, validate_relation_name};

/// Whether a definition targets a plain or a materialized view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewKind {
    Plain,
    Materialized,
}

/// A named index declared on a materialized view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            unique: true,
            ..Self::new(name, columns)
        }
    }

    pub(crate) fn create_sql(&self, relation: &str) -> String {
        let unique = if self.unique { "UNIQUE " } else { "" };
        let columns = self
            .columns
            .iter()
            .map(|c| postgres_protocol::escape::escape_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE {unique}INDEX {} ON {} ({columns});",
            postgres_protocol::escape::escape_identifier(&self.name),
            quote_relation(relation),
        )
    }
}

/// A declared view: everything the sync engine needs to install one view or
/// materialized view on a database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewDefinition {
    /// Logical name used in dependency declarations and signals, by
    /// convention `"app.ViewName"`.
    pub name: String,
    /// Target relation, optionally schema-qualified (`"schema.view"`).
    pub db_table: String,
    /// The `SELECT` body of the view.
    pub sql: String,
    pub kind: ViewKind,
    /// Materialized views only: populate on creation (`WITH DATA`).
    pub with_data: bool,
    /// Materialized views only: comma-separated column list backing a unique
    /// index that allows `REFRESH ... CONCURRENTLY`.
    pub concurrent_index: Option<String>,
    /// Materialized views only: additional declared indexes.
    pub indexes: Vec<IndexSpec>,
    /// Logical names of views that must be installed first.
    pub dependencies: Vec<String>,
    /// Pin to a named database connection; unpinned views live on the
    /// default alias.
    pub database: Option<String>,
}

impl ViewDefinition {
    /// A plain view definition.
    pub fn plain(
        name: impl Into<String>,
        db_table: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            db_table: db_table.into(),
            sql: sql.into(),
            kind: ViewKind::Plain,
            with_data: false,
            concurrent_index: None,
            indexes: Vec::new(),
            dependencies: Vec::new(),
            database: None,
        }
    }

    /// A materialized view definition, populated on creation.
    pub fn materialized(
        name: impl Into<String>,
        db_table: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            kind: ViewKind::Materialized,
            with_data: true,
            ..Self::plain(name, db_table, sql)
        }
    }

    /// Create the materialized view unpopulated (`WITH NO DATA`).
    pub fn with_no_data(mut self) -> Self {
        self.with_data = false;
        self
    }

    /// Declare the unique index column list enabling concurrent refresh.
    pub fn with_concurrent_index(mut self, columns: impl Into<String>) -> Self {
        self.concurrent_index = Some(columns.into());
        self
    }

    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|d| (*d).to_string()).collect();
        self
    }

    /// Pin this view to a named database connection.
    pub fn pinned_to(mut self, alias: impl Into<String>) -> Self {
        self.database = Some(alias.into());
        self
    }

    pub fn is_materialized(&self) -> bool {
        self.kind == ViewKind::Materialized
    }
}

/// The set of declared views, in registration order.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    views: Vec<ViewDefinition>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a view definition, validating its names.
    pub fn register(&mut self, view: ViewDefinition) -> ViewResult<()> {
        validate_relation_name(&view.db_table)?;
        if let Some(columns) = &view.concurrent_index {
            validate_column_list(columns)?;
        }
        for index in &view.indexes {
            validate_identifier(&index.name, &index.name)?;
        }
        if self.get(&view.name).is_some() {
            return Err(ViewError::DuplicateView {
                name: view.name.clone(),
            });
        }
        self.views.push(view);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ViewDefinition> {
        self.views.iter().find(|v| v.name == name)
    }

    pub fn views(&self) -> &[ViewDefinition] {
        &self.views
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
