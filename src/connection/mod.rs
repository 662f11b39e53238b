//! Named database connections and routing-aware lookup.

use std::collections::HashMap;

use postgres_protocol::escape::escape_identifier;
use tokio_postgres::{Client, NoTls};
use tracing::error;

use crate::config::Settings;
use crate::error::{ViewError, ViewResult};
use crate::registry::ViewDefinition;
use crate::router::Router;
use crate::validation::validate_identifier;

/// One live connection, addressed by alias.
pub struct Database {
    alias: String,
    schema_name: Option<String>,
    client: Client,
}

impl Database {
    pub fn new(alias: impl Into<String>, client: Client) -> Self {
        Self {
            alias: alias.into(),
            schema_name: None,
            client,
        }
    }

    /// Record the schema this connection is pinned to. The caller is
    /// responsible for the matching `search_path`; [`ConnectionSet::connect`]
    /// does both.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema_name = Some(schema.into());
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("alias", &self.alias)
            .field("schema_name", &self.schema_name)
            .finish()
    }
}

/// All configured connections, alias to [`Database`].
#[derive(Debug, Default)]
pub struct ConnectionSet {
    databases: HashMap<String, Database>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect every database named in `settings` and apply pinned schemas
    /// via `SET search_path`.
    pub async fn connect(settings: &Settings) -> ViewResult<Self> {
        let mut set = Self::new();
        for (alias, database_settings) in &settings.databases {
            let (client, connection) = tokio_postgres::connect(&database_settings.url, NoTls)
                .await
                .map_err(|e| ViewError::db(format!("connect to '{alias}'"), e))?;
            let driver_alias = alias.clone();
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    error!(alias = %driver_alias, %err, "postgres connection terminated");
                }
            });

            let mut database = Database::new(alias.clone(), client);
            if let Some(schema) = &database_settings.schema {
                validate_identifier(schema, schema)?;
                database
                    .client()
                    .batch_execute(&format!(
                        "SET search_path TO {}, public;",
                        escape_identifier(schema)
                    ))
                    .await
                    .map_err(|e| ViewError::db(format!("set search_path on '{alias}'"), e))?;
                database = database.with_schema(schema.clone());
            }
            set.insert(database);
        }
        Ok(set)
    }

    pub fn insert(&mut self, database: Database) {
        self.databases.insert(database.alias.clone(), database);
    }

    pub fn get(&self, alias: &str) -> Option<&Database> {
        self.databases.get(alias)
    }

    pub fn get_mut(&mut self, alias: &str) -> Option<&mut Database> {
        self.databases.get_mut(alias)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }

    /// The connection a view should use on alias `using`.
    ///
    /// In restricted mode, returns `None` when the router does not allow the
    /// view on that alias, signalling that the view must be skipped there.
    pub fn view_connection(
        &mut self,
        router: &dyn Router,
        view: &ViewDefinition,
        using: &str,
        restricted: bool,
    ) -> Option<&mut Database> {
        if restricted && !router.allow_sync(using, view) {
            return None;
        }
        self.databases.get_mut(using)
    }
}
