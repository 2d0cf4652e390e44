use serde::{Deserialize, Serialize};
use std::env;

use crate::models::{Scope, DEFAULT_ID_COLUMN, DEFAULT_UPDATED_AT_COLUMN};
use crate::repositories::Dialect;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub scope: ScopeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub dialect: Dialect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub table: Option<String>,
    pub namespace: Option<String>,
    pub id_column: String,
    pub updated_at_column: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "scope_cache_key.sqlite3".to_string(),
                dialect: Dialect::Sqlite,
            },
            scope: ScopeConfig {
                table: None,
                namespace: None,
                id_column: DEFAULT_ID_COLUMN.to_string(),
                updated_at_column: DEFAULT_UPDATED_AT_COLUMN.to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Applies overrides from `lookup` on top of the defaults.
    pub fn from_vars<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        // Database configuration
        if let Some(path) = lookup("DATABASE_PATH") {
            config.database.path = path;
        }
        if let Some(dialect) = lookup("SCOPE_KEY_DIALECT") {
            config.database.dialect = dialect.parse()?;
        }

        // Scope configuration
        if let Some(table) = lookup("SCOPE_TABLE") {
            config.scope.table = Some(table);
        }
        if let Some(namespace) = lookup("SCOPE_NAMESPACE") {
            config.scope.namespace = Some(namespace);
        }
        if let Some(id_column) = lookup("SCOPE_ID_COLUMN") {
            config.scope.id_column = id_column;
        }
        if let Some(updated_at_column) = lookup("SCOPE_UPDATED_AT_COLUMN") {
            config.scope.updated_at_column = updated_at_column;
        }

        Ok(config)
    }

    pub fn scope(&self) -> anyhow::Result<Scope> {
        let table = self
            .scope
            .table
            .clone()
            .ok_or_else(|| anyhow::anyhow!("SCOPE_TABLE is not set"))?;
        let mut scope = Scope::table(table)
            .id_column(self.scope.id_column.clone())
            .updated_at_column(self.scope.updated_at_column.clone());
        if let Some(namespace) = &self.scope.namespace {
            scope = scope.namespace(namespace.clone());
        }
        Ok(scope)
    }
}
