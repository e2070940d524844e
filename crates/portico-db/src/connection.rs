//! SurrealDB connection management.

use config::{Config, Environment};
use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// WebSocket address (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "portico".into(),
            database: "products".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Load `PORTICO_DB_*` environment variables over the defaults.
    ///
    /// Recognized: `PORTICO_DB_URL`, `PORTICO_DB_NAMESPACE`,
    /// `PORTICO_DB_DATABASE`, `PORTICO_DB_USERNAME`, `PORTICO_DB_PASSWORD`.
    pub fn from_env() -> Result<Self, DbError> {
        Self::load(Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix("PORTICO_DB").prefix_separator("_")
    }

    fn load(source: Environment) -> Result<Self, DbError> {
        let config = Config::builder().add_source(source).build()?;
        Ok(config.try_deserialize()?)
    }
}

/// Manages a connection to SurrealDB.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect, authenticate as root, select the configured namespace and
    /// database, and bring the schema up to date.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        run_migrations(&db).await?;

        info!("Connected to SurrealDB, schema is current");

        Ok(Self { db })
    }

    /// Returns a handle to the underlying SurrealDB client.
    pub fn client(&self) -> Surreal<Client> {
        self.db.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn env_overrides_defaults() {
        let config = DbConfig::load(DbConfig::environment().source(Some(vars(&[
            ("PORTICO_DB_URL", "db.internal:8000"),
            ("PORTICO_DB_DATABASE", "staging"),
            ("PORTICO_DIRECTORY_BASE_URL", "http://dir:4000"),
        ]))))
        .unwrap();

        assert_eq!(config.url, "db.internal:8000");
        assert_eq!(config.database, "staging");
        assert_eq!(config.namespace, "portico");
        assert_eq!(config.username, "root");
    }

    #[test]
    fn no_env_keeps_defaults() {
        let config = DbConfig::load(DbConfig::environment().source(Some(vars(&[])))).unwrap();
        assert_eq!(config.url, DbConfig::default().url);
        assert_eq!(config.password, "root");
    }
}
