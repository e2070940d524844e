//! Database-specific error types and conversions.

use portico_core::error::PorticoError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Stored document could not be decoded: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid database configuration: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Decode(err.to_string())
    }
}

impl From<DbError> for PorticoError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } if entity == "package" => {
                PorticoError::PackageNotFound { code: id }
            }
            DbError::NotFound { id, .. } => PorticoError::ProductNotFound { id },
            config @ DbError::Config(_) => PorticoError::Internal(config.to_string()),
            other => PorticoError::Database(other.to_string()),
        }
    }
}
