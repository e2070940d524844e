//! Error types for the Portico system.
//!
//! Every variant maps to a stable numeric code via [`PorticoError::code`].
//! Codes and messages are returned to callers unmodified.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PorticoError {
    #[error("Business logic required data are missing: {field}")]
    MissingInput { field: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Unable to find product: {id}")]
    ProductNotFound { id: String },

    #[error("Unable to find package: {code}")]
    PackageNotFound { code: String },

    #[error("Service not found: {name}")]
    ServiceNotFound { name: String },

    #[error("Entity already exists: {entity} {key}")]
    AlreadyExists { entity: String, key: String },

    #[error("You cannot modify or delete a locked record")]
    LockedRecord,

    #[error("You cannot delete the product you are currently using")]
    ActiveProduct,

    #[error("You cannot delete the package you are currently using")]
    ActivePackage,

    #[error("ACL does not match the {form} schema: {details}")]
    SchemaValidation { form: String, details: String },

    #[error("Service directory error: {detail}")]
    Upstream { detail: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PorticoError {
    /// Stable numeric code reported alongside the message.
    pub fn code(&self) -> u16 {
        match self {
            PorticoError::MissingInput { .. } => 400,
            PorticoError::InvalidInput { .. } => 401,
            PorticoError::ProductNotFound { .. } => 460,
            PorticoError::PackageNotFound { .. } => 461,
            PorticoError::ServiceNotFound { .. } => 462,
            PorticoError::AlreadyExists { .. } => 463,
            PorticoError::ActiveProduct => 466,
            PorticoError::ActivePackage => 467,
            PorticoError::SchemaValidation { .. } => 173,
            PorticoError::LockedRecord => 500,
            PorticoError::Upstream { .. } => 503,
            PorticoError::Database(_) => 600,
            PorticoError::Internal(_) => 601,
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        PorticoError::MissingInput {
            field: field.into(),
        }
    }
}

pub type PorticoResult<T> = Result<T, PorticoError>;
