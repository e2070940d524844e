//! ACL engine error types.

use portico_core::error::PorticoError;
use portico_core::models::product::AclForm;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AclError {
    #[error("malformed {form} ACL: {message}")]
    Malformed { form: AclForm, message: String },

    #[error("ACL does not match the {form} schema: {}", .details.join("; "))]
    Schema { form: AclForm, details: Vec<String> },

    #[error("invalid {form} schema definition: {message}")]
    SchemaDefinition { form: AclForm, message: String },
}

impl From<AclError> for PorticoError {
    fn from(err: AclError) -> Self {
        match err {
            AclError::Malformed { form, message } => PorticoError::SchemaValidation {
                form: form.to_string(),
                details: message,
            },
            AclError::Schema { form, details } => PorticoError::SchemaValidation {
                form: form.to_string(),
                details: details.join("; "),
            },
            AclError::SchemaDefinition { .. } => PorticoError::Internal(err.to_string()),
        }
    }
}
