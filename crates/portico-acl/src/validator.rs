//! Structural validation of persisted ACL JSON.
//!
//! Two JSON Schemas describe one environment's ACL in apiGroup and in
//! granular form. Validation is structural only: no check is made that a
//! service, version or route actually exists.

use std::collections::BTreeMap;

use jsonschema::Validator;
use portico_core::models::product::{AclForm, PerEnvAcl};
use serde_json::{Value, json};

use crate::error::AclError;

/// Maximum number of schema messages reported per failure.
const MAX_REPORTED_ERRORS: usize = 5;

const NAME_PATTERN: &str = "^[a-zA-Z0-9_.\\-]+$";
const METHOD_PATTERN: &str = "^(get|post|put|patch|delete|del|head|options)$";
const ROUTE_PATTERN: &str = "^/";

fn version_schema(method_schema: Value) -> Value {
    json!({
        "type": "object",
        "properties": {
            "access": { "type": "boolean" },
            "apisPermission": { "type": "string", "enum": ["restricted"] }
        },
        "patternProperties": { (METHOD_PATTERN): method_schema },
        "additionalProperties": false
    })
}

fn service_acl_schema(method_schema: Value) -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "patternProperties": {
            (NAME_PATTERN): {
                "type": "object",
                "patternProperties": { (NAME_PATTERN): version_schema(method_schema) },
                "additionalProperties": false
            }
        },
        "additionalProperties": false
    })
}

/// Schema of one environment's ACL in apiGroup form.
pub fn api_group_schema() -> Value {
    service_acl_schema(json!({
        "type": "array",
        "items": {
            "type": "object",
            "required": ["group", "apis"],
            "properties": {
                "group": { "type": "string", "minLength": 1 },
                "apis": {
                    "type": "object",
                    "patternProperties": {
                        (ROUTE_PATTERN): {
                            "type": "object",
                            "properties": { "access": { "type": "boolean" } },
                            "additionalProperties": false
                        }
                    },
                    "additionalProperties": false
                }
            },
            "additionalProperties": false
        }
    }))
}

/// Schema of one environment's ACL in granular form.
pub fn granular_schema() -> Value {
    service_acl_schema(json!({
        "type": "object",
        "required": ["apis"],
        "properties": {
            "apis": {
                "type": "object",
                "patternProperties": {
                    (ROUTE_PATTERN): {
                        "type": "object",
                        "required": ["group"],
                        "properties": {
                            "group": { "type": "string", "minLength": 1 },
                            "access": { "type": "boolean" }
                        },
                        "additionalProperties": false
                    }
                },
                "additionalProperties": false
            }
        },
        "additionalProperties": false
    }))
}

/// Compiled validators for both persisted forms.
pub struct AclValidator {
    api_group: Validator,
    granular: Validator,
}

impl AclValidator {
    pub fn new() -> Result<Self, AclError> {
        Ok(Self {
            api_group: compile(AclForm::ApiGroup, &api_group_schema())?,
            granular: compile(AclForm::Granular, &granular_schema())?,
        })
    }

    /// Validate one environment's ACL against the schema of `form`.
    pub fn validate(&self, acl: &Value, form: AclForm) -> Result<(), AclError> {
        let validator = match form {
            AclForm::ApiGroup => &self.api_group,
            AclForm::Granular => &self.granular,
        };

        let details: Vec<String> = validator
            .iter_errors(acl)
            .take(MAX_REPORTED_ERRORS)
            .map(|err| err.to_string())
            .collect();

        if details.is_empty() {
            Ok(())
        } else {
            Err(AclError::Schema { form, details })
        }
    }

    /// Validate every environment, each against its own form.
    pub fn validate_env_acl(
        &self,
        acl: &PerEnvAcl,
        forms: &BTreeMap<String, AclForm>,
    ) -> Result<(), AclError> {
        for (env, value) in acl {
            let form = forms.get(env).copied().unwrap_or_default();
            self.validate(value, form)?;
        }
        Ok(())
    }
}

fn compile(form: AclForm, schema: &Value) -> Result<Validator, AclError> {
    jsonschema::validator_for(schema).map_err(|e| AclError::SchemaDefinition {
        form,
        message: e.to_string(),
    })
}
