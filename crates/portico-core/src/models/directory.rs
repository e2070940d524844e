//! Wire model of the downstream service directory.
//!
//! The directory lists every registered service with its versions and the
//! apis each version exposes. Portico only reads it.

use serde::{Deserialize, Serialize};

/// Top-level directory reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryResponse {
    pub result: bool,
    #[serde(default)]
    pub data: Option<DirectoryData>,
    /// Remote error detail, present when `result` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryData {
    #[serde(default)]
    pub records: Vec<ServiceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    #[serde(default)]
    pub configuration: ServiceConfiguration,
    #[serde(default)]
    pub versions: Vec<ServiceVersion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfiguration {
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceVersion {
    pub version: String,
    #[serde(default)]
    pub apis: Vec<ServiceApi>,
}

/// One api exposed by a service version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceApi {
    /// Route, e.g. `/users/:id`.
    pub v: String,
    /// HTTP method, lower-case.
    pub m: String,
    #[serde(default)]
    pub group: Option<String>,
}
