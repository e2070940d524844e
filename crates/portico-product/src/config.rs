//! Product service and directory client configuration.
//!
//! Both configs load from `PORTICO_*` environment variables over their
//! defaults. A variable that does not parse is an error, never ignored.

use config::{Config, Environment};
use portico_core::models::product::AclForm;
use serde::Deserialize;

use crate::error::ConfigError;

/// Configuration for the product and package services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProductServiceConfig {
    /// Form given to package environments created without an explicit one.
    pub default_acl_form: AclForm,
    /// Package token lifetime in hours when none is given (default: 168 = 7 days).
    pub package_ttl_hours: u64,
    /// Environments ACLs may be written for. Empty accepts any name.
    pub environments: Vec<String>,
}

impl Default for ProductServiceConfig {
    fn default() -> Self {
        Self {
            default_acl_form: AclForm::ApiGroup,
            package_ttl_hours: 168,
            environments: Vec::new(),
        }
    }
}

impl ProductServiceConfig {
    /// Load `PORTICO_*` environment variables over the defaults.
    ///
    /// Recognized: `PORTICO_PACKAGE_TTL_HOURS`, `PORTICO_ENVIRONMENTS`
    /// (comma separated), `PORTICO_DEFAULT_ACL_FORM` (`apiGroup` or `granular`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix("PORTICO")
            .prefix_separator("_")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("environments")
    }

    fn load(source: Environment) -> Result<Self, ConfigError> {
        let mut loaded: Self = Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        loaded.environments = loaded
            .environments
            .iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Ok(loaded)
    }

    /// Whether `env` (already lower-cased) may carry an ACL.
    pub fn allows_env(&self, env: &str) -> bool {
        self.environments.is_empty() || self.environments.iter().any(|e| e.eq_ignore_ascii_case(env))
    }
}

/// Configuration for the HTTP service directory client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Directory base URL (e.g., `http://controller:4000`).
    pub base_url: String,
    /// Path of the service listing endpoint.
    pub list_path: String,
    /// Request timeout in milliseconds (default: 5000).
    pub timeout_ms: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:4000".into(),
            list_path: "/services/list".into(),
            timeout_ms: 5000,
        }
    }
}

impl DirectoryConfig {
    /// Load `PORTICO_DIRECTORY_*` environment variables over the defaults.
    ///
    /// Recognized: `PORTICO_DIRECTORY_BASE_URL`, `PORTICO_DIRECTORY_LIST_PATH`,
    /// `PORTICO_DIRECTORY_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix("PORTICO_DIRECTORY")
            .prefix_separator("_")
            .try_parsing(true)
    }

    fn load(source: Environment) -> Result<Self, ConfigError> {
        let config = Config::builder().add_source(source).build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn list_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.list_path.trim_start_matches('/')
        )
    }
}
