//! Product domain model.
//!
//! A product is the aggregate root for everything ACL-related: it owns the
//! product-level scope ACL and every package. Packages and scope never
//! outlive the product document.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted ACL keyed by lower-cased environment name.
///
/// Each value is one environment's service ACL in its persisted shape
/// (see [`AclForm`]). The engine decodes these on demand and never keeps
/// both shapes alive at once.
pub type PerEnvAcl = BTreeMap<String, serde_json::Value>;

/// Persisted representation of one environment's ACL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AclForm {
    /// Apis bucketed by `{group, apis}` arrays per method.
    #[default]
    #[serde(rename = "apiGroup")]
    ApiGroup,
    /// Apis indexed directly by route under each method.
    #[serde(rename = "granular")]
    Granular,
}

impl AclForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            AclForm::ApiGroup => "apiGroup",
            AclForm::Granular => "granular",
        }
    }
}

impl fmt::Display for AclForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the persisted form for `env`, defaulting to [`AclForm::ApiGroup`].
pub fn form_for_env(acl_type_by_env: &BTreeMap<String, AclForm>, env: &str) -> AclForm {
    acl_type_by_env
        .get(&env.to_lowercase())
        .copied()
        .unwrap_or_default()
}

/// Product-level ACL; the baseline before package-level restriction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeAcl {
    #[serde(default)]
    pub acl: PerEnvAcl,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub acl_type_by_env: BTreeMap<String, AclForm>,
}

impl ScopeAcl {
    pub fn form(&self, env: &str) -> AclForm {
        form_for_env(&self.acl_type_by_env, env)
    }
}

/// A named ACL bundle assignable to a tenant under a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// `<PRODUCT_CODE>_<SUFFIX>`, unique within the product.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Token time-to-live in milliseconds.
    #[serde(rename = "_TTL")]
    pub ttl: u64,
    #[serde(default)]
    pub acl: PerEnvAcl,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub acl_type_by_env: BTreeMap<String, AclForm>,
}

impl Package {
    pub fn form(&self, env: &str) -> AclForm {
        form_for_env(&self.acl_type_by_env, env)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    /// Unique upper-case code, 4 to 6 alphanumeric characters.
    pub code: String,
    pub name: String,
    pub description: String,
    /// Console products back the management console itself.
    pub console: bool,
    /// Locked products reject mutation unless the caller's tenant is locked too.
    pub locked: bool,
    pub scope: ScopeAcl,
    pub packages: Vec<Package>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn package(&self, code: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.code == code)
    }

    pub fn package_mut(&mut self, code: &str) -> Option<&mut Package> {
        self.packages.iter_mut().find(|p| p.code == code)
    }
}

/// Fields required to create a new product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProduct {
    pub code: String,
    pub name: String,
    pub description: String,
    pub console: bool,
    pub locked: bool,
    pub scope: Option<ScopeAcl>,
    pub packages: Vec<Package>,
}

/// Fields that can be updated on an existing product.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub scope: Option<ScopeAcl>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn package_uses_wire_field_names() {
        let pkg: Package = serde_json::from_value(json!({
            "code": "PROD_BASIC",
            "name": "Basic",
            "_TTL": 604_800_000u64,
            "acl": { "dev": {} },
            "aclTypeByEnv": { "dev": "granular" }
        }))
        .unwrap();

        assert_eq!(pkg.ttl, 604_800_000);
        assert_eq!(pkg.form("dev"), AclForm::Granular);
        assert_eq!(pkg.form("DEV"), AclForm::Granular);
        assert_eq!(pkg.form("prod"), AclForm::ApiGroup);
        assert_eq!(pkg.description, "");

        let value = serde_json::to_value(&pkg).unwrap();
        assert_eq!(value["_TTL"], json!(604_800_000u64));
        assert_eq!(value["aclTypeByEnv"]["dev"], json!("granular"));
    }

    #[test]
    fn empty_form_map_is_not_serialized() {
        let scope = ScopeAcl::default();
        let value = serde_json::to_value(&scope).unwrap();
        assert_eq!(value, json!({ "acl": {} }));
    }
}
