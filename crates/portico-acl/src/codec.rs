//! Conversion between the persisted ACL shapes and the canonical tree.
//!
//! apiGroup form:
//!
//! ```json
//! { "users": { "1": { "access": true, "apisPermission": "restricted",
//!   "get": [ { "group": "Users", "apis": { "/list": { "access": true } } } ] } } }
//! ```
//!
//! granular form:
//!
//! ```json
//! { "users": { "1": { "access": true, "apisPermission": "restricted",
//!   "get": { "apis": { "/list": { "group": "Users", "access": true } } } } } }
//! ```
//!
//! An api stored without `access` decodes as [`ApiAccess::Inherited`] and
//! encodes back without the key.

use std::collections::BTreeMap;

use portico_core::models::product::AclForm;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AclError;
use crate::tree::{ApiAccess, GroupAcl, MethodAcl, ServiceAcl, ServiceEntry, VersionAcl};

const RESTRICTED: &str = "restricted";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApisPermission {
    Restricted,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireVersion<M> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access: Option<bool>,
    #[serde(
        rename = "apisPermission",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    apis_permission: Option<ApisPermission>,
    #[serde(flatten)]
    methods: BTreeMap<String, M>,
}

type WireServiceAcl<M> = BTreeMap<String, BTreeMap<String, WireVersion<M>>>;

#[derive(Debug, Serialize, Deserialize)]
struct WireApi {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireGroupBlock {
    group: String,
    apis: BTreeMap<String, WireApi>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireGranularApi {
    group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireGranularMethod {
    #[serde(default)]
    apis: BTreeMap<String, WireGranularApi>,
}

// -----------------------------------------------------------------------
// Decode
// -----------------------------------------------------------------------

/// Decode one environment's persisted ACL in the given form.
///
/// `null` decodes to an empty ACL.
pub fn decode(value: &Value, form: AclForm) -> Result<ServiceAcl, AclError> {
    match form {
        AclForm::ApiGroup => decode_api_group(value),
        AclForm::Granular => decode_granular(value),
    }
}

pub fn decode_api_group(value: &Value) -> Result<ServiceAcl, AclError> {
    decode_with(value, AclForm::ApiGroup, |blocks: Vec<WireGroupBlock>| {
        let mut method = MethodAcl::default();
        for block in blocks {
            let group = method.groups.entry(block.group).or_default();
            for (route, api) in block.apis {
                group.apis.insert(route, ApiAccess::from(api.access));
            }
        }
        method
    })
}

pub fn decode_granular(value: &Value) -> Result<ServiceAcl, AclError> {
    decode_with(value, AclForm::Granular, |wire: WireGranularMethod| {
        let mut method = MethodAcl::default();
        for (route, api) in wire.apis {
            method
                .groups
                .entry(api.group)
                .or_default()
                .apis
                .insert(route, ApiAccess::from(api.access));
        }
        method
    })
}

fn decode_with<'de, M, F>(
    value: &'de Value,
    form: AclForm,
    decode_method: F,
) -> Result<ServiceAcl, AclError>
where
    M: Deserialize<'de>,
    F: Fn(M) -> MethodAcl,
{
    if value.is_null() {
        return Ok(ServiceAcl::default());
    }

    let wire = WireServiceAcl::<M>::deserialize(value).map_err(|e| AclError::Malformed {
        form,
        message: e.to_string(),
    })?;

    let mut acl = ServiceAcl::default();
    for (service, versions) in wire {
        let mut entry = ServiceEntry::default();
        for (version, wire_version) in versions {
            let methods = wire_version
                .methods
                .into_iter()
                .map(|(name, m)| (name.to_lowercase(), decode_method(m)))
                .collect();
            entry.versions.insert(
                version,
                VersionAcl {
                    access: wire_version.access,
                    restricted: wire_version.apis_permission.is_some(),
                    methods,
                },
            );
        }
        acl.services.insert(service, entry);
    }
    Ok(acl)
}

// -----------------------------------------------------------------------
// Encode
// -----------------------------------------------------------------------

/// Encode a canonical tree into the given persisted form.
///
/// Group buckets without apis have no granular representation and are
/// dropped when encoding granular.
pub fn encode(acl: &ServiceAcl, form: AclForm) -> Value {
    let mut services = Map::new();
    for (service, entry) in &acl.services {
        let mut versions = Map::new();
        for (version, version_acl) in &entry.versions {
            versions.insert(version.clone(), encode_version(version_acl, form));
        }
        services.insert(service.clone(), Value::Object(versions));
    }
    Value::Object(services)
}

fn encode_version(version: &VersionAcl, form: AclForm) -> Value {
    let mut out = Map::new();
    if let Some(access) = version.access {
        out.insert("access".into(), Value::Bool(access));
    }
    if version.restricted {
        out.insert("apisPermission".into(), Value::String(RESTRICTED.into()));
    }
    for (name, method) in &version.methods {
        let encoded = match form {
            AclForm::ApiGroup => encode_api_group_method(method),
            AclForm::Granular => encode_granular_method(method),
        };
        out.insert(name.clone(), encoded);
    }
    Value::Object(out)
}

fn encode_api_group_method(method: &MethodAcl) -> Value {
    let blocks = method
        .groups
        .iter()
        .map(|(group, bucket)| {
            let mut block = Map::new();
            block.insert("group".into(), Value::String(group.clone()));
            block.insert("apis".into(), Value::Object(encode_group_apis(bucket)));
            Value::Object(block)
        })
        .collect();
    Value::Array(blocks)
}

fn encode_group_apis(bucket: &GroupAcl) -> Map<String, Value> {
    bucket
        .apis
        .iter()
        .map(|(route, access)| {
            let mut api = Map::new();
            if let Some(access) = access.explicit() {
                api.insert("access".into(), Value::Bool(access));
            }
            (route.clone(), Value::Object(api))
        })
        .collect()
}

fn encode_granular_method(method: &MethodAcl) -> Value {
    let mut apis = Map::new();
    for (group, bucket) in &method.groups {
        for (route, access) in &bucket.apis {
            let mut api = Map::new();
            api.insert("group".into(), Value::String(group.clone()));
            if let Some(access) = access.explicit() {
                api.insert("access".into(), Value::Bool(access));
            }
            apis.insert(route.clone(), Value::Object(api));
        }
    }
    let mut out = Map::new();
    out.insert("apis".into(), Value::Object(apis));
    Value::Object(out)
}

/// Re-encode one environment from `from` into `to`.
pub fn convert(value: &Value, from: AclForm, to: AclForm) -> Result<Value, AclError> {
    decode(value, from).map(|tree| encode(&tree, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tree() -> ServiceAcl {
        let mut acl = ServiceAcl::default();
        let users = acl.upsert_version("users", "1", Some(true), true);
        users.set_api("get", "Users", "/list", ApiAccess::Explicit(true));
        users.set_api("get", "Users", "/:id", ApiAccess::Inherited);
        users.set_api("post", "Admin", "/add", ApiAccess::Explicit(false));
        let orders = acl.upsert_version("orders", "2", Some(false), false);
        orders.set_api("delete", "Orders", "/purge", ApiAccess::Inherited);
        acl.services
            .entry("billing".into())
            .or_default()
            .versions
            .insert("1".into(), VersionAcl::new(None, false));
        acl
    }

    #[test]
    fn round_trips_through_both_forms() {
        let tree = sample_tree();
        for form in [AclForm::ApiGroup, AclForm::Granular] {
            let encoded = encode(&tree, form);
            let decoded = decode(&encoded, form).unwrap();
            assert_eq!(decoded, tree, "round trip through {form}");
        }
    }

    #[test]
    fn decodes_api_group_fixture() {
        let value = json!({
            "users": {
                "1": {
                    "access": true,
                    "apisPermission": "restricted",
                    "get": [
                        { "group": "Users", "apis": { "/list": { "access": false } } },
                        { "group": "Users", "apis": { "/:id": {} } }
                    ]
                }
            }
        });

        let acl = decode_api_group(&value).unwrap();
        let version = acl.version("users", "1").unwrap();
        assert_eq!(version.access, Some(true));
        assert!(version.restricted);
        let users = &version.methods["get"].groups["Users"];
        assert_eq!(users.apis["/list"], ApiAccess::Explicit(false));
        assert_eq!(users.apis["/:id"], ApiAccess::Inherited);
    }

    #[test]
    fn decodes_granular_fixture() {
        let value = json!({
            "users": {
                "1": {
                    "GET": {
                        "apis": {
                            "/list": { "group": "Users", "access": true },
                            "/stats": { "group": "Reports" }
                        }
                    }
                }
            }
        });

        let acl = decode_granular(&value).unwrap();
        let version = acl.version("users", "1").unwrap();
        assert_eq!(version.access, None);
        assert!(!version.restricted);
        let get = &version.methods["get"];
        assert_eq!(get.find("/list"), Some(("Users", ApiAccess::Explicit(true))));
        assert_eq!(get.find("/stats"), Some(("Reports", ApiAccess::Inherited)));
    }

    #[test]
    fn inherited_access_is_not_invented_on_encode() {
        let value = json!({
            "users": { "1": { "access": true, "get": [ { "group": "G", "apis": { "/x": {} } } ] } }
        });

        let tree = decode_api_group(&value).unwrap();
        assert_eq!(encode(&tree, AclForm::ApiGroup), value);

        let granular = encode(&tree, AclForm::Granular);
        assert_eq!(
            granular,
            json!({ "users": { "1": { "access": true, "get": { "apis": { "/x": { "group": "G" } } } } } })
        );
    }

    #[test]
    fn wrong_form_is_malformed() {
        let api_group = json!({ "users": { "1": { "get": [ { "group": "G", "apis": {} } ] } } });
        let err = decode_granular(&api_group).unwrap_err();
        assert!(matches!(
            err,
            AclError::Malformed {
                form: AclForm::Granular,
                ..
            }
        ));

        let granular = json!({ "users": { "1": { "get": { "apis": {} } } } });
        assert!(decode_api_group(&granular).is_err());
    }

    #[test]
    fn unknown_apis_permission_is_rejected() {
        let value = json!({ "users": { "1": { "apisPermission": "open" } } });
        assert!(decode_api_group(&value).is_err());
    }

    #[test]
    fn null_decodes_empty() {
        assert!(decode(&Value::Null, AclForm::Granular).unwrap().is_empty());
    }

    #[test]
    fn converts_between_forms() {
        let tree = sample_tree();
        let api_group = encode(&tree, AclForm::ApiGroup);
        let granular = encode(&tree, AclForm::Granular);
        assert!(api_group["users"]["1"]["get"].is_array());
        assert!(granular["users"]["1"]["get"]["apis"].is_object());

        let switched = convert(&api_group, AclForm::ApiGroup, AclForm::Granular).unwrap();
        assert_eq!(switched, granular);
        let back = convert(&switched, AclForm::Granular, AclForm::ApiGroup).unwrap();
        assert_eq!(back, api_group);
    }
}
