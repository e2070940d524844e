//! Applies UI preview deltas onto one environment's ACL.
//!
//! Merging never fails. Service-level rows own their version containers
//! and may create or delete them; api-level rows only touch service
//! versions that already exist and are otherwise ignored. A row that
//! restates what the ACL already resolves to leaves it untouched, so a
//! preview sent back unchanged is a no-op.

use tracing::debug;

use crate::preview::{Granularity, PreviewRow, PreviewTarget};
use crate::tree::{ApiAccess, ServiceAcl};

/// Counters describing what a merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub applied: usize,
    pub skipped: usize,
}

/// Merge `rows` into `acl` for `env`.
///
/// `target` supplies the access a version without an `access` key resolves
/// to, matching the preview the rows came from. Rows that carry no decision
/// for `env` are skipped, as are rows that do not match `granularity`.
pub fn merge_rows(
    acl: &mut ServiceAcl,
    rows: &[PreviewRow],
    env: &str,
    granularity: Granularity,
    target: PreviewTarget,
) -> MergeOutcome {
    let env = env.to_lowercase();
    let mut outcome = MergeOutcome::default();

    for row in rows {
        let applied = match granularity {
            Granularity::Service => merge_service_row(acl, row, &env, target),
            Granularity::Api => merge_api_row(acl, row, &env, target),
        };
        if applied {
            outcome.applied += 1;
        } else {
            outcome.skipped += 1;
        }
    }

    debug!(
        env = %env,
        applied = outcome.applied,
        skipped = outcome.skipped,
        "Merged preview rows"
    );
    outcome
}

/// Upsert or delete a service version from a service-level row.
///
/// Enabling writes the version's `access` and restriction flags and leaves
/// method detail alone; an unset `access` stays unset while the row agrees
/// with the target default. Disabling removes that version only.
pub fn merge_service_row(
    acl: &mut ServiceAcl,
    row: &PreviewRow,
    env: &str,
    target: PreviewTarget,
) -> bool {
    let Some(&enabled) = row.envs.get(env) else {
        return false;
    };

    if enabled {
        let access = row.access.get(env).copied().unwrap_or(true);
        let restricted = row.restriction.get(env).copied().unwrap_or(false);
        let keep_unset = access == target.absent_access()
            && acl
                .version(&row.service, &row.version)
                .is_some_and(|v| v.access.is_none());
        acl.upsert_version(
            &row.service,
            &row.version,
            (!keep_unset).then_some(access),
            restricted,
        );
    } else {
        acl.remove_version(&row.service, &row.version);
    }
    true
}

/// Add, update or remove a single api from an api-level row.
pub fn merge_api_row(
    acl: &mut ServiceAcl,
    row: &PreviewRow,
    env: &str,
    target: PreviewTarget,
) -> bool {
    let (Some(method), Some(route)) = (row.method.as_deref(), row.api.as_deref()) else {
        return false;
    };
    let Some(&enabled) = row.envs.get(env) else {
        return false;
    };
    let Some(version) = acl.version_mut(&row.service, &row.version) else {
        // TODO: surface api edits whose service version is missing instead of dropping them
        debug!(
            service = %row.service,
            version = %row.version,
            api = route,
            "Ignoring api delta without parent service version"
        );
        return false;
    };

    if !enabled {
        version.remove_api(method, route);
        return true;
    }

    let access = row.access.get(env).copied().unwrap_or(true);
    let version_access = version.access.unwrap_or(target.absent_access());
    let inherited = row.inherited.get(env).copied().unwrap_or(false);
    if inherited && access == version_access {
        match version.find_api(method, route) {
            Some((_, ApiAccess::Inherited)) => return true,
            None if !version.restricted => return true,
            _ => {}
        }
    }

    let group = row.group.as_deref().unwrap_or(crate::catalog::DEFAULT_GROUP);
    version.set_api(method, group, route, ApiAccess::Explicit(access));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ServiceCatalog;
    use crate::codec::{decode_api_group, encode};
    use crate::preview::{EnvAcl, PreviewBuilder};
    use portico_core::models::directory::DirectoryResponse;
    use portico_core::models::product::AclForm;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;

    fn flags(pairs: &[(&str, bool)]) -> BTreeMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn service_row(service: &str, version: &str, env: bool, access: bool) -> PreviewRow {
        PreviewRow {
            service: service.into(),
            version: version.into(),
            envs: flags(&[("dev", env)]),
            access: flags(&[("dev", access)]),
            restriction: flags(&[("dev", false)]),
            ..Default::default()
        }
    }

    fn api_row(route: &str, env: bool, access: bool) -> PreviewRow {
        PreviewRow {
            service: "svcA".into(),
            version: "1".into(),
            group: Some("G".into()),
            method: Some("get".into()),
            api: Some(route.into()),
            envs: flags(&[("dev", env)]),
            access: flags(&[("dev", access)]),
            ..Default::default()
        }
    }

    fn merge_scope(acl: &mut ServiceAcl, rows: &[PreviewRow], granularity: Granularity) -> MergeOutcome {
        merge_rows(acl, rows, "dev", granularity, PreviewTarget::Scope)
    }

    /// svcA exposes versions 1 and 2, both with `GET /x` and `GET /y`.
    fn two_version_catalog() -> ServiceCatalog {
        let apis = json!([
            { "v": "/x", "m": "get", "group": "G" },
            { "v": "/y", "m": "get", "group": "G" }
        ]);
        let response: DirectoryResponse = serde_json::from_value(json!({
            "result": true,
            "data": { "records": [ {
                "name": "svcA",
                "versions": [
                    { "version": "1", "apis": apis },
                    { "version": "2", "apis": apis }
                ]
            } ] }
        }))
        .unwrap();
        ServiceCatalog::from_response(response).unwrap()
    }

    /// Build a preview of `stored`, send every row back unchanged and
    /// return the re-encoded result.
    fn preview_and_merge_back(stored: &Value, granularity: Granularity, target: PreviewTarget) -> Value {
        let catalog = two_version_catalog();
        let mut acl = decode_api_group(stored).unwrap();
        let rows = PreviewBuilder::new(
            &catalog,
            EnvAcl {
                env: "dev",
                acl: &acl,
            },
            target,
        )
        .build(granularity);

        merge_rows(&mut acl, &rows, "dev", granularity, target);
        encode(&acl, AclForm::ApiGroup)
    }

    #[test]
    fn disabling_a_service_removes_it() {
        let mut acl = decode_api_group(&json!({
            "svcA": { "1": { "access": true } },
            "svcB": { "1": { "access": true } }
        }))
        .unwrap();

        merge_scope(
            &mut acl,
            &[service_row("svcA", "1", false, true)],
            Granularity::Service,
        );

        let encoded = encode(&acl, AclForm::ApiGroup);
        assert!(encoded.get("svcA").is_none());
        assert!(encoded.get("svcB").is_some());
    }

    #[test]
    fn disabling_one_version_keeps_its_siblings() {
        let mut acl = decode_api_group(&json!({
            "svcA": { "1": { "access": true }, "2": { "access": false } }
        }))
        .unwrap();

        merge_scope(
            &mut acl,
            &[service_row("svcA", "2", false, false)],
            Granularity::Service,
        );

        assert_eq!(
            encode(&acl, AclForm::ApiGroup),
            json!({ "svcA": { "1": { "access": true } } })
        );
    }

    #[test]
    fn service_preview_round_trip_with_unstored_version() {
        let stored = json!({ "svcA": { "1": { "access": true } } });

        let merged = preview_and_merge_back(&stored, Granularity::Service, PreviewTarget::Scope);

        assert_eq!(merged, stored);
    }

    #[test]
    fn service_preview_round_trip_keeps_absent_package_access() {
        let stored = json!({ "svcA": { "1": { "apisPermission": "restricted" } } });

        let merged = preview_and_merge_back(&stored, Granularity::Service, PreviewTarget::Package);

        assert_eq!(merged, stored);
    }

    #[test]
    fn api_preview_round_trip_keeps_inherited_and_unlisted_apis() {
        let stored = json!({
            "svcA": { "1": {
                "access": true,
                "get": [ { "group": "G", "apis": { "/x": {} } } ]
            } }
        });

        let merged = preview_and_merge_back(&stored, Granularity::Api, PreviewTarget::Scope);

        assert_eq!(merged, stored);
    }

    #[test]
    fn api_preview_round_trip_in_restricted_version() {
        let stored = json!({
            "svcA": { "1": {
                "access": true,
                "apisPermission": "restricted",
                "get": [ { "group": "G", "apis": { "/x": { "access": false } } } ]
            } }
        });

        let merged = preview_and_merge_back(&stored, Granularity::Api, PreviewTarget::Scope);

        assert_eq!(merged, stored);
    }

    #[test]
    fn inherited_row_with_changed_access_becomes_override() {
        let mut acl = decode_api_group(&json!({
            "svcA": { "1": { "access": true, "get": [ { "group": "G", "apis": { "/x": {} } } ] } }
        }))
        .unwrap();
        let mut row = api_row("/x", true, false);
        row.inherited = flags(&[("dev", true)]);

        merge_scope(&mut acl, &[row], Granularity::Api);

        assert_eq!(
            encode(&acl, AclForm::ApiGroup)["svcA"]["1"]["get"],
            json!([ { "group": "G", "apis": { "/x": { "access": false } } } ])
        );
    }

    #[test]
    fn service_upsert_is_idempotent_and_keeps_methods() {
        let original = json!({
            "svcA": { "1": { "access": true, "get": [ { "group": "G", "apis": { "/x": {} } } ] } }
        });
        let mut row = service_row("svcA", "1", true, false);
        row.restriction = flags(&[("dev", true)]);

        let mut once = decode_api_group(&original).unwrap();
        merge_scope(&mut once, &[row.clone()], Granularity::Service);
        let mut twice = once.clone();
        merge_scope(&mut twice, &[row], Granularity::Service);

        assert_eq!(once, twice);
        assert_eq!(
            encode(&once, AclForm::ApiGroup),
            json!({
                "svcA": { "1": {
                    "access": false,
                    "apisPermission": "restricted",
                    "get": [ { "group": "G", "apis": { "/x": {} } } ]
                } }
            })
        );
    }

    #[test]
    fn service_upsert_clears_restriction() {
        let mut acl = decode_api_group(&json!({
            "svcA": { "1": { "access": true, "apisPermission": "restricted" } }
        }))
        .unwrap();

        merge_scope(
            &mut acl,
            &[service_row("svcA", "1", true, true)],
            Granularity::Service,
        );

        assert_eq!(
            encode(&acl, AclForm::ApiGroup),
            json!({ "svcA": { "1": { "access": true } } })
        );
    }

    #[test]
    fn api_insert_creates_group_block() {
        let mut acl = decode_api_group(&json!({ "svcA": { "1": { "access": true } } })).unwrap();

        merge_scope(&mut acl, &[api_row("/x", true, true)], Granularity::Api);

        assert_eq!(
            encode(&acl, AclForm::ApiGroup)["svcA"]["1"]["get"],
            json!([ { "group": "G", "apis": { "/x": { "access": true } } } ])
        );
    }

    #[test]
    fn api_upsert_leaves_siblings_alone() {
        let mut acl = decode_api_group(&json!({
            "svcA": { "1": { "get": [
                { "group": "G", "apis": { "/x": {}, "/y": { "access": true } } }
            ] } }
        }))
        .unwrap();

        merge_scope(&mut acl, &[api_row("/x", true, false)], Granularity::Api);

        assert_eq!(
            encode(&acl, AclForm::ApiGroup)["svcA"]["1"]["get"],
            json!([ { "group": "G", "apis": { "/x": { "access": false }, "/y": { "access": true } } } ])
        );
    }

    #[test]
    fn api_removal_prunes_empty_buckets() {
        let mut acl = decode_api_group(&json!({
            "svcA": { "1": {
                "access": true,
                "get": [ { "group": "G", "apis": { "/x": {} } } ],
                "post": [ { "group": "G", "apis": { "/y": {} } } ]
            } }
        }))
        .unwrap();

        merge_scope(&mut acl, &[api_row("/x", false, false)], Granularity::Api);

        assert_eq!(
            encode(&acl, AclForm::ApiGroup),
            json!({ "svcA": { "1": {
                "access": true,
                "post": [ { "group": "G", "apis": { "/y": {} } } ]
            } } })
        );
    }

    #[test]
    fn api_delta_without_parent_is_ignored() {
        let mut acl = decode_api_group(&json!({ "svcB": { "1": {} } })).unwrap();
        let before = acl.clone();

        let outcome = merge_scope(&mut acl, &[api_row("/x", true, true)], Granularity::Api);

        assert_eq!(acl, before);
        assert_eq!(outcome, MergeOutcome { applied: 0, skipped: 1 });
    }

    #[test]
    fn rows_without_env_decision_are_skipped() {
        let mut acl = ServiceAcl::default();
        let mut row = service_row("svcA", "1", true, true);
        row.envs = flags(&[("prod", true)]);

        let outcome = merge_rows(
            &mut acl,
            &[row],
            "DEV",
            Granularity::Service,
            PreviewTarget::Scope,
        );

        assert!(acl.is_empty());
        assert_eq!(outcome.skipped, 1);
    }
}
