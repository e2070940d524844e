//! Flat, UI-facing views of an ACL cross-referenced with the catalog.
//!
//! Previews come at two granularities (per service version, per api) for
//! two targets (product scope, package). They are advisory: nothing here
//! is persisted, the UI edits rows and sends them back as merge deltas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogApi, CatalogService, ServiceCatalog};
use crate::tree::{ApiAccess, ServiceAcl, VersionAcl};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Service,
    Api,
}

/// Which ACL a preview is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewTarget {
    Scope,
    Package,
}

impl PreviewTarget {
    /// Access reported for a version stored without an `access` key.
    pub fn absent_access(self) -> bool {
        match self {
            PreviewTarget::Scope => true,
            PreviewTarget::Package => false,
        }
    }
}

/// One preview line: a service version, or a single api of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRow {
    pub service: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(default)]
    pub envs: BTreeMap<String, bool>,
    #[serde(default)]
    pub access: BTreeMap<String, bool>,
    #[serde(default)]
    pub restriction: BTreeMap<String, bool>,
    /// Envs where the api's access follows its version rather than an
    /// override of its own. Merging such a row back unchanged is a no-op.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inherited: BTreeMap<String, bool>,
}

impl PreviewRow {
    fn record(&mut self, env: &str, state: EnvState) {
        self.envs.insert(env.to_string(), state.present);
        self.access.insert(env.to_string(), state.access);
        self.restriction.insert(env.to_string(), state.restricted);
        if state.inherited {
            self.inherited.insert(env.to_string(), true);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct EnvState {
    present: bool,
    access: bool,
    restricted: bool,
    /// The api can be invoked in this env.
    reachable: bool,
    /// Access comes from the version, not an api override.
    inherited: bool,
}

/// One environment's decoded ACL.
#[derive(Debug, Clone, Copy)]
pub struct EnvAcl<'a> {
    pub env: &'a str,
    pub acl: &'a ServiceAcl,
}

/// Builds preview rows for a main environment and an optional secondary one.
pub struct PreviewBuilder<'a> {
    catalog: &'a ServiceCatalog,
    main: EnvAcl<'a>,
    secondary: Option<EnvAcl<'a>>,
    target: PreviewTarget,
}

impl<'a> PreviewBuilder<'a> {
    pub fn new(catalog: &'a ServiceCatalog, main: EnvAcl<'a>, target: PreviewTarget) -> Self {
        Self {
            catalog,
            main,
            secondary: None,
            target,
        }
    }

    pub fn with_secondary(mut self, secondary: Option<EnvAcl<'a>>) -> Self {
        self.secondary = secondary;
        self
    }

    pub fn build(&self, granularity: Granularity) -> Vec<PreviewRow> {
        match granularity {
            Granularity::Service => self.service_rows(),
            Granularity::Api => self.api_rows(),
        }
    }

    /// One row per (service, version) listed in the catalog.
    pub fn service_rows(&self) -> Vec<PreviewRow> {
        let mut rows = Vec::new();
        for service in self.catalog.services() {
            for version in service.versions.keys() {
                let mut row = PreviewRow {
                    service: service.name.clone(),
                    version: version.clone(),
                    group: Some(service.group.clone()),
                    ..Default::default()
                };
                for env in self.envs() {
                    let state = self.version_state(env.acl.version(&service.name, version));
                    row.record(env.env, state);
                }
                rows.push(row);
            }
        }
        rows
    }

    /// One row per (service, version, method, route) listed in the catalog.
    ///
    /// With a secondary env, apis unreachable in the main env are left
    /// out: the secondary env only annotates rows already visible.
    pub fn api_rows(&self) -> Vec<PreviewRow> {
        let mut rows = Vec::new();
        for service in self.catalog.services() {
            for (version, apis) in &service.versions {
                for api in apis {
                    if let Some(row) = self.api_row(service, version, api) {
                        rows.push(row);
                    }
                }
            }
        }
        rows
    }

    fn api_row(&self, service: &CatalogService, version: &str, api: &CatalogApi) -> Option<PreviewRow> {
        let main = self.api_state(self.main.acl.version(&service.name, version), api);
        if self.secondary.is_some() && !main.reachable {
            return None;
        }

        let mut row = PreviewRow {
            service: service.name.clone(),
            version: version.to_string(),
            group: Some(api.group.clone()),
            method: Some(api.method.clone()),
            api: Some(api.route.clone()),
            ..Default::default()
        };
        row.record(self.main.env, main);
        if let Some(secondary) = self.secondary {
            let state = self.api_state(secondary.acl.version(&service.name, version), api);
            row.record(secondary.env, state);
        }
        Some(row)
    }

    fn envs(&self) -> impl Iterator<Item = EnvAcl<'a>> {
        std::iter::once(self.main).chain(self.secondary)
    }

    fn version_state(&self, version: Option<&VersionAcl>) -> EnvState {
        match version {
            None => EnvState::default(),
            Some(v) => {
                let access = v.access.unwrap_or(self.target.absent_access());
                EnvState {
                    present: true,
                    access,
                    restricted: v.restricted,
                    reachable: access,
                    inherited: false,
                }
            }
        }
    }

    fn api_state(&self, version: Option<&VersionAcl>, api: &CatalogApi) -> EnvState {
        let Some(v) = version else {
            return EnvState::default();
        };
        let version_access = v.access.unwrap_or(self.target.absent_access());

        match v.find_api(&api.method, &api.route) {
            Some((_, access)) => EnvState {
                present: true,
                access: access.resolve(version_access),
                restricted: v.restricted,
                reachable: access.resolve(version_access),
                inherited: access == ApiAccess::Inherited,
            },
            None if v.restricted => EnvState {
                present: false,
                access: false,
                restricted: true,
                reachable: false,
                inherited: false,
            },
            None => EnvState {
                present: true,
                access: version_access,
                restricted: false,
                reachable: version_access,
                inherited: true,
            },
        }
    }
}
