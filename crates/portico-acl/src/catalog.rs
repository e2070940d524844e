//! Normalized view of the downstream service directory.
//!
//! The directory answers with a flat record list; previews need it indexed
//! as group → service → version → apis, with methods lower-cased and
//! duplicate routes collapsed.

use std::collections::BTreeMap;

use portico_core::error::{PorticoError, PorticoResult};
use portico_core::models::directory::DirectoryResponse;

/// Group used when neither the api nor its service declares one.
pub const DEFAULT_GROUP: &str = "Default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogApi {
    pub method: String,
    pub route: String,
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogService {
    pub name: String,
    pub group: String,
    /// Version → apis, sorted by method then route.
    pub versions: BTreeMap<String, Vec<CatalogApi>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCatalog {
    groups: BTreeMap<String, BTreeMap<String, CatalogService>>,
}

impl ServiceCatalog {
    /// Build the catalog from a directory reply.
    ///
    /// A reply with `result: false` is an upstream failure carrying the
    /// remote error detail when one was sent.
    pub fn from_response(response: DirectoryResponse) -> PorticoResult<Self> {
        if !response.result {
            let detail = response
                .errors
                .map(|errors| errors.to_string())
                .unwrap_or_else(|| "service directory rejected the request".into());
            return Err(PorticoError::Upstream { detail });
        }

        let mut catalog = ServiceCatalog::default();
        for record in response.data.map(|d| d.records).unwrap_or_default() {
            let service_group = record
                .configuration
                .group
                .filter(|g| !g.is_empty())
                .unwrap_or_else(|| DEFAULT_GROUP.to_string());

            let mut versions: BTreeMap<String, Vec<CatalogApi>> = BTreeMap::new();
            for version in record.versions {
                let apis = versions.entry(version.version).or_default();
                for api in version.apis {
                    let method = api.m.to_lowercase();
                    if apis.iter().any(|a| a.method == method && a.route == api.v) {
                        continue;
                    }
                    apis.push(CatalogApi {
                        method,
                        route: api.v,
                        group: api
                            .group
                            .filter(|g| !g.is_empty())
                            .unwrap_or_else(|| service_group.clone()),
                    });
                }
                apis.sort_by(|a, b| (&a.method, &a.route).cmp(&(&b.method, &b.route)));
            }

            catalog
                .groups
                .entry(service_group.clone())
                .or_default()
                .insert(
                    record.name.clone(),
                    CatalogService {
                        name: record.name,
                        group: service_group,
                        versions,
                    },
                );
        }
        Ok(catalog)
    }

    /// Services in group order, then name order.
    pub fn services(&self) -> impl Iterator<Item = &CatalogService> {
        self.groups.values().flat_map(|services| services.values())
    }

    pub fn service(&self, name: &str) -> Option<&CatalogService> {
        self.groups.values().find_map(|services| services.get(name))
    }

    /// Narrow the catalog to a single service.
    pub fn only(&self, name: &str) -> PorticoResult<Self> {
        let service = self
            .service(name)
            .cloned()
            .ok_or_else(|| PorticoError::ServiceNotFound { name: name.into() })?;

        let mut narrowed = ServiceCatalog::default();
        narrowed
            .groups
            .entry(service.group.clone())
            .or_default()
            .insert(service.name.clone(), service);
        Ok(narrowed)
    }
}
