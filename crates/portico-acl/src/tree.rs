//! Canonical in-memory ACL tree.
//!
//! One environment's ACL decodes into
//! `ServiceAcl → ServiceEntry → VersionAcl → MethodAcl → GroupAcl → api`.
//! Writers create missing containers on the way down; removals prune any
//! container they leave empty.

use std::collections::BTreeMap;

/// Access rule attached to a single api.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiAccess {
    /// No `access` key was stored; the version-level access applies.
    Inherited,
    /// An explicit per-api override.
    Explicit(bool),
}

impl ApiAccess {
    /// Effective access given the owning version's access.
    pub fn resolve(self, version_access: bool) -> bool {
        match self {
            ApiAccess::Inherited => version_access,
            ApiAccess::Explicit(access) => access,
        }
    }

    pub fn explicit(self) -> Option<bool> {
        match self {
            ApiAccess::Inherited => None,
            ApiAccess::Explicit(access) => Some(access),
        }
    }
}

impl From<Option<bool>> for ApiAccess {
    fn from(access: Option<bool>) -> Self {
        access.map_or(ApiAccess::Inherited, ApiAccess::Explicit)
    }
}

/// Routes of one api group under one method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupAcl {
    pub apis: BTreeMap<String, ApiAccess>,
}

/// Api groups under one HTTP method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodAcl {
    pub groups: BTreeMap<String, GroupAcl>,
}

impl MethodAcl {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Locate `route`, returning the group holding it and its access.
    pub fn find(&self, route: &str) -> Option<(&str, ApiAccess)> {
        self.groups.iter().find_map(|(group, bucket)| {
            bucket
                .apis
                .get(route)
                .map(|access| (group.as_str(), *access))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionAcl {
    /// Version-level access; `None` when the key is absent.
    pub access: Option<bool>,
    /// `apisPermission: "restricted"`: only listed apis are reachable.
    pub restricted: bool,
    pub methods: BTreeMap<String, MethodAcl>,
}

impl VersionAcl {
    pub fn new(access: Option<bool>, restricted: bool) -> Self {
        Self {
            access,
            restricted,
            methods: BTreeMap::new(),
        }
    }

    pub fn find_api(&self, method: &str, route: &str) -> Option<(&str, ApiAccess)> {
        self.methods
            .get(&method.to_lowercase())
            .and_then(|m| m.find(route))
    }

    /// Set `route` under `method`.
    ///
    /// An api already listed under the method is updated in place inside
    /// whichever group holds it; otherwise it is added to `group`, creating
    /// the method and group buckets as needed. Sibling apis are untouched.
    pub fn set_api(&mut self, method: &str, group: &str, route: &str, access: ApiAccess) {
        let bucket = self.methods.entry(method.to_lowercase()).or_default();

        for existing in bucket.groups.values_mut() {
            if let Some(slot) = existing.apis.get_mut(route) {
                *slot = access;
                return;
            }
        }

        bucket
            .groups
            .entry(group.to_string())
            .or_default()
            .apis
            .insert(route.to_string(), access);
    }

    /// Remove `route` from every group of `method`, pruning emptied
    /// groups and the method itself. Returns whether anything was removed.
    pub fn remove_api(&mut self, method: &str, route: &str) -> bool {
        let method = method.to_lowercase();
        let Some(bucket) = self.methods.get_mut(&method) else {
            return false;
        };

        let mut removed = false;
        bucket.groups.retain(|_, group| {
            removed |= group.apis.remove(route).is_some();
            !group.apis.is_empty()
        });

        if bucket.is_empty() {
            self.methods.remove(&method);
        }
        removed
    }
}

/// All versions of one service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceEntry {
    pub versions: BTreeMap<String, VersionAcl>,
}

/// One environment's ACL, keyed by service name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceAcl {
    pub services: BTreeMap<String, ServiceEntry>,
}

impl ServiceAcl {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn version(&self, service: &str, version: &str) -> Option<&VersionAcl> {
        self.services
            .get(service)
            .and_then(|entry| entry.versions.get(version))
    }

    pub fn version_mut(&mut self, service: &str, version: &str) -> Option<&mut VersionAcl> {
        self.services
            .get_mut(service)
            .and_then(|entry| entry.versions.get_mut(version))
    }

    /// Upsert the version-level flags of `service`/`version`, keeping any
    /// method detail already present. `None` leaves `access` unset.
    pub fn upsert_version(
        &mut self,
        service: &str,
        version: &str,
        access: Option<bool>,
        restricted: bool,
    ) -> &mut VersionAcl {
        let entry = self
            .services
            .entry(service.to_string())
            .or_default()
            .versions
            .entry(version.to_string())
            .or_default();
        entry.access = access;
        entry.restricted = restricted;
        entry
    }

    /// Remove one version, dropping the service once it has none left.
    pub fn remove_version(&mut self, service: &str, version: &str) -> Option<VersionAcl> {
        let entry = self.services.get_mut(service)?;
        let removed = entry.versions.remove(version);
        if entry.versions.is_empty() {
            self.services.remove(service);
        }
        removed
    }
}
