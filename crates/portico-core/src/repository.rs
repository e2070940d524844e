//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The product document is the unit
//! of persistence: every write replaces whole fields of one product, so
//! a failed call never leaves a partially applied ACL behind.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::PorticoResult;
use crate::models::directory::DirectoryResponse;
use crate::models::product::{AclForm, CreateProduct, Package, PerEnvAcl, Product, UpdateProduct};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub trait ProductRepository: Send + Sync {
    fn create(&self, input: CreateProduct) -> impl Future<Output = PorticoResult<Product>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PorticoResult<Product>> + Send;
    fn get_by_code(&self, code: &str) -> impl Future<Output = PorticoResult<Product>> + Send;
    /// List products, optionally filtered on the `console` flag.
    fn list(
        &self,
        console: Option<bool>,
        pagination: Pagination,
    ) -> impl Future<Output = PorticoResult<PaginatedResult<Product>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateProduct,
    ) -> impl Future<Output = PorticoResult<Product>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = PorticoResult<()>> + Send;

    /// Replace the package list of a product.
    fn update_packages(
        &self,
        id: Uuid,
        packages: Vec<Package>,
    ) -> impl Future<Output = PorticoResult<()>> + Send;

    /// Replace one package's ACL and per-env form map.
    fn update_package_acl(
        &self,
        id: Uuid,
        package_code: &str,
        acl: PerEnvAcl,
        acl_type_by_env: BTreeMap<String, AclForm>,
    ) -> impl Future<Output = PorticoResult<()>> + Send;

    /// Replace the scope ACL of a single environment.
    fn update_scope(
        &self,
        id: Uuid,
        env: &str,
        acl: serde_json::Value,
        form: AclForm,
    ) -> impl Future<Output = PorticoResult<()>> + Send;

    /// Reset the scope and every package ACL to empty.
    fn purge(&self, id: Uuid) -> impl Future<Output = PorticoResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Downstream service directory
// ---------------------------------------------------------------------------

pub trait ServiceDirectory: Send + Sync {
    /// Fetch every registered service, optionally narrowed to one name.
    fn list_services(
        &self,
        service: Option<&str>,
    ) -> impl Future<Output = PorticoResult<DirectoryResponse>> + Send;
}
