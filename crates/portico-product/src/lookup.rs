//! Lookups shared by the product and package services.

use portico_acl::ServiceCatalog;
use portico_core::error::{PorticoError, PorticoResult};
use portico_core::models::product::Product;
use portico_core::repository::{ProductRepository, ServiceDirectory};
use uuid::Uuid;

use crate::config::ProductServiceConfig;

/// Fetch a product by UUID or by code.
pub(crate) async fn product<P: ProductRepository>(repo: &P, id_or_code: &str) -> PorticoResult<Product> {
    let key = id_or_code.trim();
    if key.is_empty() {
        return Err(PorticoError::missing("id"));
    }
    match Uuid::parse_str(key) {
        Ok(id) => repo.get_by_id(id).await,
        Err(_) => repo.get_by_code(&key.to_uppercase()).await,
    }
}

/// Fetch the service catalog, narrowed to `service` when given.
pub(crate) async fn catalog<D: ServiceDirectory>(
    directory: &D,
    service: Option<&str>,
) -> PorticoResult<ServiceCatalog> {
    let response = directory.list_services(service).await?;
    let catalog = ServiceCatalog::from_response(response)?;
    match service {
        Some(name) => catalog.only(name),
        None => Ok(catalog),
    }
}

/// Normalize and check an environment name.
pub(crate) fn env(config: &ProductServiceConfig, env: &str) -> PorticoResult<String> {
    let env = env.trim().to_lowercase();
    if env.is_empty() {
        return Err(PorticoError::missing("env"));
    }
    if !config.allows_env(&env) {
        return Err(PorticoError::InvalidInput {
            message: format!("unknown environment '{env}'"),
        });
    }
    Ok(env)
}
