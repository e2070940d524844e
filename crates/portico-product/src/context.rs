//! Caller context and the record-protection rules derived from it.

use portico_core::error::{PorticoError, PorticoResult};
use portico_core::models::product::Product;

/// Who is asking, as resolved by the boundary layer.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    /// The caller's own tenant.
    pub tenant_id: Option<String>,
    /// Whether the caller's own tenant is a locked record.
    pub tenant_locked: bool,
    /// Product code the caller is currently using.
    pub product_code: Option<String>,
    /// Package code the caller is currently using.
    pub package_code: Option<String>,
}

impl CallerContext {
    /// Locked products can only be changed from a locked tenant.
    pub fn ensure_can_modify(&self, product: &Product) -> PorticoResult<()> {
        if product.locked && !self.tenant_locked {
            return Err(PorticoError::LockedRecord);
        }
        Ok(())
    }

    /// A caller cannot delete the product it is currently using.
    pub fn ensure_not_active_product(&self, product: &Product) -> PorticoResult<()> {
        if self.product_code.as_deref() == Some(product.code.as_str()) {
            return Err(PorticoError::ActiveProduct);
        }
        Ok(())
    }

    /// A caller cannot delete the package it is currently using.
    pub fn ensure_not_active_package(&self, package_code: &str) -> PorticoResult<()> {
        if self.package_code.as_deref() == Some(package_code) {
            return Err(PorticoError::ActivePackage);
        }
        Ok(())
    }
}
