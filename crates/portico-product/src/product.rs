//! Product service: product CRUD and the product scope ACL.

use portico_acl::preview::PreviewTarget;
use portico_acl::{AclValidator, Granularity, PreviewRow};
use portico_core::error::{PorticoError, PorticoResult};
use portico_core::models::product::{CreateProduct, Product, UpdateProduct};
use portico_core::repository::{PaginatedResult, Pagination, ProductRepository, ServiceDirectory};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ProductServiceConfig;
use crate::context::CallerContext;
use crate::lookup;
use crate::pipeline::{self, PreviewRequest};

/// Input for creating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddProductInput {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub console: bool,
}

/// Input for renaming or re-describing a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Check a product code: 4 to 6 ASCII alphanumerics. Returns it upper-cased.
pub fn normalize_product_code(code: &str) -> PorticoResult<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(PorticoError::missing("code"));
    }
    if !(4..=6).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PorticoError::InvalidInput {
            message: format!("product code '{code}' must be 4 to 6 alphanumeric characters"),
        });
    }
    Ok(code.to_uppercase())
}

/// Product service.
///
/// Generic over the product repository and the service directory so the
/// orchestration layer has no dependency on the database crate.
pub struct ProductService<P: ProductRepository, D: ServiceDirectory> {
    products: P,
    directory: D,
    validator: AclValidator,
    config: ProductServiceConfig,
}

impl<P: ProductRepository, D: ServiceDirectory> ProductService<P, D> {
    pub fn new(products: P, directory: D, config: ProductServiceConfig) -> PorticoResult<Self> {
        Ok(Self {
            products,
            directory,
            validator: AclValidator::new()?,
            config,
        })
    }

    /// Create a product with an empty scope and no packages.
    pub async fn add(&self, input: AddProductInput) -> PorticoResult<Product> {
        let code = normalize_product_code(&input.code)?;
        if input.name.trim().is_empty() {
            return Err(PorticoError::missing("name"));
        }

        match self.products.get_by_code(&code).await {
            Ok(_) => {
                return Err(PorticoError::AlreadyExists {
                    entity: "product".into(),
                    key: code,
                });
            }
            Err(PorticoError::ProductNotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let product = self
            .products
            .create(CreateProduct {
                code,
                name: input.name,
                description: input.description,
                console: input.console,
                locked: false,
                scope: None,
                packages: Vec::new(),
            })
            .await?;

        info!(product = %product.code, "Product created");
        Ok(product)
    }

    pub async fn get(&self, id_or_code: &str) -> PorticoResult<Product> {
        lookup::product(&self.products, id_or_code).await
    }

    pub async fn list(
        &self,
        console: Option<bool>,
        pagination: Pagination,
    ) -> PorticoResult<PaginatedResult<Product>> {
        self.products.list(console, pagination).await
    }

    pub async fn update(
        &self,
        caller: &CallerContext,
        id_or_code: &str,
        input: UpdateProductInput,
    ) -> PorticoResult<Product> {
        let product = self.get(id_or_code).await?;
        caller.ensure_can_modify(&product)?;

        if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(PorticoError::missing("name"));
        }

        self.products
            .update(
                product.id,
                UpdateProduct {
                    name: input.name,
                    description: input.description,
                    scope: None,
                },
            )
            .await
    }

    pub async fn delete(&self, caller: &CallerContext, id_or_code: &str) -> PorticoResult<()> {
        let product = self.get(id_or_code).await?;
        caller.ensure_can_modify(&product)?;
        caller.ensure_not_active_product(&product)?;

        self.products.delete(product.id).await?;
        info!(product = %product.code, "Product deleted");
        Ok(())
    }

    /// Empty the scope and every package ACL, keeping the product itself.
    pub async fn purge(&self, caller: &CallerContext, id_or_code: &str) -> PorticoResult<()> {
        let product = self.get(id_or_code).await?;
        caller.ensure_can_modify(&product)?;

        self.products.purge(product.id).await?;
        info!(product = %product.code, "Product ACLs purged");
        Ok(())
    }

    /// Replace the scope ACL of one environment with `acl`.
    pub async fn update_scope(
        &self,
        caller: &CallerContext,
        id_or_code: &str,
        env: &str,
        acl: serde_json::Value,
    ) -> PorticoResult<()> {
        let env = lookup::env(&self.config, env)?;
        let product = self.get(id_or_code).await?;
        caller.ensure_can_modify(&product)?;

        let form = product.scope.form(&env);
        self.validator.validate(&acl, form)?;

        self.products.update_scope(product.id, &env, acl, form).await?;
        info!(product = %product.code, env = %env, form = %form, "Scope ACL updated");
        Ok(())
    }

    /// Preview the scope ACL against the live service directory.
    pub async fn scope_preview(
        &self,
        id_or_code: &str,
        request: &PreviewRequest,
    ) -> PorticoResult<Vec<PreviewRow>> {
        let main_env = lookup::env(&self.config, &request.main_env)?;
        let sec_env = request
            .sec_env
            .as_deref()
            .map(|env| lookup::env(&self.config, env))
            .transpose()?;
        let product = self.get(id_or_code).await?;
        let catalog = lookup::catalog(&self.directory, request.service.as_deref()).await?;

        pipeline::preview(
            &catalog,
            &product.scope.acl,
            |env| product.scope.form(env),
            &main_env,
            sec_env.as_deref(),
            request.granularity,
            PreviewTarget::Scope,
        )
    }

    /// Merge edited preview rows back into the scope ACL of `env`.
    pub async fn update_scope_preview(
        &self,
        caller: &CallerContext,
        id_or_code: &str,
        env: &str,
        granularity: Granularity,
        rows: &[PreviewRow],
    ) -> PorticoResult<()> {
        let env = lookup::env(&self.config, env)?;
        let product = self.get(id_or_code).await?;
        caller.ensure_can_modify(&product)?;

        let form = product.scope.form(&env);
        let merged = pipeline::merge(
            &self.validator,
            product.scope.acl.get(&env),
            form,
            &env,
            rows,
            granularity,
            PreviewTarget::Scope,
        )?;

        self.products
            .update_scope(product.id, &env, merged, form)
            .await?;
        info!(
            product = %product.code,
            env = %env,
            rows = rows.len(),
            "Scope ACL merged from preview"
        );
        Ok(())
    }
}
