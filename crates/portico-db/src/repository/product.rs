//! SurrealDB implementation of [`ProductRepository`].
//!
//! The scope and the package list are stored as JSON documents inside the
//! product record and always written back whole, so every mutation is a
//! single-statement update of one record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use portico_core::error::PorticoResult;
use portico_core::models::product::{
    AclForm, CreateProduct, Package, PerEnvAcl, Product, ScopeAcl, UpdateProduct,
};
use portico_core::repository::{PaginatedResult, Pagination, ProductRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ProductRow {
    code: String,
    name: String,
    description: String,
    console: bool,
    locked: bool,
    scope: serde_json::Value,
    packages: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, id: Uuid) -> Result<Product, DbError> {
        Ok(Product {
            id,
            code: self.code,
            name: self.name,
            description: self.description,
            console: self.console,
            locked: self.locked,
            scope: serde_json::from_value(self.scope)?,
            packages: serde_json::from_value(self.packages)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ProductRowWithId {
    record_id: String,
    code: String,
    name: String,
    description: String,
    console: bool,
    locked: bool,
    scope: serde_json::Value,
    packages: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRowWithId {
    fn try_into_product(self) -> Result<Product, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        ProductRow {
            code: self.code,
            name: self.name,
            description: self.description,
            console: self.console,
            locked: self.locked,
            scope: self.scope,
            packages: self.packages,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_product(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn not_found(id: impl Into<String>) -> DbError {
    DbError::NotFound {
        entity: "product".into(),
        id: id.into(),
    }
}

/// SurrealDB implementation of the Product repository.
#[derive(Clone)]
pub struct SurrealProductRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProductRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Overwrite the scope and/or package documents of one product.
    async fn write_documents(
        &self,
        id: Uuid,
        scope: Option<&ScopeAcl>,
        packages: Option<&[Package]>,
    ) -> Result<(), DbError> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if scope.is_some() {
            sets.push("scope = $scope");
        }
        if packages.is_some() {
            sets.push("packages = $packages");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('product', $id) SET {}",
            sets.join(", ")
        );
        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(scope) = scope {
            builder = builder.bind(("scope", serde_json::to_value(scope)?));
        }
        if let Some(packages) = packages {
            builder = builder.bind(("packages", serde_json::to_value(packages)?));
        }

        let result = builder.await?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ProductRow> = result.take(0)?;
        if rows.is_empty() {
            return Err(not_found(id_str));
        }
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Product, DbError> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('product', $id)")
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<ProductRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(id_str))?;
        row.into_product(id)
    }
}

impl<C: Connection> ProductRepository for SurrealProductRepository<C> {
    async fn create(&self, input: CreateProduct) -> PorticoResult<Product> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let scope = serde_json::to_value(input.scope.unwrap_or_default()).map_err(DbError::from)?;
        let packages = serde_json::to_value(&input.packages).map_err(DbError::from)?;

        let result = self
            .db
            .query(
                "CREATE type::record('product', $id) SET \
                 code = $code, name = $name, description = $description, \
                 console = $console, locked = $locked, \
                 scope = $scope, packages = $packages",
            )
            .bind(("id", id_str.clone()))
            .bind(("code", input.code))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("console", input.console))
            .bind(("locked", input.locked))
            .bind(("scope", scope))
            .bind(("packages", packages))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(id_str))?;

        Ok(row.into_product(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> PorticoResult<Product> {
        Ok(self.fetch(id).await?)
    }

    async fn get_by_code(&self, code: &str) -> PorticoResult<Product> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM product WHERE code = $code",
            )
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(code))?;

        Ok(row.try_into_product()?)
    }

    async fn list(
        &self,
        console: Option<bool>,
        pagination: Pagination,
    ) -> PorticoResult<PaginatedResult<Product>> {
        let filter = if console.is_some() {
            "WHERE console = $console"
        } else {
            ""
        };

        let count_query = format!("SELECT count() AS total FROM product {filter} GROUP ALL");
        let mut count_builder = self.db.query(&count_query);
        if let Some(console) = console {
            count_builder = count_builder.bind(("console", console));
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let list_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM product {filter} \
             ORDER BY code ASC LIMIT $limit START $offset"
        );
        let mut builder = self
            .db
            .query(&list_query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(console) = console {
            builder = builder.bind(("console", console));
        }
        let mut result = builder.await.map_err(DbError::from)?;

        let rows: Vec<ProductRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_product())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn update(&self, id: Uuid, input: UpdateProduct) -> PorticoResult<Product> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.scope.is_some() {
            sets.push("scope = $scope");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('product', $id) SET {}",
            sets.join(", ")
        );
        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(scope) = input.scope {
            builder = builder.bind(("scope", serde_json::to_value(scope).map_err(DbError::from)?));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(id_str))?;

        Ok(row.into_product(id)?)
    }

    async fn delete(&self, id: Uuid) -> PorticoResult<()> {
        self.db
            .query("DELETE type::record('product', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn update_packages(&self, id: Uuid, packages: Vec<Package>) -> PorticoResult<()> {
        self.write_documents(id, None, Some(&packages)).await?;
        Ok(())
    }

    async fn update_package_acl(
        &self,
        id: Uuid,
        package_code: &str,
        acl: PerEnvAcl,
        acl_type_by_env: BTreeMap<String, AclForm>,
    ) -> PorticoResult<()> {
        let mut product = self.fetch(id).await?;
        let package = product
            .package_mut(package_code)
            .ok_or_else(|| DbError::NotFound {
                entity: "package".into(),
                id: package_code.to_string(),
            })?;
        package.acl = acl;
        package.acl_type_by_env = acl_type_by_env;

        debug!(product = %product.code, package = package_code, "Writing package ACL");
        self.write_documents(id, None, Some(&product.packages))
            .await?;
        Ok(())
    }

    async fn update_scope(
        &self,
        id: Uuid,
        env: &str,
        acl: serde_json::Value,
        form: AclForm,
    ) -> PorticoResult<()> {
        let mut product = self.fetch(id).await?;
        let env = env.to_lowercase();
        product.scope.acl.insert(env.clone(), acl);
        match form {
            AclForm::ApiGroup => product.scope.acl_type_by_env.remove(&env),
            AclForm::Granular => product.scope.acl_type_by_env.insert(env.clone(), form),
        };

        debug!(product = %product.code, env = %env, "Writing scope ACL");
        self.write_documents(id, Some(&product.scope), None).await?;
        Ok(())
    }

    async fn purge(&self, id: Uuid) -> PorticoResult<()> {
        let mut product = self.fetch(id).await?;
        product.scope = ScopeAcl::default();
        for package in &mut product.packages {
            package.acl.clear();
            package.acl_type_by_env.clear();
        }

        self.write_documents(id, Some(&product.scope), Some(&product.packages))
            .await?;
        Ok(())
    }
}
