//! Package service: package CRUD and package-level ACLs.

use std::collections::BTreeMap;

use portico_acl::codec;
use portico_acl::preview::PreviewTarget;
use portico_acl::{AclValidator, Granularity, PreviewRow};
use portico_core::error::{PorticoError, PorticoResult};
use portico_core::models::product::{AclForm, Package, PerEnvAcl, Product};
use portico_core::repository::{ProductRepository, ServiceDirectory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ProductServiceConfig;
use crate::context::CallerContext;
use crate::lookup;
use crate::pipeline::{self, PreviewRequest};

const MS_PER_HOUR: u64 = 60 * 60 * 1000;

/// Input for creating a package under a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPackageInput {
    /// Either the bare suffix or the full `<PRODUCT>_<SUFFIX>` code.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Token lifetime in hours; the configured default applies when absent.
    #[serde(default)]
    pub ttl_hours: Option<u64>,
    #[serde(default)]
    pub acl: PerEnvAcl,
    #[serde(default)]
    pub acl_type_by_env: BTreeMap<String, AclForm>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePackageInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ttl_hours: Option<u64>,
    /// Replaces the whole ACL when present.
    pub acl: Option<PerEnvAcl>,
    pub acl_type_by_env: Option<BTreeMap<String, AclForm>>,
}

/// Build the full package code from a suffix or an already prefixed code.
///
/// The suffix must be 4 or 5 ASCII alphanumerics. The result is upper-cased.
pub fn package_code(product_code: &str, code: &str) -> PorticoResult<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(PorticoError::missing("code"));
    }
    let prefix = format!("{product_code}_");
    let suffix = code.strip_prefix(&prefix).unwrap_or(&code);
    if !(4..=5).contains(&suffix.len()) || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PorticoError::InvalidInput {
            message: format!("package code suffix '{suffix}' must be 4 or 5 alphanumeric characters"),
        });
    }
    Ok(format!("{prefix}{suffix}"))
}

/// Convert a TTL in hours to the stored milliseconds.
fn ttl_ms(hours: u64) -> PorticoResult<u64> {
    hours
        .checked_mul(MS_PER_HOUR)
        .ok_or_else(|| PorticoError::InvalidInput {
            message: format!("package ttl of {hours} hours is out of range"),
        })
}

/// Record `form` for `env`. apiGroup is what a missing entry reads as.
fn record_form(forms: &mut BTreeMap<String, AclForm>, env: &str, form: AclForm) {
    match form {
        AclForm::ApiGroup => forms.remove(env),
        AclForm::Granular => forms.insert(env.to_string(), form),
    };
}

/// Resolve a package reference without enforcing the suffix rules.
fn resolve_code(product_code: &str, code: &str) -> PorticoResult<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(PorticoError::missing("package"));
    }
    let prefix = format!("{product_code}_");
    if code.starts_with(&prefix) {
        Ok(code)
    } else {
        Ok(format!("{prefix}{code}"))
    }
}

/// Lower-case env keys of an ACL map, rejecting envs the config disallows.
fn normalize_acl(config: &ProductServiceConfig, acl: PerEnvAcl) -> PorticoResult<PerEnvAcl> {
    acl.into_iter()
        .map(|(env, value)| Ok((lookup::env(config, &env)?, value)))
        .collect()
}

/// Resolve the form of every env in `acl` and keep only the non-default entries.
fn resolve_forms(
    acl: &PerEnvAcl,
    explicit: &BTreeMap<String, AclForm>,
    fallback: impl Fn(&str) -> AclForm,
) -> BTreeMap<String, AclForm> {
    let explicit: BTreeMap<String, AclForm> = explicit
        .iter()
        .map(|(env, form)| (env.to_lowercase(), *form))
        .collect();

    acl.keys()
        .filter_map(|env| {
            let form = explicit.get(env).copied().unwrap_or_else(|| fallback(env));
            (form != AclForm::default()).then(|| (env.clone(), form))
        })
        .collect()
}

/// Package service.
pub struct PackageService<P: ProductRepository, D: ServiceDirectory> {
    products: P,
    directory: D,
    validator: AclValidator,
    config: ProductServiceConfig,
}

impl<P: ProductRepository, D: ServiceDirectory> PackageService<P, D> {
    pub fn new(products: P, directory: D, config: ProductServiceConfig) -> PorticoResult<Self> {
        Ok(Self {
            products,
            directory,
            validator: AclValidator::new()?,
            config,
        })
    }

    /// Form of `env` in `package`: the recorded one, apiGroup for data
    /// stored without a record, the configured default for a new env.
    fn form_of(&self, package: &Package, env: &str) -> AclForm {
        if package.acl_type_by_env.contains_key(env) || package.acl.contains_key(env) {
            package.form(env)
        } else {
            self.config.default_acl_form
        }
    }

    fn find<'p>(product: &'p Product, code: &str) -> PorticoResult<&'p Package> {
        let code = resolve_code(&product.code, code)?;
        product
            .package(&code)
            .ok_or(PorticoError::PackageNotFound { code })
    }

    fn find_mut<'p>(product: &'p mut Product, code: &str) -> PorticoResult<&'p mut Package> {
        let code = resolve_code(&product.code, code)?;
        product
            .package_mut(&code)
            .ok_or(PorticoError::PackageNotFound { code })
    }

    pub async fn add_package(
        &self,
        caller: &CallerContext,
        product: &str,
        input: AddPackageInput,
    ) -> PorticoResult<Package> {
        let mut product = lookup::product(&self.products, product).await?;
        caller.ensure_can_modify(&product)?;

        let code = package_code(&product.code, &input.code)?;
        if input.name.trim().is_empty() {
            return Err(PorticoError::missing("name"));
        }
        if product.package(&code).is_some() {
            return Err(PorticoError::AlreadyExists {
                entity: "package".into(),
                key: code,
            });
        }

        let acl = normalize_acl(&self.config, input.acl)?;
        let default_form = self.config.default_acl_form;
        let acl_type_by_env = resolve_forms(&acl, &input.acl_type_by_env, |_| default_form);
        self.validator.validate_env_acl(&acl, &acl_type_by_env)?;

        let ttl = ttl_ms(input.ttl_hours.unwrap_or(self.config.package_ttl_hours))?;
        let package = Package {
            code,
            name: input.name,
            description: input.description,
            ttl,
            acl,
            acl_type_by_env,
        };
        product.packages.push(package.clone());

        self.products
            .update_packages(product.id, product.packages)
            .await?;
        info!(product = %product.code, package = %package.code, "Package created");
        Ok(package)
    }

    pub async fn get_package(&self, product: &str, code: &str) -> PorticoResult<Package> {
        let product = lookup::product(&self.products, product).await?;
        Self::find(&product, code).cloned()
    }

    pub async fn list_packages(&self, product: &str) -> PorticoResult<Vec<Package>> {
        Ok(lookup::product(&self.products, product).await?.packages)
    }

    pub async fn update_package(
        &self,
        caller: &CallerContext,
        product: &str,
        code: &str,
        input: UpdatePackageInput,
    ) -> PorticoResult<Package> {
        let mut product = lookup::product(&self.products, product).await?;
        caller.ensure_can_modify(&product)?;

        let acl = input
            .acl
            .map(|acl| normalize_acl(&self.config, acl))
            .transpose()?;
        let package = Self::find_mut(&mut product, code)?;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(PorticoError::missing("name"));
            }
            package.name = name;
        }
        if let Some(description) = input.description {
            package.description = description;
        }
        if let Some(hours) = input.ttl_hours {
            package.ttl = ttl_ms(hours)?;
        }

        if acl.is_some() || input.acl_type_by_env.is_some() {
            let acl = acl.unwrap_or_else(|| package.acl.clone());
            let explicit = input.acl_type_by_env.unwrap_or_default();
            let before: &Package = package;
            let forms = resolve_forms(&acl, &explicit, |env| self.form_of(before, env));
            self.validator.validate_env_acl(&acl, &forms)?;
            package.acl = acl;
            package.acl_type_by_env = forms;
        }

        let updated = package.clone();
        self.products
            .update_packages(product.id, product.packages)
            .await?;
        info!(product = %product.code, package = %updated.code, "Package updated");
        Ok(updated)
    }

    pub async fn delete_package(
        &self,
        caller: &CallerContext,
        product: &str,
        code: &str,
    ) -> PorticoResult<()> {
        let mut product = lookup::product(&self.products, product).await?;
        caller.ensure_can_modify(&product)?;

        let code = Self::find(&product, code)?.code.clone();
        caller.ensure_not_active_package(&code)?;

        product.packages.retain(|p| p.code != code);
        self.products
            .update_packages(product.id, product.packages)
            .await?;
        info!(product = %product.code, package = %code, "Package deleted");
        Ok(())
    }

    /// Replace one environment's ACL of a package, validated against the
    /// form already recorded for that environment.
    pub async fn update_package_acl(
        &self,
        caller: &CallerContext,
        product: &str,
        code: &str,
        env: &str,
        acl: Value,
    ) -> PorticoResult<()> {
        let env = lookup::env(&self.config, env)?;
        let product = lookup::product(&self.products, product).await?;
        caller.ensure_can_modify(&product)?;
        let package = Self::find(&product, code)?;

        let form = self.form_of(package, &env);
        self.validator.validate(&acl, form)?;

        let mut acls = package.acl.clone();
        acls.insert(env.clone(), acl);
        let mut forms = package.acl_type_by_env.clone();
        record_form(&mut forms, &env, form);
        self.products
            .update_package_acl(product.id, &package.code, acls, forms)
            .await?;
        info!(
            product = %product.code,
            package = %package.code,
            env = %env,
            form = %form,
            "Package ACL updated"
        );
        Ok(())
    }

    /// Switch one environment of a package to another persisted form,
    /// re-encoding what is already stored.
    pub async fn set_package_acl_form(
        &self,
        caller: &CallerContext,
        product: &str,
        code: &str,
        env: &str,
        form: AclForm,
    ) -> PorticoResult<()> {
        let env = lookup::env(&self.config, env)?;
        let product = lookup::product(&self.products, product).await?;
        caller.ensure_can_modify(&product)?;
        let package = Self::find(&product, code)?;

        let current = self.form_of(package, &env);
        if current == form {
            debug!(package = %package.code, env = %env, form = %form, "Package ACL form unchanged");
            return Ok(());
        }

        let mut acls = package.acl.clone();
        if let Some(value) = package.acl.get(&env) {
            let converted = codec::convert(value, current, form)?;
            self.validator.validate(&converted, form)?;
            acls.insert(env.clone(), converted);
        }

        let mut forms = package.acl_type_by_env.clone();
        record_form(&mut forms, &env, form);

        self.products
            .update_package_acl(product.id, &package.code, acls, forms)
            .await?;
        info!(
            product = %product.code,
            package = %package.code,
            env = %env,
            from = %current,
            to = %form,
            "Package ACL form switched"
        );
        Ok(())
    }

    /// Preview a package ACL against the live service directory.
    pub async fn package_preview(
        &self,
        product: &str,
        code: &str,
        request: &PreviewRequest,
    ) -> PorticoResult<Vec<PreviewRow>> {
        let main_env = lookup::env(&self.config, &request.main_env)?;
        let sec_env = request
            .sec_env
            .as_deref()
            .map(|env| lookup::env(&self.config, env))
            .transpose()?;
        let product = lookup::product(&self.products, product).await?;
        let package = Self::find(&product, code)?;
        let catalog = lookup::catalog(&self.directory, request.service.as_deref()).await?;

        pipeline::preview(
            &catalog,
            &package.acl,
            |env| self.form_of(package, env),
            &main_env,
            sec_env.as_deref(),
            request.granularity,
            PreviewTarget::Package,
        )
    }

    /// Merge edited preview rows back into one environment of a package ACL.
    pub async fn update_package_preview(
        &self,
        caller: &CallerContext,
        product: &str,
        code: &str,
        env: &str,
        granularity: Granularity,
        rows: &[PreviewRow],
    ) -> PorticoResult<()> {
        let env = lookup::env(&self.config, env)?;
        let product = lookup::product(&self.products, product).await?;
        caller.ensure_can_modify(&product)?;
        let package = Self::find(&product, code)?;

        let form = self.form_of(package, &env);
        let merged = pipeline::merge(
            &self.validator,
            package.acl.get(&env),
            form,
            &env,
            rows,
            granularity,
            PreviewTarget::Package,
        )?;

        let mut acls = package.acl.clone();
        acls.insert(env.clone(), merged);
        let mut forms = package.acl_type_by_env.clone();
        record_form(&mut forms, &env, form);
        self.products
            .update_package_acl(product.id, &package.code, acls, forms)
            .await?;
        info!(
            product = %product.code,
            package = %package.code,
            env = %env,
            rows = rows.len(),
            "Package ACL merged from preview"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn package_code_accepts_suffix_or_full_code() {
        assert_eq!(package_code("SHOP", "gold").unwrap(), "SHOP_GOLD");
        assert_eq!(package_code("SHOP", "shop_gold").unwrap(), "SHOP_GOLD");
        assert_eq!(package_code("SHOP", "abcde").unwrap(), "SHOP_ABCDE");
    }

    #[test]
    fn package_code_suffix_rules() {
        assert!(matches!(
            package_code("SHOP", " "),
            Err(PorticoError::MissingInput { .. })
        ));
        assert!(package_code("SHOP", "abc").is_err());
        assert!(package_code("SHOP", "abcdef").is_err());
        assert!(package_code("SHOP", "ab-c").is_err());
    }

    #[test]
    fn ttl_conversion_rejects_overflow() {
        assert_eq!(ttl_ms(168).unwrap(), 168 * 3_600_000);
        assert!(matches!(
            ttl_ms(u64::MAX / 1000),
            Err(PorticoError::InvalidInput { .. })
        ));
    }

    #[test]
    fn record_form_keeps_only_granular() {
        let mut forms = BTreeMap::new();
        record_form(&mut forms, "dev", AclForm::Granular);
        assert_eq!(forms.get("dev"), Some(&AclForm::Granular));
        record_form(&mut forms, "dev", AclForm::ApiGroup);
        assert!(forms.is_empty());
    }

    #[test]
    fn resolve_code_prefixes_bare_suffix() {
        assert_eq!(resolve_code("SHOP", "gold").unwrap(), "SHOP_GOLD");
        assert_eq!(resolve_code("SHOP", "SHOP_GOLD").unwrap(), "SHOP_GOLD");
    }

    #[test]
    fn resolve_forms_keeps_only_granular_entries() {
        let acl: PerEnvAcl = [("dev".to_string(), json!({})), ("prod".to_string(), json!({}))]
            .into_iter()
            .collect();
        let explicit = [("PROD".to_string(), AclForm::Granular)].into_iter().collect();

        let forms = resolve_forms(&acl, &explicit, |_| AclForm::ApiGroup);
        assert_eq!(forms.len(), 1);
        assert_eq!(forms.get("prod"), Some(&AclForm::Granular));

        let forms = resolve_forms(&acl, &BTreeMap::new(), |_| AclForm::Granular);
        assert_eq!(forms.len(), 2);
    }
}
