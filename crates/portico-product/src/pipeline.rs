//! In-memory ACL pipelines: decode → preview, and decode → merge →
//! encode → validate. Nothing here touches persistence.

use portico_acl::codec;
use portico_acl::merge::merge_rows;
use portico_acl::preview::{EnvAcl, PreviewBuilder, PreviewTarget};
use portico_acl::{AclValidator, Granularity, PreviewRow, ServiceAcl, ServiceCatalog};
use portico_core::error::PorticoResult;
use portico_core::models::product::{AclForm, PerEnvAcl};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Parameters of a preview request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub main_env: String,
    #[serde(default)]
    pub sec_env: Option<String>,
    pub granularity: Granularity,
    /// Narrow the preview to one service.
    #[serde(default)]
    pub service: Option<String>,
}

fn decode_env(acl: &PerEnvAcl, env: &str, form: AclForm) -> PorticoResult<ServiceAcl> {
    match acl.get(env) {
        Some(value) => Ok(codec::decode(value, form)?),
        None => Ok(ServiceAcl::default()),
    }
}

/// Build preview rows for `main_env` and the optional `sec_env`.
pub(crate) fn preview(
    catalog: &ServiceCatalog,
    acl: &PerEnvAcl,
    form_of: impl Fn(&str) -> AclForm,
    main_env: &str,
    sec_env: Option<&str>,
    granularity: Granularity,
    target: PreviewTarget,
) -> PorticoResult<Vec<PreviewRow>> {
    let main = decode_env(acl, main_env, form_of(main_env))?;
    let secondary = match sec_env {
        Some(env) => Some((env, decode_env(acl, env, form_of(env))?)),
        None => None,
    };

    let builder = PreviewBuilder::new(
        catalog,
        EnvAcl {
            env: main_env,
            acl: &main,
        },
        target,
    )
    .with_secondary(secondary.as_ref().map(|(env, acl)| EnvAcl { env: *env, acl }));

    let rows = builder.build(granularity);
    debug!(main_env, sec_env = ?sec_env, rows = rows.len(), "Built ACL preview");
    Ok(rows)
}

/// Merge preview deltas into one env's persisted ACL and return the
/// validated result, re-encoded in `form`.
pub(crate) fn merge(
    validator: &AclValidator,
    current: Option<&Value>,
    form: AclForm,
    env: &str,
    rows: &[PreviewRow],
    granularity: Granularity,
    target: PreviewTarget,
) -> PorticoResult<Value> {
    let mut tree = match current {
        Some(value) => codec::decode(value, form)?,
        None => ServiceAcl::default(),
    };

    merge_rows(&mut tree, rows, env, granularity, target);

    let merged = codec::encode(&tree, form);
    validator.validate(&merged, form)?;
    Ok(merged)
}
