//! Portico ACL — the ACL reshaping engine.
//!
//! Moves ACL data between the two persisted shapes (apiGroup and
//! granular), a typed canonical tree, and the flat preview rows the
//! management UI reviews before writing changes back:
//! - [`codec`] decodes persisted JSON into a [`tree::ServiceAcl`] and back
//! - [`merge`] applies preview deltas onto a decoded tree
//! - [`preview`] cross-references a [`catalog::ServiceCatalog`] with an ACL
//! - [`validator`] checks candidate ACL JSON against the persisted schemas

pub mod catalog;
pub mod codec;
pub mod error;
pub mod merge;
pub mod preview;
pub mod tree;
pub mod validator;

pub use catalog::ServiceCatalog;
pub use error::AclError;
pub use preview::{Granularity, PreviewRow};
pub use tree::{ApiAccess, ServiceAcl, VersionAcl};
pub use validator::AclValidator;
