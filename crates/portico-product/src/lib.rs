//! Portico Product — product and package services over the ACL engine.
//!
//! Every mutating operation follows the same shape: load the product,
//! check the caller against it, run the ACL transformation in memory,
//! validate the result and persist it with a single repository write.

pub mod config;
pub mod context;
pub mod directory;
pub mod error;
mod lookup;
pub mod package;
mod pipeline;
pub mod product;

pub use config::{DirectoryConfig, ProductServiceConfig};
pub use context::CallerContext;
pub use directory::HttpServiceDirectory;
pub use error::{ConfigError, DirectoryError};
pub use package::{AddPackageInput, PackageService, UpdatePackageInput};
pub use pipeline::PreviewRequest;
pub use product::{AddProductInput, ProductService, UpdateProductInput};
