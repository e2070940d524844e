//! SurrealDB repository implementations.

mod product;

pub use product::SurrealProductRepository;
