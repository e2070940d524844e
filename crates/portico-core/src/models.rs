//! Domain models for Portico.
//!
//! These are the core types shared across all crates.

pub mod directory;
pub mod product;
