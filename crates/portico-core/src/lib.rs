//! Portico Core — domain models, repository traits and the error
//! taxonomy shared by every Portico crate.

pub mod error;
pub mod models;
pub mod repository;
