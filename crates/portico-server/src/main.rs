//! Portico Server — Application entry point.

use portico_core::error::PorticoError;
use portico_db::repository::SurrealProductRepository;
use portico_db::{DbConfig, DbManager};
use portico_product::{
    DirectoryConfig, HttpServiceDirectory, PackageService, ProductService, ProductServiceConfig,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), PorticoError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("portico=info")),
        )
        .json()
        .init();

    tracing::info!("Starting Portico server...");

    let db_config = DbConfig::from_env()?;
    let service_config = ProductServiceConfig::from_env()?;
    let directory_config = DirectoryConfig::from_env()?;

    let db = DbManager::connect(&db_config).await?;
    let repo = SurrealProductRepository::new(db.client());
    let directory = HttpServiceDirectory::new(&directory_config)?;

    let _products = ProductService::new(repo.clone(), directory.clone(), service_config.clone())?;
    let _packages = PackageService::new(repo, directory, service_config.clone())?;

    tracing::info!(
        directory = %directory_config.list_url(),
        environments = ?service_config.environments,
        "Product and package services ready"
    );

    // TODO: Mount the product and package services behind the REST API

    tracing::info!("Portico server stopped.");
    Ok(())
}
