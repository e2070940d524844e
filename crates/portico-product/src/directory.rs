//! HTTP client for the downstream service directory.

use std::time::Duration;

use portico_core::error::PorticoResult;
use portico_core::models::directory::DirectoryResponse;
use portico_core::repository::ServiceDirectory;
use serde_json::json;
use tracing::debug;

use crate::config::DirectoryConfig;
use crate::error::DirectoryError;

/// [`ServiceDirectory`] backed by the directory's HTTP listing endpoint.
///
/// Every call is a single uncached request; failures are not retried.
#[derive(Clone)]
pub struct HttpServiceDirectory {
    client: reqwest::Client,
    list_url: String,
}

impl HttpServiceDirectory {
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DirectoryError::Client(e.to_string()))?;

        Ok(Self {
            client,
            list_url: config.list_url(),
        })
    }

    async fn fetch(&self, service: Option<&str>) -> Result<DirectoryResponse, DirectoryError> {
        let body = match service {
            Some(name) => json!({ "serviceName": name }),
            None => json!({}),
        };

        debug!(url = %self.list_url, service = ?service, "Listing services");
        let response = self.client.post(&self.list_url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<DirectoryResponse>().await?)
    }
}

impl ServiceDirectory for HttpServiceDirectory {
    async fn list_services(&self, service: Option<&str>) -> PorticoResult<DirectoryResponse> {
        Ok(self.fetch(service).await?)
    }
}
