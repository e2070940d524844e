//! Tests for the HTTP service directory client against a mock server.

use portico_acl::ServiceCatalog;
use portico_core::error::PorticoError;
use portico_core::repository::ServiceDirectory;
use portico_product::{DirectoryConfig, HttpServiceDirectory};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpServiceDirectory {
    HttpServiceDirectory::new(&DirectoryConfig {
        base_url: server.uri(),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn lists_services_and_builds_catalog() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/services/list"))
        .and(body_json(json!({ "serviceName": "users" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": true,
            "data": { "records": [ {
                "name": "users",
                "configuration": { "group": "Identity" },
                "versions": [ { "version": "1", "apis": [
                    { "v": "/list", "m": "GET", "group": "Users" }
                ] } ]
            } ] }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = client(&mock_server)
        .list_services(Some("users"))
        .await
        .unwrap();
    assert!(response.result);

    let catalog = ServiceCatalog::from_response(response).unwrap();
    let users = catalog.service("users").unwrap();
    assert_eq!(users.group, "Identity");
    assert_eq!(users.versions["1"][0].method, "get");
}

#[tokio::test]
async fn lists_all_services_with_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/services/list"))
        .and(body_json(json!({})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "result": true, "data": { "records": [] } })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = client(&mock_server).list_services(None).await.unwrap();
    assert!(response.data.unwrap().records.is_empty());
}

#[tokio::test]
async fn server_error_maps_to_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/services/list"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server).list_services(None).await.unwrap_err();
    match err {
        PorticoError::Upstream { detail } => {
            assert!(detail.contains("500"));
            assert!(detail.contains("boom"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_listing_is_reported_by_catalog() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/services/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": false,
            "errors": { "code": 600, "message": "directory offline" }
        })))
        .mount(&mock_server)
        .await;

    let response = client(&mock_server).list_services(None).await.unwrap();
    let err = ServiceCatalog::from_response(response).unwrap_err();
    assert!(matches!(err, PorticoError::Upstream { .. }));
    assert_eq!(err.code(), 503);
}
