use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crystal_viewer::{CrystalClient, CrystalSource, FetchError};

async fn server_returning(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/crystals/42"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn returns_data_of_successful_response() {
    let server = server_returning(ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": {
            "geometry": {
                "vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
                "faces": [[0, 1, 2]]
            },
            "crystal": {"purity": 0.9, "glow_intensity": 0.5, "facets": 3},
            "metrics": {"total_content": 10, "diversity": 0.5}
        }
    })))
    .await;

    let client = CrystalClient::new(server.uri());
    let descriptor = client
        .fetch_crystal_data("42")
        .await
        .expect("crystal data");

    let geometry = descriptor.geometry.expect("geometry");
    assert_eq!(geometry.vertices.map(|v| v.len()), Some(3));
    assert_eq!(geometry.faces, Some(vec![[0, 1, 2]]));
    assert!(geometry.colors.is_none());
    assert_eq!(descriptor.crystal.facets, 3);
    assert_eq!(descriptor.metrics.total_content, 10.0);
}

#[tokio::test]
async fn not_found_yields_none() {
    let server = server_returning(ResponseTemplate::new(404)).await;
    let client = CrystalClient::new(server.uri());

    assert!(client.fetch_crystal_data("42").await.is_none());
    assert!(matches!(
        client.try_fetch("42").await,
        Err(FetchError::Status(404))
    ));
}

#[tokio::test]
async fn server_error_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;
    let client = CrystalClient::new(server.uri());

    assert!(client.fetch_crystal_data("42").await.is_none());
}

#[tokio::test]
async fn rejected_payload_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/crystals/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "user not found"
        })))
        .mount(&server)
        .await;
    let client = CrystalClient::new(server.uri());

    assert!(client.fetch_crystal_data("42").await.is_none());
    match client.try_fetch("42").await {
        Err(FetchError::Rejected(reason)) => assert_eq!(reason.as_deref(), Some("user not found")),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_yields_none() {
    let server = server_returning(ResponseTemplate::new(200).set_body_string("not json")).await;
    let client = CrystalClient::new(server.uri());

    assert!(client.fetch_crystal_data("42").await.is_none());
}

#[tokio::test]
async fn success_without_data_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/crystals/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;
    let client = CrystalClient::new(server.uri());

    assert!(matches!(
        client.try_fetch("42").await,
        Err(FetchError::MissingData)
    ));
}

#[tokio::test]
async fn unreachable_server_yields_none() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = CrystalClient::new(uri);
    assert!(client.fetch_crystal_data("42").await.is_none());
}
