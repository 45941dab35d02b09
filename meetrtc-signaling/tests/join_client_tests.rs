//! Integration tests for the join request client against a mock HTTP endpoint

use meetrtc_signaling::{ConnectionDetailsSource, JoinClient, JoinRequest, SignalingError};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> JoinClient {
    JoinClient::new("/api/connection-details", &server.uri()).unwrap()
}

#[tokio::test]
async fn test_fetch_connection_details() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/connection-details"))
        .and(query_param("roomName", "demo"))
        .and(query_param("participantName", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "serverUrl": "wss://media.example.com",
            "roomName": "demo",
            "participantName": "alice",
            "participantToken": "token-123",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let details = client
        .fetch(&JoinRequest::new("demo", "alice"))
        .await
        .unwrap();

    assert_eq!(details.server_url, "wss://media.example.com");
    assert_eq!(details.participant_token, "token-123");
}

#[tokio::test]
async fn test_region_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/connection-details"))
        .and(query_param("region", "eu-west"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "serverUrl": "wss://eu.example.com",
            "participantToken": "token-eu",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let details = client
        .fetch(&JoinRequest::new("demo", "alice").with_region("eu-west"))
        .await
        .unwrap();

    assert_eq!(details.server_url, "wss://eu.example.com");
}

#[tokio::test]
async fn test_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/connection-details"))
        .respond_with(ResponseTemplate::new(500).set_body_string("token service down"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .fetch(&JoinRequest::new("demo", "alice"))
        .await
        .unwrap_err();

    match err {
        SignalingError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "token service down");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/connection-details"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .fetch(&JoinRequest::new("demo", "alice"))
        .await
        .unwrap_err();

    assert!(matches!(err, SignalingError::Decode { .. }));
    let converted: meetrtc_core::MeetRtcError = err.into();
    assert_eq!(converted.error_code(), "JOIN_REQUEST_FAILED");
}

#[tokio::test]
async fn test_origin_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/connection-details"))
        .and(header("origin", server.uri().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "serverUrl": "wss://media.example.com",
            "participantToken": "token-origin",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let details = client
        .fetch(&JoinRequest::new("demo", "alice"))
        .await
        .unwrap();

    assert_eq!(details.participant_token, "token-origin");
}
