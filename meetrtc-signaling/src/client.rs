//! HTTP client for the connection details endpoint

use crate::error::SignalingError;
use crate::protocol::{ConnectionDetails, JoinRequest};
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info};
use url::Url;

/// Anything that can turn a join request into connection details
#[async_trait]
pub trait ConnectionDetailsSource: Send + Sync + fmt::Debug {
    /// Resolve connection details for `request`
    async fn fetch(&self, request: &JoinRequest) -> Result<ConnectionDetails, SignalingError>;
}

/// Client for `GET {endpoint}?roomName=&participantName=&region=`
#[derive(Debug, Clone)]
pub struct JoinClient {
    http: reqwest::Client,
    endpoint: Url,
    origin: String,
}

impl JoinClient {
    /// Create a client; a relative `endpoint` is resolved against `origin`
    pub fn new(endpoint: &str, origin: &str) -> Result<Self, SignalingError> {
        Self::with_http(reqwest::Client::new(), endpoint, origin)
    }

    /// Create a client on top of an existing HTTP client
    pub fn with_http(
        http: reqwest::Client,
        endpoint: &str,
        origin: &str,
    ) -> Result<Self, SignalingError> {
        let invalid = |source: url::ParseError| SignalingError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        };
        let base = Url::parse(origin).map_err(invalid)?;
        let endpoint = base.join(endpoint).map_err(invalid)?;
        Ok(Self {
            http,
            endpoint,
            origin: base.origin().ascii_serialization(),
        })
    }

    /// Resolved endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Value sent in the `Origin` header
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Full request URL for `request`
    pub fn request_url(&self, request: &JoinRequest) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().extend_pairs(request.query_pairs());
        url
    }
}

#[async_trait]
impl ConnectionDetailsSource for JoinClient {
    async fn fetch(&self, request: &JoinRequest) -> Result<ConnectionDetails, SignalingError> {
        let url = self.request_url(request);
        debug!("Requesting connection details from {}", url);

        let response = self
            .http
            .get(url)
            .header(reqwest::header::ORIGIN, &self.origin)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SignalingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let details: ConnectionDetails = serde_json::from_str(&body)?;
        info!(
            "Resolved connection details for room {} ({})",
            request.room_name, details.server_url
        );
        Ok(details)
    }
}

/// Source that always answers with the same details
#[derive(Debug, Clone)]
pub struct FixedConnectionDetails {
    details: ConnectionDetails,
}

impl FixedConnectionDetails {
    /// Wrap fixed details
    pub fn new(details: ConnectionDetails) -> Self {
        Self { details }
    }
}

#[async_trait]
impl ConnectionDetailsSource for FixedConnectionDetails {
    async fn fetch(&self, _request: &JoinRequest) -> Result<ConnectionDetails, SignalingError> {
        Ok(self.details.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_endpoint_resolves_against_origin() {
        let client = JoinClient::new("/api/connection-details", "https://meet.example.com").unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://meet.example.com/api/connection-details"
        );
        assert_eq!(client.origin(), "https://meet.example.com");
    }

    #[test]
    fn test_absolute_endpoint_wins() {
        let client = JoinClient::new(
            "https://tokens.example.org/details",
            "https://meet.example.com",
        )
        .unwrap();
        assert_eq!(client.endpoint().host_str(), Some("tokens.example.org"));
    }

    #[test]
    fn test_request_url_encodes_names() {
        let client = JoinClient::new("/api/connection-details", "http://localhost:3000").unwrap();
        let url = client.request_url(&JoinRequest::new("team sync", "Zoë"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("roomName".to_string(), "team sync".to_string()),
                ("participantName".to_string(), "Zoë".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_origin() {
        let err = JoinClient::new("/api/connection-details", "not a url").unwrap_err();
        assert!(matches!(err, SignalingError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_fixed_source() {
        let source = FixedConnectionDetails::new(ConnectionDetails::new("wss://a", "tok"));
        let details = tokio_test::block_on(source.fetch(&JoinRequest::new("demo", "alice"))).unwrap();
        assert_eq!(details.participant_token, "tok");
    }
}
