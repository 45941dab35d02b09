//! Join request and connection details payloads

use serde::{Deserialize, Serialize};

/// Default path of the connection details endpoint
pub const DEFAULT_CONN_DETAILS_ENDPOINT: &str = "/api/connection-details";

/// Parameters of a join request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Room to join
    pub room_name: String,
    /// Display name of the joining participant
    pub participant_name: String,
    /// Preferred server region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl JoinRequest {
    /// Request without a region preference
    pub fn new(room_name: impl Into<String>, participant_name: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
            participant_name: participant_name.into(),
            region: None,
        }
    }

    /// Set the preferred region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Query pairs in the order the endpoint expects
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("roomName", self.room_name.as_str()),
            ("participantName", self.participant_name.as_str()),
        ];
        if let Some(region) = &self.region {
            pairs.push(("region", region.as_str()));
        }
        pairs
    }
}

/// Connection details returned by the join endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    /// Media server URL
    pub server_url: String,
    /// Access token for the participant
    pub participant_token: String,
    /// Room name echoed by the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    /// Participant name echoed by the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_name: Option<String>,
}

impl ConnectionDetails {
    /// Details with only the required fields
    pub fn new(server_url: impl Into<String>, participant_token: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            participant_token: participant_token.into(),
            room_name: None,
            participant_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_without_region() {
        let request = JoinRequest::new("demo", "alice");
        assert_eq!(
            request.query_pairs(),
            vec![("roomName", "demo"), ("participantName", "alice")]
        );
    }

    #[test]
    fn test_query_pairs_with_region() {
        let request = JoinRequest::new("demo", "alice").with_region("eu");
        assert_eq!(request.query_pairs().last(), Some(&("region", "eu")));
    }

    #[test]
    fn test_details_tolerate_extra_fields() {
        let json = r#"{
            "serverUrl": "wss://media.example.com",
            "roomName": "demo",
            "participantName": "alice",
            "participantToken": "tok",
            "ttl": 600
        }"#;
        let details: ConnectionDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.server_url, "wss://media.example.com");
        assert_eq!(details.participant_token, "tok");
        assert_eq!(details.room_name.as_deref(), Some("demo"));
    }

    #[test]
    fn test_details_minimal() {
        let details: ConnectionDetails =
            serde_json::from_str(r#"{"serverUrl":"wss://a","participantToken":"b"}"#).unwrap();
        assert_eq!(details, ConnectionDetails::new("wss://a", "b"));
    }
}
