//! HTTP client for the WhatsApp Web bridge process

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use zapcast_common::config::WaBridgeConfig;
use zapcast_common::types::ChatAddress;
use zapcast_common::{Error, Result};

use super::gateway::{GroupInfo, SendReceipt, SessionStatus, WaGateway};

/// Gateway implementation backed by the external bridge's HTTP API.
///
/// The bridge owns the WhatsApp Web session (QR auth, reconnects); ZapCast
/// only consumes `status`, `send`, and `groups`, and receives acks on its own
/// webhook.
pub struct HttpBridgeGateway {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

impl HttpBridgeGateway {
    /// Create a new bridge gateway from configuration
    pub fn new(config: &WaBridgeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.bridge_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl WaGateway for HttpBridgeGateway {
    async fn status(&self) -> SessionStatus {
        let response = match self.http.get(self.url("/status")).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "Bridge unreachable; reporting disconnected");
                return SessionStatus::Disconnected;
            }
        };

        if !response.status().is_success() {
            return SessionStatus::Disconnected;
        }

        match response.json::<StatusResponse>().await {
            Ok(body) => match body.status.as_str() {
                "connected" => SessionStatus::Connected,
                "initializing" => SessionStatus::Initializing,
                "scanning" => SessionStatus::Scanning,
                "disconnected" => SessionStatus::Disconnected,
                other => {
                    warn!(status = other, "Unknown bridge status; treating as disconnected");
                    SessionStatus::Disconnected
                }
            },
            Err(e) => {
                warn!(error = %e, "Malformed bridge status response");
                SessionStatus::Disconnected
            }
        }
    }

    async fn send_message(
        &self,
        to: &ChatAddress,
        content: &str,
        media_url: Option<&str>,
    ) -> Result<SendReceipt> {
        let request = SendRequest {
            to: to.as_str(),
            content,
            media_url,
        };

        let response = self
            .http
            .post(self.url("/send"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Gateway(format!("Send request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Gateway(format!(
                "Bridge rejected send with status {}",
                response.status()
            )));
        }

        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| Error::Gateway(format!("Malformed send response: {}", e)))?;

        Ok(SendReceipt {
            provider_message_id: body.id,
        })
    }

    async fn groups(&self) -> Result<Vec<GroupInfo>> {
        let response = self
            .http
            .get(self.url("/groups"))
            .send()
            .await
            .map_err(|e| Error::Gateway(format!("Groups request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Gateway(format!(
                "Bridge rejected groups request with status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Gateway(format!("Malformed groups response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_for(server: &MockServer) -> HttpBridgeGateway {
        HttpBridgeGateway::new(&WaBridgeConfig {
            bridge_url: server.uri(),
            request_timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_status_connected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "connected"})))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        assert_eq!(gateway.status().await, SessionStatus::Connected);
    }

    #[tokio::test]
    async fn test_status_error_reads_as_disconnected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        assert_eq!(gateway.status().await, SessionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_send_maps_provider_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(body_json(json!({
                "to": "5511999999999@c.us",
                "content": "hello"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "true_5511@c.us_ABC"})))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let receipt = gateway
            .send_message(&ChatAddress::normalize("5511999999999"), "hello", None)
            .await
            .unwrap();

        assert_eq!(receipt.provider_message_id.as_deref(), Some("true_5511@c.us_ABC"));
    }

    #[tokio::test]
    async fn test_send_failure_is_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let err = gateway
            .send_message(&ChatAddress::normalize("5511999999999"), "hello", None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Gateway(_)));
    }

    #[tokio::test]
    async fn test_groups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "123-456@g.us", "name": "Team", "participants": 12}
            ])))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let groups = gateway.groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, "123-456@g.us");
        assert_eq!(groups[0].participants, 12);
    }
}
