use crate::domain::model::{MediaHandle, MediaUpload, ProviderCredentials, ProviderResponse, TemplateInfo};
use crate::domain::ports::MessagingProvider;
use crate::utils::error::{RelayError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_API_VERSION: &str = "v20.0";
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPLATE_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct WhatsAppSettings {
    pub base_url: String,
    pub api_version: String,
    pub send_timeout: Duration,
    pub upload_timeout: Duration,
}

impl Default for WhatsAppSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }
}

/// WhatsApp Cloud API client (Graph API).
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    settings: WhatsAppSettings,
    client: Client,
}

#[derive(Deserialize)]
struct TemplatePage {
    #[serde(default)]
    data: Vec<TemplateInfo>,
}

impl WhatsAppClient {
    pub fn new(settings: WhatsAppSettings) -> Self {
        Self {
            settings,
            client: Client::new(),
        }
    }

    fn endpoint(&self, node_id: &str, edge: &str) -> String {
        let base = self.settings.base_url.trim_end_matches('/');
        let version = self.settings.api_version.trim_matches('/');
        if version.is_empty() {
            format!("{}/{}/{}", base, node_id, edge)
        } else {
            format!("{}/{}/{}/{}", base, version, node_id, edge)
        }
    }

    /// Sends the request once and hands back status plus raw body text.
    async fn execute(
        &self,
        request: RequestBuilder,
        operation: &'static str,
        timeout: Duration,
    ) -> Result<(u16, String)> {
        let response = request.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                RelayError::Timeout {
                    operation,
                    seconds: timeout.as_secs(),
                }
            } else {
                RelayError::HttpError(e)
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                RelayError::Timeout {
                    operation,
                    seconds: timeout.as_secs(),
                }
            } else {
                RelayError::HttpError(e)
            }
        })?;

        tracing::debug!("{} answered {}", operation, status);

        if !status.is_success() {
            return Err(RelayError::ProviderError {
                status: status.as_u16(),
                body,
            });
        }
        Ok((status.as_u16(), body))
    }
}

#[async_trait]
impl MessagingProvider for WhatsAppClient {
    async fn send_message(
        &self,
        credentials: &ProviderCredentials,
        payload: &Value,
    ) -> Result<ProviderResponse> {
        let url = self.endpoint(&credentials.phone_number_id, "messages");
        let request = self
            .client
            .post(&url)
            .bearer_auth(&credentials.access_token)
            .json(payload);

        let (status, body) = self
            .execute(request, "message send", self.settings.send_timeout)
            .await?;

        let body = serde_json::from_str(&body).unwrap_or(Value::String(body));
        Ok(ProviderResponse { status, body })
    }

    async fn upload_media(
        &self,
        credentials: &ProviderCredentials,
        upload: MediaUpload,
    ) -> Result<MediaHandle> {
        let url = self.endpoint(&credentials.phone_number_id, "media");
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)?;
        let form = Form::new()
            .text("messaging_product", "whatsapp")
            .text("type", upload.mime_type.clone())
            .part("file", part);

        let request = self
            .client
            .post(&url)
            .bearer_auth(&credentials.access_token)
            .multipart(form);

        let (status, body) = self
            .execute(request, "media upload", self.settings.upload_timeout)
            .await?;

        let id = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string));
        match id {
            Some(id) => Ok(MediaHandle { id }),
            None => Err(RelayError::ProviderError { status, body }),
        }
    }

    async fn list_templates(&self, credentials: &ProviderCredentials) -> Result<Vec<TemplateInfo>> {
        let url = self.endpoint(credentials.template_account_id(), "message_templates");
        let request = self
            .client
            .get(&url)
            .bearer_auth(&credentials.access_token)
            .query(&[("limit", TEMPLATE_PAGE_LIMIT)]);

        let (_, body) = self
            .execute(request, "template listing", self.settings.send_timeout)
            .await?;
        let page: TemplatePage = serde_json::from_str(&body)?;
        Ok(page.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn credentials() -> ProviderCredentials {
        ProviderCredentials {
            phone_number_id: "1234".to_string(),
            access_token: "test-token".to_string(),
            business_account_id: Some("waba-9".to_string()),
        }
    }

    fn client_for(server: &MockServer) -> WhatsAppClient {
        WhatsAppClient::new(WhatsAppSettings {
            base_url: server.base_url(),
            ..WhatsAppSettings::default()
        })
    }

    #[tokio::test]
    async fn test_send_message_posts_with_bearer_token() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v20.0/1234/messages")
                .header("Authorization", "Bearer test-token")
                .json_body(json!({"messaging_product": "whatsapp", "to": "+1555"}));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"messages": [{"id": "wamid.1"}]}));
        });

        let client = client_for(&server);
        let response = client
            .send_message(
                &credentials(),
                &json!({"messaging_product": "whatsapp", "to": "+1555"}),
            )
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(response.status, 200);
        assert_eq!(response.message_id(), Some("wamid.1"));
    }

    #[tokio::test]
    async fn test_non_success_status_passes_body_through() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/v20.0/1234/messages");
            then.status(400)
                .body(r#"{"error":{"message":"Invalid parameter","code":100}}"#);
        });

        let client = client_for(&server);
        let err = client
            .send_message(&credentials(), &json!({}))
            .await
            .unwrap_err();

        api_mock.assert_hits(1);
        match err {
            RelayError::ProviderError { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, r#"{"error":{"message":"Invalid parameter","code":100}}"#);
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v20.0/1234/messages");
            then.status(200).delay(Duration::from_millis(500));
        });

        let client = WhatsAppClient::new(WhatsAppSettings {
            base_url: server.base_url(),
            send_timeout: Duration::from_millis(50),
            ..WhatsAppSettings::default()
        });

        let err = client
            .send_message(&credentials(), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RelayError::Timeout {
                operation: "message send",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_upload_media_returns_handle() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v20.0/1234/media")
                .header("Authorization", "Bearer test-token")
                .body_contains("messaging_product")
                .body_contains("report.pdf");
            then.status(200).json_body(json!({"id": "media-77"}));
        });

        let client = client_for(&server);
        let handle = client
            .upload_media(
                &credentials(),
                MediaUpload {
                    file_name: "report.pdf".to_string(),
                    mime_type: "application/pdf".to_string(),
                    bytes: b"%PDF-1.4".to_vec(),
                },
            )
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(handle.id, "media-77");
    }

    #[tokio::test]
    async fn test_list_templates_uses_business_account() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v20.0/waba-9/message_templates")
                .query_param("limit", "100");
            then.status(200).json_body(json!({
                "data": [{
                    "name": "hello_world",
                    "language": "en_US",
                    "status": "APPROVED",
                    "components": [{"type": "BODY", "text": "Hello {{1}}"}]
                }]
            }));
        });

        let client = client_for(&server);
        let templates = client.list_templates(&credentials()).await.unwrap();

        api_mock.assert();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].body_text(), Some("Hello {{1}}"));
    }

    #[test]
    fn test_endpoint_without_version() {
        let client = WhatsAppClient::new(WhatsAppSettings {
            base_url: "http://localhost:9000/".to_string(),
            api_version: String::new(),
            ..WhatsAppSettings::default()
        });
        assert_eq!(client.endpoint("1", "messages"), "http://localhost:9000/1/messages");
    }
}
