use anyhow::Result;
use httpmock::prelude::*;
use notify_relay::app::media_upload_from_path;
use notify_relay::domain::model::{MediaKind, Phone, SendPayload, TenantId};
use notify_relay::{RelayApp, RelayConfig, RelayError};
use serde_json::json;
use tempfile::TempDir;

fn config_for(server: &MockServer, dir: &TempDir) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.provider.base_url = server.base_url();
    config.provider.phone_number_id = Some("1234".into());
    config.provider.access_token = Some("test-token".into());
    config.store.path = dir
        .path()
        .join("recipients.json")
        .to_string_lossy()
        .to_string();
    config
}

#[tokio::test]
async fn test_audio_send_drops_caption() -> Result<()> {
    let dir = TempDir::new()?;
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v20.0/1234/messages")
            .json_body(json!({
                "messaging_product": "whatsapp",
                "to": "+15550001",
                "type": "audio",
                "audio": {"id": "media-77"}
            }));
        then.status(200)
            .json_body(json!({"messages": [{"id": "wamid.a"}]}));
    });

    let app = RelayApp::open(&config_for(&server, &dir)).await?;
    let payload = SendPayload::media("media-77", MediaKind::Audio, Some("ignored"))?;
    let response = app
        .dispatcher
        .dispatch(&TenantId::default_tenant(), &Phone::parse("+15550001")?, &payload)
        .await?;

    api_mock.assert();
    assert_eq!(response.message_id(), Some("wamid.a"));
    Ok(())
}

#[tokio::test]
async fn test_provider_rejection_is_returned_once() -> Result<()> {
    let dir = TempDir::new()?;
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v20.0/1234/messages");
        then.status(401)
            .json_body(json!({"error": {"message": "Invalid OAuth access token"}}));
    });

    let app = RelayApp::open(&config_for(&server, &dir)).await?;
    let result = app
        .dispatcher
        .dispatch(
            &TenantId::default_tenant(),
            &Phone::parse("+15550001")?,
            &SendPayload::text("hello")?,
        )
        .await;

    api_mock.assert_hits(1);
    match result {
        Err(RelayError::ProviderError { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("Invalid OAuth access token"));
        }
        other => panic!("expected provider error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_media_upload_from_file() -> Result<()> {
    let dir = TempDir::new()?;
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v20.0/1234/media")
            .header("Authorization", "Bearer test-token")
            .body_contains("whatsapp")
            .body_contains("poster.png");
        then.status(200).json_body(json!({"id": "media-123"}));
    });

    let file = dir.path().join("poster.png");
    std::fs::write(&file, b"fake png bytes")?;

    let app = RelayApp::open(&config_for(&server, &dir)).await?;
    let upload = media_upload_from_path(&file)?;
    assert_eq!(upload.mime_type, "image/png");

    let handle = app
        .dispatcher
        .upload_media(&TenantId::default_tenant(), upload)
        .await?;

    api_mock.assert();
    assert_eq!(handle.id, "media-123");
    Ok(())
}
