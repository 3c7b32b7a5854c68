use crate::domain::model::{
    MediaHandle, MediaKind, MediaUpload, Phone, ProviderCredentials, ProviderResponse, SendPayload,
    TemplateInfo, TenantId,
};
use crate::domain::ports::{CredentialProvider, MessagingProvider};
use crate::utils::error::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct MessageEnvelope<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(flatten)]
    body: MessageBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum MessageBody<'a> {
    Text { text: TextContent<'a> },
    Template { template: TemplateContent<'a> },
    Image { image: MediaContent<'a> },
    Video { video: MediaContent<'a> },
    Audio { audio: MediaContent<'a> },
    Document { document: MediaContent<'a> },
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct TemplateContent<'a> {
    name: &'a str,
    language: TemplateLanguage<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<TemplateComponent<'a>>,
}

#[derive(Debug, Serialize)]
struct TemplateLanguage<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct TemplateComponent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    parameters: Vec<TemplateParameter<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TemplateParameter<'a> {
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct MediaContent<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
}

/// Builds the provider wire payload for one recipient.
pub fn build_message(to: &Phone, payload: &SendPayload) -> Result<Value> {
    let body = match payload {
        SendPayload::Text { body } => MessageBody::Text {
            text: TextContent { body },
        },
        SendPayload::Template {
            name,
            language,
            parameters,
        } => {
            let components = if parameters.is_empty() {
                Vec::new()
            } else {
                vec![TemplateComponent {
                    kind: "body",
                    parameters: parameters
                        .iter()
                        .map(|p| TemplateParameter::Text { text: p })
                        .collect(),
                }]
            };
            MessageBody::Template {
                template: TemplateContent {
                    name,
                    language: TemplateLanguage { code: language },
                    components,
                },
            }
        }
        SendPayload::Media {
            media_id,
            kind,
            caption,
        } => {
            let content = MediaContent {
                id: media_id,
                caption: caption.as_deref().filter(|_| kind.accepts_caption()),
            };
            match kind {
                MediaKind::Image => MessageBody::Image { image: content },
                MediaKind::Video => MessageBody::Video { video: content },
                MediaKind::Audio => MessageBody::Audio { audio: content },
                MediaKind::Document => MessageBody::Document { document: content },
            }
        }
    };

    let envelope = MessageEnvelope {
        messaging_product: "whatsapp",
        to: to.as_str(),
        body,
    };
    Ok(serde_json::to_value(&envelope)?)
}

/// Sends one message per call through the provider, using per-tenant credentials.
///
/// Nothing here retries: a failed call is returned to the caller as is.
pub struct MessageDispatcher<P, C>
where
    P: MessagingProvider + ?Sized,
    C: CredentialProvider + ?Sized,
{
    provider: Arc<P>,
    credentials: Arc<C>,
}

impl<P, C> MessageDispatcher<P, C>
where
    P: MessagingProvider + ?Sized,
    C: CredentialProvider + ?Sized,
{
    pub fn new(provider: Arc<P>, credentials: Arc<C>) -> Self {
        Self {
            provider,
            credentials,
        }
    }

    pub async fn credentials_for(&self, tenant: &TenantId) -> Result<ProviderCredentials> {
        self.credentials.credentials_for(tenant).await
    }

    pub async fn dispatch(
        &self,
        tenant: &TenantId,
        to: &Phone,
        payload: &SendPayload,
    ) -> Result<ProviderResponse> {
        let credentials = self.credentials_for(tenant).await?;
        self.dispatch_with(&credentials, to, payload).await
    }

    pub async fn dispatch_with(
        &self,
        credentials: &ProviderCredentials,
        to: &Phone,
        payload: &SendPayload,
    ) -> Result<ProviderResponse> {
        let message = build_message(to, payload)?;
        tracing::debug!("Dispatching {} message to {}", payload.mode(), to);
        self.provider.send_message(credentials, &message).await
    }

    pub async fn upload_media(&self, tenant: &TenantId, upload: MediaUpload) -> Result<MediaHandle> {
        let credentials = self.credentials_for(tenant).await?;
        tracing::debug!(
            "Uploading {} ({}, {} bytes)",
            upload.file_name,
            upload.mime_type,
            upload.bytes.len()
        );
        self.provider.upload_media(&credentials, upload).await
    }

    pub async fn list_templates(&self, tenant: &TenantId) -> Result<Vec<TemplateInfo>> {
        let credentials = self.credentials_for(tenant).await?;
        self.provider.list_templates(&credentials).await
    }
}
