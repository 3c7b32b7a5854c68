use crate::domain::model::{GroupId, MediaKind, RecipientTarget, SendPayload, SendRequest};
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::validate_required_field;
use serde::{Deserialize, Serialize};

/// Bulk request body as it arrives from a client.
///
/// ```json
/// {"mode": "template", "template_name": "hello_world", "language": "en_US",
///  "parameters": ["Alice"], "phones": ["+15551234567"], "group_id": 3}
/// ```
///
/// Fields that do not belong to the chosen mode are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkSendBody {
    pub mode: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

impl BulkSendBody {
    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Validates the mode-specific fields into a typed request.
    pub fn into_request(self) -> Result<SendRequest> {
        let payload = match self.mode.trim().to_ascii_lowercase().as_str() {
            "text" => SendPayload::text(validate_required_field("text", &self.text)?)?,
            "template" => SendPayload::template(
                validate_required_field("template_name", &self.template_name)?,
                validate_required_field("language", &self.language)?,
                self.parameters,
            )?,
            "media" => {
                let kind = match self.media_type.as_deref().map(str::trim) {
                    Some(raw) if !raw.is_empty() => raw.parse()?,
                    _ => MediaKind::Document,
                };
                SendPayload::media(
                    validate_required_field("media_id", &self.media_id)?,
                    kind,
                    self.caption.as_deref(),
                )?
            }
            other => {
                return Err(RelayError::validation(
                    "mode",
                    format!("invalid mode '{}', expected text|template|media", other),
                ))
            }
        };

        Ok(SendRequest {
            payload,
            target: RecipientTarget {
                phones: self.phones,
                group_id: self.group_id,
            },
        })
    }
}
