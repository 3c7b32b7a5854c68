use crate::utils::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn e164_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^\+[0-9]+$").expect("static E.164 pattern"))
}

/// A normalized E.164 phone number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Trims surrounding whitespace and requires `+` followed by digits only.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if e164_pattern().is_match(trimmed) {
            Ok(Phone(trimmed.to_string()))
        } else {
            Err(RelayError::InvalidPhoneNumbers {
                entries: vec![raw.to_string()],
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Phone {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        Phone::parse(s)
    }
}

impl TryFrom<String> for Phone {
    type Error = RelayError;

    fn try_from(value: String) -> Result<Self> {
        Phone::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

macro_rules! numeric_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }
    };
}

numeric_id!(ContactId);
numeric_id!(GroupId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub phone: Phone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

/// Identifies whose provider credentials a dispatch uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub const DEFAULT: &'static str = "default";

    pub fn default_tenant() -> Self {
        TenantId(Self::DEFAULT.to_string())
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::default_tenant()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub phone_number_id: String,
    pub access_token: String,
    /// Template listing is keyed by the business account; falls back to the phone number id.
    pub business_account_id: Option<String>,
}

impl ProviderCredentials {
    pub fn template_account_id(&self) -> &str {
        self.business_account_id
            .as_deref()
            .unwrap_or(&self.phone_number_id)
    }
}

// Keep the token out of logs
impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("phone_number_id", &self.phone_number_id)
            .field("access_token", &"<redacted>")
            .field("business_account_id", &self.business_account_id)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }

    /// The provider rejects captions on audio messages.
    pub fn accepts_caption(&self) -> bool {
        !matches!(self, MediaKind::Audio)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            "document" => Ok(MediaKind::Document),
            other => Err(RelayError::validation(
                "media_type",
                format!("expected image|video|audio|document, got '{}'", other),
            )),
        }
    }
}

/// Validated message content, one variant per send mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendPayload {
    Text {
        body: String,
    },
    Template {
        name: String,
        language: String,
        parameters: Vec<String>,
    },
    Media {
        media_id: String,
        kind: MediaKind,
        caption: Option<String>,
    },
}

impl SendPayload {
    pub fn text(body: &str) -> Result<Self> {
        let body = crate::utils::validation::validate_non_empty_string("text", body)?;
        Ok(SendPayload::Text {
            body: body.to_string(),
        })
    }

    pub fn template(name: &str, language: &str, parameters: Vec<String>) -> Result<Self> {
        use crate::utils::validation::validate_non_empty_string;
        let name = validate_non_empty_string("template_name", name)?;
        let language = validate_non_empty_string("language", language)?;
        Ok(SendPayload::Template {
            name: name.to_string(),
            language: language.to_string(),
            parameters,
        })
    }

    pub fn media(media_id: &str, kind: MediaKind, caption: Option<&str>) -> Result<Self> {
        let media_id = crate::utils::validation::validate_non_empty_string("media_id", media_id)?;
        let caption = caption
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        Ok(SendPayload::Media {
            media_id: media_id.to_string(),
            kind,
            caption,
        })
    }

    pub fn mode(&self) -> &'static str {
        match self {
            SendPayload::Text { .. } => "text",
            SendPayload::Template { .. } => "template",
            SendPayload::Media { .. } => "media",
        }
    }
}

/// Who a send request targets: explicit phones, a group, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientTarget {
    pub phones: Vec<String>,
    pub group_id: Option<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub payload: SendPayload,
    pub target: RecipientTarget,
}

/// Successful provider answer, body passed through as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ProviderResponse {
    /// The provider's message id (`messages[0].id`) when present.
    pub fn message_id(&self) -> Option<&str> {
        self.body
            .get("messages")
            .and_then(|m| m.get(0))
            .and_then(|m| m.get("id"))
            .and_then(|id| id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHandle {
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub components: Vec<serde_json::Value>,
}

impl TemplateInfo {
    pub fn body_text(&self) -> Option<&str> {
        self.components
            .iter()
            .find(|c| {
                c.get("type")
                    .and_then(|t| t.as_str())
                    .map(|t| t.eq_ignore_ascii_case("BODY"))
                    .unwrap_or(false)
            })
            .and_then(|c| c.get("text"))
            .and_then(|t| t.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_parse_trims_and_accepts_e164() {
        let phone = Phone::parse("  +15551234567 ").unwrap();
        assert_eq!(phone.as_str(), "+15551234567");
    }

    #[test]
    fn test_phone_parse_rejects_malformed() {
        for raw in ["+abc", "15551234567", "+1 555 123", "+", "", "+1-555"] {
            match Phone::parse(raw) {
                Err(RelayError::InvalidPhoneNumbers { entries }) => {
                    assert_eq!(entries, vec![raw.to_string()])
                }
                other => panic!("expected rejection for {:?}, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_phone_deserialize_validates() {
        let ok: Phone = serde_json::from_str("\"+4470000\"").unwrap();
        assert_eq!(ok.as_str(), "+4470000");
        assert!(serde_json::from_str::<Phone>("\"4470000\"").is_err());
    }

    #[test]
    fn test_media_kind_caption_policy() {
        assert!(MediaKind::Image.accepts_caption());
        assert!(MediaKind::Video.accepts_caption());
        assert!(MediaKind::Document.accepts_caption());
        assert!(!MediaKind::Audio.accepts_caption());
        assert_eq!("Document".parse::<MediaKind>().unwrap(), MediaKind::Document);
        assert!("sticker".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_template_payload_requires_name_and_language() {
        assert!(SendPayload::template("", "en_US", vec![]).is_err());
        assert!(SendPayload::template("hello_world", " ", vec![]).is_err());
        let payload = SendPayload::template(" hello_world ", "en_US", vec!["Alice".into()]).unwrap();
        assert_eq!(
            payload,
            SendPayload::Template {
                name: "hello_world".into(),
                language: "en_US".into(),
                parameters: vec!["Alice".into()],
            }
        );
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let creds = ProviderCredentials {
            phone_number_id: "123".into(),
            access_token: "secret-token".into(),
            business_account_id: None,
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("secret-token"));
        assert_eq!(creds.template_account_id(), "123");
    }

    #[test]
    fn test_message_id_extraction() {
        let response = ProviderResponse {
            status: 200,
            body: serde_json::json!({"messages": [{"id": "wamid.abc"}]}),
        };
        assert_eq!(response.message_id(), Some("wamid.abc"));
    }
}
