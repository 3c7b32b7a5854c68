use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': {message}")]
    ValidationError { field: String, message: String },

    #[error("Invalid phone numbers (expected E.164 like +15551234567): {}", entries.join(", "))]
    InvalidPhoneNumbers { entries: Vec<String> },

    #[error("No recipients to send to")]
    EmptyRecipients,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {key}")]
    Conflict { entity: &'static str, key: String },

    #[error("Provider returned {status}: {body}")]
    ProviderError { status: u16, body: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Caller input problem, nothing was sent
    Low,
    /// Upstream problem, may succeed on a later manual attempt
    Medium,
    /// Local processing failure
    High,
    /// Misconfiguration, nothing can be sent until fixed
    Critical,
}

impl ErrorSeverity {
    /// Process exit status for a failed command; never 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Low => 4, // 請求被拒絕，未送出
            ErrorSeverity::Medium => 2, // 上游錯誤，可稍後重試
            ErrorSeverity::High => 1, // 處理錯誤
            ErrorSeverity::Critical => 3, // 配置錯誤
        }
    }
}

impl RelayError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        RelayError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        RelayError::ConfigError {
            message: message.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RelayError::ValidationError { .. }
            | RelayError::InvalidPhoneNumbers { .. }
            | RelayError::EmptyRecipients
            | RelayError::NotFound { .. }
            | RelayError::Conflict { .. } => ErrorSeverity::Low,
            RelayError::HttpError(_)
            | RelayError::ProviderError { .. }
            | RelayError::Timeout { .. } => ErrorSeverity::Medium,
            RelayError::CsvError(_)
            | RelayError::IoError(_)
            | RelayError::SerializationError(_) => ErrorSeverity::High,
            RelayError::ConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Upstream status code when the provider answered at all.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            RelayError::ProviderError { status, .. } => Some(*status),
            RelayError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RelayError::ValidationError { .. } => "Check the named field and try again",
            RelayError::InvalidPhoneNumbers { .. } => {
                "Use E.164 numbers: a leading '+' followed by digits only"
            }
            RelayError::EmptyRecipients => "Pass --phones or a --group-id that has members",
            RelayError::NotFound { .. } => "List contacts/groups to find a valid id",
            RelayError::Conflict { .. } => "Reuse the existing entry instead of creating it again",
            RelayError::ProviderError { .. } => {
                "Inspect the provider response body; fix the payload or credentials before resending"
            }
            RelayError::Timeout { .. } | RelayError::HttpError(_) => {
                "Check network connectivity to the provider API"
            }
            RelayError::ConfigError { .. } => {
                "Set WA_TOKEN and WA_PHONE_ID or fill in the [provider] section of the config file"
            }
            RelayError::CsvError(_) => "Make sure the CSV has a 'name,phone[,group]' header row",
            RelayError::IoError(_) => "Check file paths and permissions",
            RelayError::SerializationError(_) => "The store snapshot or request file is not valid JSON",
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
