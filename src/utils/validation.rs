use crate::utils::error::{RelayError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(RelayError::validation(field_name, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(RelayError::validation(
                field_name,
                format!("Unsupported URL scheme '{}' in '{}'", scheme, url_str),
            )),
        },
        Err(e) => Err(RelayError::validation(
            field_name,
            format!("Invalid URL format '{}': {}", url_str, e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(RelayError::validation(field_name, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(RelayError::validation(
            field_name,
            "Path contains null bytes",
        ));
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(RelayError::validation(
            field_name,
            format!("Value must be at least {} (got {})", min_value, value),
        ));
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| RelayError::validation(field_name, "Field is required"))
}

/// Returns the trimmed value so callers keep what they validated.
pub fn validate_non_empty_string<'a>(field_name: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RelayError::validation(
            field_name,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(trimmed)
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(RelayError::validation(
            field_name,
            format!("Value must be between {} and {} (got {})", min, max, value),
        ));
    }
    Ok(())
}
