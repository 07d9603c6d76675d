use crate::utils::error::{ApiError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<Url> {
    if url_str.trim().is_empty() {
        return Err(ApiError::configuration(format!(
            "Invalid value for '{}': URL cannot be empty",
            field_name
        )));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ApiError::configuration(format!(
                "Invalid value for '{}': unsupported URL scheme: {}",
                field_name, scheme
            ))),
        },
        Err(e) => Err(ApiError::configuration(format!(
            "Invalid value for '{}': invalid URL format: {}",
            field_name, e
        ))),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!(
            "Invalid value for '{}': value cannot be empty or whitespace-only",
            field_name
        )));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ApiError::configuration(format!(
            "Invalid value for '{}': {} must be between {} and {}",
            field_name, value, min, max
        )));
    }
    Ok(())
}

/// Path segments (ids, environment names) are interpolated into URLs.
pub fn validate_path_segment(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty_string(field_name, value)?;
    if value.contains(['/', '?', '#']) || value == "." || value == ".." {
        return Err(ApiError::validation(format!(
            "Invalid value for '{}': '{}' must not contain '/', '?' or '#'",
            field_name, value
        )));
    }
    Ok(())
}
