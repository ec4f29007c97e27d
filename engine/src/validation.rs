use crate::{
    error::{validation_error, AppError},
    url_parts::UrlParts,
};

/// Trims the input, adds `http://` when no http(s) scheme is present, and
/// requires a non-empty authority. Malformed hosts (bad IPv4 literals,
/// spaces, angle brackets) are accepted: they are what gets scored. The
/// returned text is handed to the extractor unchanged.
pub fn normalize_url(input: &str) -> Result<String, AppError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(validation_error("URL cannot be empty"));
    }

    let url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    if UrlParts::split(&url).netloc.is_empty() {
        return Err(validation_error("Invalid URL format"));
    }
    Ok(url)
}
