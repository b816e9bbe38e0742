use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use url::Url;
use validator::ValidationError;

use crate::error::AppError;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]{3,50}$").expect("username pattern is valid")
});

/// Usernames: 3 to 50 letters, digits or underscores.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::new("invalid_username").with_message(
            "Username must be 3-50 characters of letters, digits or underscores.".into(),
        ));
    }
    Ok(())
}

/// Accepts only absolute http(s) URLs.
pub fn ensure_http_url(field: &str, value: &str) -> Result<(), AppError> {
    let parsed =
        Url::parse(value).map_err(|_| AppError::BadRequest(format!("{field} must be a valid URL")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::BadRequest(format!("{field} must use http or https")));
    }
    Ok(())
}

pub fn ensure_date_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if start >= end {
        return Err(AppError::BadRequest(
            "Start date must be before end date".to_string(),
        ));
    }
    Ok(())
}
