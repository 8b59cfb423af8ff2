//! Input validation and sanitization.
//!
//! - Image URL validation (scheme, length, internal-address blocking)
//! - Text sanitization for stored user input
//! - Document id and email shape checks for path parameters

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;
use url::Url;

/// Maximum URL length to prevent DoS attacks.
const MAX_URL_LENGTH: usize = 2048;

/// Maximum length of long-form text such as task details.
pub const MAX_TEXT_LENGTH: usize = 5000;

/// Maximum title/name length.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Hosts an image URL must never point at.
static BLOCKED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^https?://127\.",
        r"^https?://localhost",
        r"^https?://0\.0\.0\.0",
        r"^https?://10\.",
        r"^https?://172\.(1[6-9]|2[0-9]|3[0-1])\.",
        r"^https?://192\.168\.",
        r"^https?://169\.254\.",
        r"^https?://\[::1\]",
        r"^https?://\[f[cd]",
        r"^https?://\[fe80",
        r"^https?://metadata\.",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s/]+@[^@\s/]+\.[^@\s/]+$").expect("valid email pattern")
});

/// Validate a user-supplied image URL, returning it trimmed.
pub fn validate_image_url(url: &str) -> Result<String, String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("Image URL cannot be empty".to_string());
    }
    if url.len() > MAX_URL_LENGTH {
        return Err(format!(
            "Image URL exceeds maximum length of {} characters",
            MAX_URL_LENGTH
        ));
    }

    let parsed = Url::parse(url).map_err(|e| format!("Invalid image URL: {}", e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!(
            "Invalid protocol '{}'. Only HTTP and HTTPS are allowed.",
            parsed.scheme()
        ));
    }
    if parsed.host_str().is_none() {
        return Err("Image URL must have a host".to_string());
    }

    let lowered = url.to_lowercase();
    if BLOCKED_PATTERNS.iter().any(|p| p.is_match(&lowered)) {
        warn!(url = %url, "Blocked image URL targeting an internal address");
        return Err("Image URL appears to target an internal address".to_string());
    }

    Ok(url.to_string())
}

/// Validate an optional image URL; blank values become `None`.
pub fn validate_optional_image_url(url: Option<&str>) -> Result<Option<String>, String> {
    match url.map(str::trim) {
        None | Some("") => Ok(None),
        Some(u) => validate_image_url(u).map(Some),
    }
}

/// Strip control characters (keeping newlines and tabs), trim and cap length.
pub fn sanitize_text(input: &str, max_len: usize) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .take(max_len)
        .collect()
}

/// Single-line variant of [`sanitize_text`] for titles and names.
pub fn sanitize_title(input: &str) -> String {
    sanitize_text(&input.replace(['\n', '\r', '\t'], " "), MAX_TITLE_LENGTH)
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_PATTERN.is_match(email)
}

/// Document ids taken from the path: no separators, bounded length.
pub fn is_valid_document_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
