//! Per-field-type input cleaning.
//!
//! Defense-in-depth on top of SeaORM's parameterized queries, not a
//! substitute for them: free-text fields are entity-escaped and stripped
//! of script/handler and common SQL token patterns before they are
//! persisted or reflected.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("Invalid UUID")]
    InvalidUuid,

    #[error("Value exceeds maximum length of {0} characters")]
    TooLong(usize),
}

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

fn script_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"(?is)<script\b[^>]*>.*?</script\s*>|<script\b[^>]*/?>")
}

fn event_handler_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r#"(?i)\son\w+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#)
}

fn js_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"(?i)javascript\s*:")
}

fn sql_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(
        &RE,
        r"(?i)(\bunion\s+select\b|\binsert\s+into\b|\bdrop\s+table\b|\bdelete\s+from\b|\bexec\s*\(|;\s*--|--\s*$|\bxp_\w+)",
    )
}

fn strip_dangerous(value: &str) -> String {
    let value = script_tag_re().replace_all(value, "");
    let value = event_handler_re().replace_all(&value, "");
    let value = js_url_re().replace_all(&value, "");
    sql_token_re().replace_all(&value, "").into_owned()
}

/// Clean a short free-text field (names, reasons, notes): strip script
/// and SQL tokens, then HTML-entity-escape the remainder.
#[must_use]
pub fn sanitize_plain_text(value: &str) -> String {
    let stripped = strip_dangerous(value.trim());
    html_escape::encode_safe(&stripped).into_owned()
}

/// Clean rich text: scripts and handlers are removed but benign markup
/// is kept as-is.
#[must_use]
pub fn sanitize_rich_text(value: &str) -> String {
    strip_dangerous(value.trim())
}

/// Clean a search query: dangerous tokens stripped, whitespace collapsed.
#[must_use]
pub fn sanitize_search_query(value: &str) -> String {
    let stripped = strip_dangerous(value.trim());
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate and normalize an email address (lowercased).
pub fn validate_email(value: &str) -> Result<String, SanitizeError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$");

    let trimmed = value.trim();
    if trimmed.len() > 254 {
        return Err(SanitizeError::TooLong(254));
    }
    if !re.is_match(trimmed) {
        return Err(SanitizeError::InvalidEmail);
    }

    Ok(trimmed.to_ascii_lowercase())
}

/// Validate and normalize a phone number to digits with an optional
/// leading `+` (7 to 15 digits, per E.164).
pub fn validate_phone(value: &str) -> Result<String, SanitizeError> {
    let trimmed = value.trim();
    let has_plus = trimmed.starts_with('+');

    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if !(7..=15).contains(&digits.len()) {
        return Err(SanitizeError::InvalidPhone);
    }

    // Reject anything that isn't digits and common separators.
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || "+-() .".contains(c))
    {
        return Err(SanitizeError::InvalidPhone);
    }

    Ok(if has_plus {
        format!("+{digits}")
    } else {
        digits
    })
}

/// Validate a UUID, returning its canonical hyphenated lowercase form.
pub fn validate_uuid(value: &str) -> Result<String, SanitizeError> {
    uuid::Uuid::parse_str(value.trim())
        .map(|u| u.to_string())
        .map_err(|_| SanitizeError::InvalidUuid)
}
