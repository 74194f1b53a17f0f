//! Well-known string formats.

use std::net::IpAddr;
use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("hardcoded email regex is valid")
});

static GUID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[{(]?[0-9a-fA-F]{8}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{12}[})]?$")
        .expect("hardcoded guid regex is valid")
});

pub(crate) fn is_alphanum(input: &str) -> bool {
    !input.is_empty() && input.chars().all(|c| c.is_ascii_alphanumeric())
}

pub(crate) fn is_token(input: &str) -> bool {
    !input.is_empty() && input.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn is_hex(input: &str) -> bool {
    !input.is_empty() && input.chars().all(|c| c.is_ascii_hexdigit())
}

pub(crate) fn is_email(input: &str) -> bool {
    input.len() <= 254 && EMAIL_REGEX.is_match(input)
}

pub(crate) fn is_guid(input: &str) -> bool {
    if !GUID_REGEX.is_match(input) {
        return false;
    }
    // Braces must pair up.
    match (input.chars().next(), input.chars().last()) {
        (Some('{'), last) => last == Some('}'),
        (Some('('), last) => last == Some(')'),
        (_, Some('}' | ')')) => false,
        _ => true,
    }
}

/// An absolute URI with a scheme.
pub(crate) fn is_uri(input: &str) -> bool {
    url::Url::parse(input).is_ok()
}

/// Padded standard base64.
pub(crate) fn is_base64(input: &str) -> bool {
    STANDARD.decode(input).is_ok()
}

/// An RFC 1123 hostname or an IP address.
///
/// Total length at most 253 characters without the optional trailing dot;
/// labels of 1 to 63 characters from `[a-zA-Z0-9-]`, neither starting nor
/// ending with a hyphen.
pub(crate) fn is_hostname(input: &str) -> bool {
    if input.parse::<IpAddr>().is_ok() {
        return true;
    }
    let hostname = input.strip_suffix('.').unwrap_or(input);
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    hostname.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Luhn checksum over a digit-only string.
pub(crate) fn is_credit_card(input: &str) -> bool {
    if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = input
        .bytes()
        .rev()
        .map(|b| u32::from(b - b'0'))
        .enumerate()
        .map(|(i, digit)| {
            if i % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .sum();
    sum % 10 == 0
}

/// Parses the ISO 8601 forms in common use: a full timestamp with offset, a
/// local date-time (taken as UTC) or a calendar date.
pub(crate) fn parse_iso_date(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(input, format) {
            return Some(date.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}
