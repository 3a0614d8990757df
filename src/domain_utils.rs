use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// Labels of 1-63 chars, alphanumeric at both ends, at least two labels.
static TARGET_DOMAIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^[a-z0-9](?:[a-z0-9\-]{0,61}[a-z0-9])?",
        r"(?:\.[a-z0-9](?:[a-z0-9\-]{0,61}[a-z0-9])?)+$"
    ))
    .unwrap()
});

const MAX_DOMAIN_LEN: usize = 253;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidDomain {
    #[error("domain is empty")]
    Empty,

    #[error("domain '{0}' exceeds 253 characters")]
    TooLong(String),

    #[error("'{0}' is not a valid domain name (expected something like example.com)")]
    Malformed(String),
}

/// A validated, lowercase target domain without a trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TargetDomain(String);

impl TargetDomain {
    pub fn parse(input: &str) -> Result<Self, InvalidDomain> {
        let normalized = input.trim().trim_end_matches('.').to_lowercase();

        if normalized.is_empty() {
            return Err(InvalidDomain::Empty);
        }
        if normalized.len() > MAX_DOMAIN_LEN {
            return Err(InvalidDomain::TooLong(normalized));
        }
        if !TARGET_DOMAIN_REGEX.is_match(&normalized) {
            return Err(InvalidDomain::Malformed(input.trim().to_string()));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TargetDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a candidate hostname for set membership (trim, lowercase,
/// drop a trailing dot). Returns None for empty input.
pub fn normalize_hostname(hostname: &str) -> Option<String> {
    let normalized = hostname.trim().trim_end_matches('.').to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Remove a leading wildcard label (`*.example.com` -> `example.com`)
pub fn strip_wildcard(hostname: &str) -> &str {
    hostname.strip_prefix("*.").unwrap_or(hostname)
}

/// Build the brute-force candidate `word.domain`
pub fn join_label(word: &str, domain: &TargetDomain) -> String {
    format!("{}.{}", word.trim().trim_end_matches('.'), domain.as_str())
}
