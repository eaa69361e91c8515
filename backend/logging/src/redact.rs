//! Log Redaction Layer
//!
//! Scrubs API keys and access tokens from strings prior to logging. Provider
//! errors are the main customer: Gemini carries its key in the request URL,
//! and transport errors echo that URL back.

use regex::Regex;
use std::sync::LazyLock;

static GOOGLE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AIza[0-9A-Za-z_\-]{20,}").unwrap());
static QUERY_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&](?:key|api_key|apikey)=)[^&\s)]+").unwrap());
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9\-_]{20,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = QUERY_KEY_RE.replace_all(input, "${1}[REDACTED]");
    let redacted = GOOGLE_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]");
    API_KEY_RE
        .replace_all(&redacted, "[REDACTED_TOKEN]")
        .into_owned()
}
