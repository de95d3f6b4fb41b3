//! Secret redaction for response previews.
//!
//! Raw provider bodies are surfaced to API consumers for debugging; every
//! such preview must pass through here first so credentials never leave the
//! process.

use regex::Regex;
use std::sync::LazyLock;

/// Longest preview of a provider body returned to callers.
const MAX_PREVIEW_CHARS: usize = 1000;

/// Snippet length for diagnostic probe results.
const MAX_SNIPPET_CHARS: usize = 200;

static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)bearer\s+[^\s"']+"#).expect("valid regex"));

static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)api_key=[^\s&]+").expect("valid regex"));

/// Replace every literal occurrence of each secret with `***`.
pub fn redact_secrets(text: &str, secrets: &[&str]) -> String {
    let mut safe = text.to_string();
    for secret in secrets {
        if secret.is_empty() {
            continue;
        }
        safe = safe.replace(secret, "***");
    }
    safe
}

/// Redacted, length-capped preview of a provider body.
pub fn safe_preview(text: &str, secrets: &[&str]) -> String {
    truncate_chars(&redact_secrets(text, secrets), MAX_PREVIEW_CHARS)
}

/// Scrub bearer tokens and `api_key=` query/body values from a diagnostic
/// snippet, then cap its length.
pub fn scrub_auth_artifacts(text: &str, secrets: &[&str]) -> String {
    let safe = redact_secrets(text, secrets);
    let safe = BEARER_RE.replace_all(&safe, "Bearer REDACTED");
    let safe = API_KEY_RE.replace_all(&safe, "api_key=REDACTED");
    truncate_chars(&safe, MAX_SNIPPET_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_every_occurrence() {
        let out = redact_secrets("key=sek-123 again sek-123", &["sek-123"]);
        assert_eq!(out, "key=*** again ***");
    }

    #[test]
    fn empty_secrets_are_skipped() {
        let out = redact_secrets("nothing to hide", &[""]);
        assert_eq!(out, "nothing to hide");
    }

    #[test]
    fn redacts_multiple_secrets() {
        let out = redact_secrets("user=alice key=sek", &["alice", "sek"]);
        assert_eq!(out, "user=*** key=***");
    }

    #[test]
    fn preview_is_capped_at_1000_chars() {
        let long = "x".repeat(2000);
        let out = safe_preview(&long, &[]);
        assert_eq!(out.chars().count(), 1000);
    }

    #[test]
    fn preview_truncation_respects_char_boundaries() {
        let long = "é".repeat(1500);
        let out = safe_preview(&long, &[]);
        assert_eq!(out.chars().count(), 1000);
    }

    #[test]
    fn scrubs_bearer_tokens_and_api_key_params() {
        let text = r#"Authorization: Bearer abc.def token api_key=xyz&next=1"#;
        let out = scrub_auth_artifacts(text, &[]);
        assert!(out.contains("Bearer REDACTED"));
        assert!(out.contains("api_key=REDACTED"));
        assert!(!out.contains("abc.def"));
        assert!(!out.contains("xyz"));
    }

    #[test]
    fn snippet_is_capped_at_200_chars() {
        let long = "y".repeat(500);
        let out = scrub_auth_artifacts(&long, &[]);
        assert_eq!(out.chars().count(), 200);
    }
}
