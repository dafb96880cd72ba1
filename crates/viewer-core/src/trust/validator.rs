//! User-URL validation: normalisation, host authorisation, session extraction.
//!
//! # Two-tier verdict
//!
//! [`validate`] separates two kinds of problem:
//!
//! - **Hard failures** make the URL unusable: nothing was entered, the text is
//!   not a parseable absolute URL, or its host is not trusted.  `valid` is
//!   `false`.
//! - **Advisories** leave the URL usable: it points at a trusted host but does
//!   not contain a known hacking-view route.  `valid` stays `true` while
//!   `error` carries [`UrlIssue::NotHackingView`].
//!
//! The checks run in a fixed order (required → format → allowlist) so at most
//! one hard failure is ever reported.

use serde::{Serialize, Serializer};
use thiserror::Error;
use url::{form_urlencoded, Url};

use super::policy::TrustPolicy;

/// Route markers that identify a hacking-view link.
const HACKING_VIEW_ROUTES: &[&str] = &["#/hacking/view", "/#/hacking/view"];

/// Number of session-id characters kept by [`format_session_display`].
const SESSION_DISPLAY_LEN: usize = 8;

// ── Verdict types ─────────────────────────────────────────────────────────────

/// A problem found while validating a user-supplied URL.
///
/// The `Display` text of each variant is the exact message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlIssue {
    /// The input was empty or whitespace.
    #[error("URL is required")]
    Required,

    /// The normalised input did not parse as an absolute URL with a host.
    #[error("Invalid URL format")]
    InvalidFormat,

    /// The host is not covered by the allowlist and the override is off.
    #[error("Host \"{host}\" is not in the allowlist. Allowed: {}", .allowed.join(", "))]
    HostNotAllowed {
        /// The rejected host.
        host: String,
        /// The allowlist that was consulted, in configured order.
        allowed: Vec<String>,
    },

    /// The URL is trusted but lacks a recognised hacking-view route.
    #[error("URL does not appear to be a hacking view link")]
    NotHackingView,
}

impl UrlIssue {
    /// `true` for issues that make the URL unusable, `false` for advisories.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, UrlIssue::NotHackingView)
    }
}

/// The outcome of one [`validate`] call.
///
/// Invariant: `valid == true` implies `host` is non-empty and was authorised by
/// the policy in effect.  `error` may still be set on a valid result (see the
/// module docs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub normalized: String,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_issue"
    )]
    pub error: Option<UrlIssue>,
}

impl ValidationResult {
    fn rejected(normalized: String, host: String, issue: UrlIssue) -> Self {
        Self {
            valid: false,
            normalized,
            host,
            session_id: None,
            error: Some(issue),
        }
    }

    /// The user-facing message for `error`, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

fn serialize_issue<S>(issue: &Option<UrlIssue>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match issue {
        Some(issue) => serializer.collect_str(issue),
        None => serializer.serialize_none(),
    }
}

// ── Building blocks ───────────────────────────────────────────────────────────

/// Trims the input and prepends `https://` when no HTTP(S) scheme is present.
///
/// The scheme check is case-insensitive.  Nothing else is rewritten or
/// percent-encoded, and empty input stays empty.
///
/// ```rust
/// use viewer_core::trust::normalize;
///
/// assert_eq!(normalize("  example.com/x "), "https://example.com/x");
/// assert_eq!(normalize("HTTP://example.com"), "HTTP://example.com");
/// ```
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

fn has_http_scheme(input: &str) -> bool {
    // `str::get` returns `None` instead of panicking when the cut would split
    // a multi-byte character.
    let starts_with = |prefix: &str| {
        input
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    starts_with("http://") || starts_with("https://")
}

/// Returns the hostname of an absolute URL, or `""` if it does not parse.
pub fn extract_host(input: &str) -> String {
    Url::parse(input)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// `true` if the URL contains one of the hacking-view route markers.
pub fn has_recognized_path(input: &str) -> bool {
    HACKING_VIEW_ROUTES
        .iter()
        .any(|route| input.contains(route))
}

/// Extracts the `session` parameter from the query string inside the fragment.
///
/// The viewer is a hash-routed single page app, so its parameters live after
/// the `#`, not in the regular query string:
///
/// ```text
/// https://host/#/hacking/view?session=abc123&state=x
///              └──────────── fragment ─────────────┘
///                            query ──┘
/// ```
///
/// Returns `None` when there is no fragment, no `?` inside it, or no
/// `session` key.  A repeated key yields its first value.
pub fn extract_session_id(input: &str) -> Option<String> {
    let (_, fragment) = input.split_once('#')?;
    let (_, query) = fragment.split_once('?')?;
    // A second `?` right after the first one is part of the query prefix.
    let query = query.strip_prefix('?').unwrap_or(query);

    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "session")
        .map(|(_, value)| value.into_owned())
}

/// Shortens a session id for display: at most 8 characters plus `"..."`.
///
/// ```rust
/// use viewer_core::format_session_display;
///
/// assert_eq!(format_session_display("abc123"), "abc123");
/// assert_eq!(format_session_display("abc123def456"), "abc123de...");
/// ```
pub fn format_session_display(session_id: &str) -> String {
    // Count characters, not bytes, so multi-byte ids are never cut mid-char.
    match session_id.char_indices().nth(SESSION_DISPLAY_LEN) {
        Some((cut, _)) => format!("{}...", &session_id[..cut]),
        None => session_id.to_string(),
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

/// Fully validates and normalises a user-supplied URL against `policy`.
///
/// See the module documentation for the order of checks and the meaning of
/// an `error` on a valid result.
///
/// # Example
///
/// ```rust
/// use viewer_core::{validate, TrustPolicy};
///
/// let policy = TrustPolicy::from_setting("example.com", false);
/// let result = validate("example.com/#/hacking/view?session=abc", &policy);
///
/// assert!(result.valid);
/// assert_eq!(result.host, "example.com");
/// assert_eq!(result.session_id.as_deref(), Some("abc"));
/// assert!(result.error.is_none());
/// ```
pub fn validate(input: &str, policy: &TrustPolicy) -> ValidationResult {
    if input.trim().is_empty() {
        return ValidationResult::rejected(String::new(), String::new(), UrlIssue::Required);
    }

    let normalized = normalize(input);
    let host = extract_host(&normalized);

    if host.is_empty() {
        return ValidationResult::rejected(normalized, host, UrlIssue::InvalidFormat);
    }

    if !policy.authorizes_host(&host) {
        let issue = UrlIssue::HostNotAllowed {
            host: host.clone(),
            allowed: policy.allowlist().to_vec(),
        };
        return ValidationResult::rejected(normalized, host, issue);
    }

    let session_id = extract_session_id(&normalized);
    let error = (!has_recognized_path(&normalized)).then_some(UrlIssue::NotHackingView);

    ValidationResult {
        valid: true,
        normalized,
        host,
        session_id,
        error,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn example_policy() -> TrustPolicy {
        TrustPolicy::from_setting("example.com", false)
    }

    // ── normalize ─────────────────────────────────────────────────────────────

    #[test]
    fn test_normalize_keeps_existing_scheme_after_trim() {
        for input in [
            "http://example.com",
            "https://example.com/x",
            "  HTTPS://Example.com  ",
            "HtTp://a.b",
        ] {
            assert_eq!(normalize(input), input.trim(), "input: {input:?}");
        }
    }

    #[test]
    fn test_normalize_prepends_https_without_scheme() {
        for input in ["example.com", " example.com/#/hacking/view ", "ftp://x.y", "not a url"] {
            assert_eq!(normalize(input), format!("https://{}", input.trim()));
        }
    }

    #[test]
    fn test_normalize_empty_input_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t"), "");
    }

    #[test]
    fn test_normalize_does_not_panic_on_multibyte_prefix() {
        assert_eq!(normalize("ñandú.example"), "https://ñandú.example");
    }

    // ── extract_host ──────────────────────────────────────────────────────────

    #[test]
    fn test_extract_host_of_malformed_url_is_empty() {
        assert_eq!(extract_host("not a url"), "");
        assert_eq!(extract_host(""), "");
        assert_eq!(extract_host("https://not a url"), "");
    }

    #[test]
    fn test_extract_host_lowercases_and_drops_port() {
        assert_eq!(extract_host("https://App.Example.COM:8443/x"), "app.example.com");
    }

    // ── has_recognized_path ───────────────────────────────────────────────────

    #[test]
    fn test_recognized_path_markers() {
        assert!(has_recognized_path("https://x.com/#/hacking/view"));
        assert!(has_recognized_path("https://x.com#/hacking/view?session=1"));
        assert!(!has_recognized_path("https://x.com/hacking/view"));
        assert!(!has_recognized_path("https://x.com/somewhere"));
    }

    // ── extract_session_id ────────────────────────────────────────────────────

    #[test]
    fn test_session_id_from_fragment_query() {
        let id = extract_session_id("https://x.com/#/hacking/view?session=abc123&state=x");
        assert_eq!(id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_session_id_absent_without_fragment() {
        assert_eq!(extract_session_id("https://x.com/path"), None);
    }

    #[test]
    fn test_session_id_ignores_regular_query_string() {
        // The session must be inside the fragment; a normal query is ignored.
        assert_eq!(extract_session_id("https://x.com/?session=abc#/hacking/view"), None);
    }

    #[test]
    fn test_session_id_absent_without_key() {
        assert_eq!(extract_session_id("https://x.com/#/hacking/view?state=x"), None);
    }

    #[test]
    fn test_session_id_is_percent_decoded() {
        let id = extract_session_id("https://x.com/#/v?session=a%20b+c");
        assert_eq!(id.as_deref(), Some("a b c"));
    }

    #[test]
    fn test_session_id_first_value_wins() {
        let id = extract_session_id("https://x.com/#/v?session=one&session=two");
        assert_eq!(id.as_deref(), Some("one"));
    }

    #[test]
    fn test_session_id_after_doubled_question_mark() {
        let id = extract_session_id("https://x.com/#/hacking/view??session=abc");
        assert_eq!(id.as_deref(), Some("abc"));
    }

    // ── format_session_display ────────────────────────────────────────────────

    #[test]
    fn test_session_display_short_id_is_identity() {
        assert_eq!(format_session_display("abc123"), "abc123");
        assert_eq!(format_session_display("abcdefgh"), "abcdefgh");
        assert_eq!(format_session_display(""), "");
    }

    #[test]
    fn test_session_display_long_id_is_truncated() {
        assert_eq!(format_session_display("abc123def456"), "abc123de...");
    }

    #[test]
    fn test_session_display_counts_characters() {
        assert_eq!(format_session_display("ééééééééé"), "éééééééé...");
    }

    // ── validate ──────────────────────────────────────────────────────────────

    #[test]
    fn test_validate_empty_input_is_required() {
        // Arrange / Act
        let result = validate("", &example_policy());

        // Assert
        assert!(!result.valid);
        assert_eq!(result.normalized, "");
        assert_eq!(result.host, "");
        assert_eq!(result.error, Some(UrlIssue::Required));
        assert_eq!(result.error_message().as_deref(), Some("URL is required"));
    }

    #[test]
    fn test_validate_whitespace_input_is_required() {
        let result = validate("   ", &example_policy());
        assert_eq!(result.error, Some(UrlIssue::Required));
    }

    #[test]
    fn test_validate_malformed_url_is_invalid_format() {
        // Arrange / Act
        let result = validate("not a url", &example_policy());

        // Assert
        assert!(!result.valid);
        assert_eq!(result.normalized, "https://not a url");
        assert_eq!(result.host, "");
        assert_eq!(result.error_message().as_deref(), Some("Invalid URL format"));
    }

    #[test]
    fn test_validate_allowed_host_with_session() {
        // Arrange / Act
        let result = validate(
            "example.com/#/hacking/view?session=abcdefgh12345",
            &example_policy(),
        );

        // Assert
        assert!(result.valid);
        assert_eq!(result.host, "example.com");
        assert_eq!(result.session_id.as_deref(), Some("abcdefgh12345"));
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_validate_foreign_host_is_rejected() {
        // Arrange / Act
        let result = validate("badhost.net/#/hacking/view", &example_policy());

        // Assert
        assert!(!result.valid);
        assert_eq!(result.host, "badhost.net");
        let message = result.error_message().unwrap();
        assert!(message.contains("not in the allowlist"), "got: {message}");
        assert_eq!(
            message,
            "Host \"badhost.net\" is not in the allowlist. Allowed: example.com"
        );
    }

    #[test]
    fn test_validate_rejection_lists_allowlist_comma_joined() {
        let policy = TrustPolicy::from_setting("a.com,b.com", false);
        let result = validate("c.com", &policy);
        assert_eq!(
            result.error_message().as_deref(),
            Some("Host \"c.com\" is not in the allowlist. Allowed: a.com, b.com")
        );
    }

    #[test]
    fn test_validate_unrecognized_path_is_soft_warning() {
        // Arrange / Act
        let result = validate("example.com/somewhere", &example_policy());

        // Assert: still valid, but with an advisory
        assert!(result.valid);
        assert_eq!(result.error, Some(UrlIssue::NotHackingView));
        assert_eq!(
            result.error_message().as_deref(),
            Some("URL does not appear to be a hacking view link")
        );
        assert!(!result.error.unwrap().is_blocking());
    }

    #[test]
    fn test_validate_override_accepts_unlisted_host() {
        let policy = TrustPolicy::from_setting("example.com", true);
        let result = validate("badhost.net/#/hacking/view", &policy);
        assert!(result.valid);
        assert_eq!(result.host, "badhost.net");
    }

    #[test]
    fn test_validate_empty_allowlist_rejects_everything() {
        let policy = TrustPolicy::from_setting("", false);
        let result = validate("example.com/#/hacking/view", &policy);
        assert!(!result.valid);
        assert_eq!(
            result.error_message().as_deref(),
            Some("Host \"example.com\" is not in the allowlist. Allowed: ")
        );
    }

    #[test]
    fn test_hard_failures_are_blocking() {
        assert!(UrlIssue::Required.is_blocking());
        assert!(UrlIssue::InvalidFormat.is_blocking());
        assert!(UrlIssue::HostNotAllowed {
            host: "x".to_string(),
            allowed: vec![]
        }
        .is_blocking());
    }

    #[test]
    fn test_validation_result_serializes_error_as_message() {
        // Arrange
        let result = validate("example.com/somewhere", &example_policy());

        // Act
        let json = serde_json::to_value(&result).unwrap();

        // Assert
        assert_eq!(json["valid"], true);
        assert_eq!(json["host"], "example.com");
        assert_eq!(json["error"], "URL does not appear to be a hacking view link");
        assert!(json.get("sessionId").is_none());
    }
}
