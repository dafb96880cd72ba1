//! Host allowlist policy shared by URL validation and origin checks.
//!
//! # Matching rule
//!
//! An allowlist entry is a bare hostname or domain suffix such as
//! `example.com`.  A candidate host is authorised when it either equals an
//! entry or is a strict subdomain of it:
//!
//! ```text
//! entry "example.com"
//!   example.com            ✓  exact
//!   app.example.com        ✓  ends with ".example.com"
//!   evilexample.com        ✗  no dot boundary
//!   example.com.evil.com   ✗  entry is not a suffix
//! ```
//!
//! Hosts are compared as-is.  The URL parser already lowercases hostnames, so
//! no extra case folding happens here.

use url::Url;

/// Hosts trusted when no allowlist has been configured.
pub const DEFAULT_ALLOWLIST: &[&str] = &["starfinderencounters.com"];

/// Splits a comma-separated allowlist setting into entries.
///
/// Whitespace around each entry is trimmed and empty entries are discarded,
/// so `" a.com, ,b.com "` yields `["a.com", "b.com"]`.
pub fn parse_allowlist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns `true` if `host` equals an entry or is a subdomain of one.
///
/// Empty or whitespace-only entries never match anything.
pub fn is_host_authorized(host: &str, allowlist: &[String]) -> bool {
    if host.is_empty() {
        return false;
    }

    allowlist
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            // `strip_suffix` + a trailing-dot check is the allocation-free
            // equivalent of `host.ends_with(&format!(".{entry}"))`.
            host == entry
                || host
                    .strip_suffix(entry)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
}

/// The trust configuration in effect for one validation or origin check.
///
/// Build a fresh policy from configuration for every check so that a changed
/// allowlist applies immediately.  An empty allowlist authorises nothing
/// unless `allow_any_host` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    allowlist: Vec<String>,
    allow_any_host: bool,
}

impl TrustPolicy {
    /// Creates a policy from explicit entries.  Blank entries are dropped.
    pub fn new<I, S>(allowlist: I, allow_any_host: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowlist = allowlist
            .into_iter()
            .map(|entry| entry.as_ref().trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect();
        Self {
            allowlist,
            allow_any_host,
        }
    }

    /// Creates a policy from the comma-separated allowlist setting.
    pub fn from_setting(raw_allowlist: &str, allow_any_host: bool) -> Self {
        Self {
            allowlist: parse_allowlist(raw_allowlist),
            allow_any_host,
        }
    }

    /// The ordered allowlist entries.
    pub fn allowlist(&self) -> &[String] {
        &self.allowlist
    }

    /// Whether the "allow any host" override is active.
    pub fn allows_any_host(&self) -> bool {
        self.allow_any_host
    }

    /// Authorises a bare hostname.  An empty host is never authorised, even
    /// with the override on.
    pub fn authorizes_host(&self, host: &str) -> bool {
        if host.is_empty() {
            return false;
        }
        self.allow_any_host || is_host_authorized(host, &self.allowlist)
    }

    /// Authorises the declared origin of an inbound cross-context message.
    ///
    /// With the override active every origin is accepted without parsing,
    /// including opaque ones such as `"null"`.  Otherwise the origin must
    /// parse as a URL whose host passes [`is_host_authorized`].
    pub fn authorizes_origin(&self, origin: &str) -> bool {
        if self.allow_any_host {
            return true;
        }

        match Url::parse(origin) {
            Ok(parsed) => parsed
                .host_str()
                .is_some_and(|host| is_host_authorized(host, &self.allowlist)),
            Err(_) => false,
        }
    }
}

impl Default for TrustPolicy {
    /// The built-in allowlist with the override off.
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWLIST.iter().copied(), false)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn example_allowlist() -> Vec<String> {
        vec!["example.com".to_string()]
    }

    #[test]
    fn test_exact_host_is_authorized() {
        assert!(is_host_authorized("example.com", &example_allowlist()));
    }

    #[test]
    fn test_subdomain_is_authorized() {
        assert!(is_host_authorized("sub.example.com", &example_allowlist()));
        assert!(is_host_authorized("a.b.example.com", &example_allowlist()));
    }

    #[test]
    fn test_suffix_without_dot_boundary_is_rejected() {
        // "evilexample.com" ends with "example.com" but not ".example.com".
        assert!(!is_host_authorized("evilexample.com", &example_allowlist()));
    }

    #[test]
    fn test_entry_as_prefix_is_rejected() {
        assert!(!is_host_authorized("example.com.evil.com", &example_allowlist()));
    }

    #[test]
    fn test_empty_allowlist_authorizes_nothing() {
        assert!(!is_host_authorized("example.com", &[]));
    }

    #[test]
    fn test_blank_entries_never_match() {
        let allowlist = vec![String::new(), "   ".to_string()];
        assert!(!is_host_authorized("example.com", &allowlist));
        assert!(!is_host_authorized(".", &allowlist));
    }

    #[test]
    fn test_parse_allowlist_trims_and_drops_empty_entries() {
        // Arrange / Act
        let entries = parse_allowlist(" a.com, ,b.com ,, ");

        // Assert
        assert_eq!(entries, vec!["a.com".to_string(), "b.com".to_string()]);
    }

    #[test]
    fn test_parse_allowlist_of_blank_string_is_empty() {
        assert!(parse_allowlist("   ").is_empty());
    }

    #[test]
    fn test_policy_new_drops_blank_entries() {
        let policy = TrustPolicy::new(["example.com", " ", ""], false);
        assert_eq!(policy.allowlist(), &["example.com".to_string()]);
    }

    #[test]
    fn test_policy_default_uses_builtin_allowlist() {
        let policy = TrustPolicy::default();
        assert_eq!(policy.allowlist(), &["starfinderencounters.com".to_string()]);
        assert!(!policy.allows_any_host());
    }

    #[test]
    fn test_override_authorizes_any_non_empty_host() {
        let policy = TrustPolicy::new(Vec::<String>::new(), true);
        assert!(policy.authorizes_host("anything.net"));
        assert!(!policy.authorizes_host(""));
    }

    #[test]
    fn test_origin_with_allowed_host_and_port_is_authorized() {
        let policy = TrustPolicy::from_setting("example.com", false);
        assert!(policy.authorizes_origin("https://example.com"));
        assert!(policy.authorizes_origin("https://app.example.com:8443"));
    }

    #[test]
    fn test_origin_with_foreign_host_is_rejected() {
        let policy = TrustPolicy::from_setting("example.com", false);
        assert!(!policy.authorizes_origin("https://evilexample.com"));
        assert!(!policy.authorizes_origin("https://example.com.evil.com"));
    }

    #[test]
    fn test_unparseable_origin_is_rejected() {
        let policy = TrustPolicy::from_setting("example.com", false);
        assert!(!policy.authorizes_origin("null"));
        assert!(!policy.authorizes_origin(""));
    }

    #[test]
    fn test_override_accepts_opaque_origin() {
        // The override short-circuits before parsing, as the host module does.
        let policy = TrustPolicy::from_setting("", true);
        assert!(policy.authorizes_origin("null"));
    }
}
