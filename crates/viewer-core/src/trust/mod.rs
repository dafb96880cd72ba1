//! URL trust module: host allowlist policy and user-URL validation.

pub mod policy;
pub mod validator;

pub use policy::{is_host_authorized, parse_allowlist, TrustPolicy, DEFAULT_ALLOWLIST};
pub use validator::{
    extract_host, extract_session_id, format_session_display, has_recognized_path, normalize,
    validate, UrlIssue, ValidationResult,
};
