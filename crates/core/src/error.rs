//! Error types for the Bia domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant; the gateway maps the
//! top-level [`Error`] onto HTTP statuses at the boundary.

use thiserror::Error;

/// Maximum length of the diagnostic detail carried by an upstream
/// failure. Anything longer is cut off, not dumped.
pub const MAX_UPSTREAM_DETAIL: usize = 200;

/// The top-level error type for all Bia operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Authentication errors ---
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    // --- Upstream completion provider ---
    #[error("upstream call failed: {detail}")]
    Upstream { detail: String },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Wrap a provider failure as the single opaque upstream category,
    /// truncating the diagnostic so a misbehaving provider can't flood
    /// responses or logs.
    pub fn upstream(err: ProviderError) -> Self {
        Error::Upstream {
            detail: truncate_detail(&err.to_string()),
        }
    }

    /// A deployment misconfiguration (server fault, not caller fault).
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

/// Cut a diagnostic string at [`MAX_UPSTREAM_DETAIL`] on a char boundary.
pub fn truncate_detail(detail: &str) -> String {
    if detail.len() <= MAX_UPSTREAM_DETAIL {
        return detail.to_string();
    }
    let mut end = MAX_UPSTREAM_DETAIL;
    while !detail.is_char_boundary(end) {
        end -= 1;
    }
    detail[..end].to_string()
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Error)]
pub enum StorageError {
    /// The configured persistent store cannot be reached. Never
    /// downgraded to the volatile store mid-process.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("rate limited by provider")]
    RateLimited,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("network error: {0}")]
    Network(String),
}

/// Why a bearer credential was rejected. All variants map to HTTP 401.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("malformed authorization header")]
    MalformedHeader,

    #[error("invalid token")]
    InvalidToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_detail_is_truncated() {
        let long = "x".repeat(5000);
        let err = Error::upstream(ProviderError::Network(long));
        let Error::Upstream { detail } = err else {
            panic!("expected upstream variant");
        };
        assert!(detail.len() <= MAX_UPSTREAM_DETAIL);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        // Multi-byte chars straddling the cap must not split.
        let s = "é".repeat(MAX_UPSTREAM_DETAIL);
        let out = truncate_detail(&s);
        assert!(out.len() <= MAX_UPSTREAM_DETAIL);
        assert!(out.chars().all(|c| c == 'é'));
    }

    #[test]
    fn short_detail_passes_through() {
        assert_eq!(truncate_detail("timeout"), "timeout");
    }

    #[test]
    fn provider_error_displays_status() {
        let err = Error::upstream(ProviderError::ApiError {
            status_code: 502,
            message: "bad gateway".into(),
        });
        assert!(err.to_string().contains("upstream call failed"));
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn auth_errors_display() {
        assert_eq!(AuthError::MissingToken.to_string(), "missing bearer token");
        assert_eq!(AuthError::InvalidToken.to_string(), "invalid token");
    }
}
