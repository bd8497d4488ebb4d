//! Bearer-token guard for the chat endpoint.
//!
//! The server secret comes from config (`BIA_API_TOKEN`). A deployment
//! without one is a config fault (500), not an auth failure; clients
//! with a missing, malformed, or mismatched header get 401.

use subtle::ConstantTimeEq;

use bia_core::error::{AuthError, Error};

const BEARER_PREFIX: &str = "Bearer ";

/// Validate the `Authorization` header against the configured token.
pub fn require_bearer(configured: Option<&str>, header: Option<&str>) -> Result<(), Error> {
    let expected =
        configured.ok_or_else(|| Error::config("BIA_API_TOKEN is not set on the server"))?;
    let header = header.ok_or(AuthError::MissingToken)?;
    let provided = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MalformedHeader)?;

    if token_matches(expected, provided) {
        Ok(())
    } else {
        Err(AuthError::InvalidToken.into())
    }
}

/// Constant-time comparison over equal-length byte strings; a length
/// mismatch rejects immediately (length is not secret).
fn token_matches(expected: &str, provided: &str) -> bool {
    let expected = expected.as_bytes();
    let provided = provided.as_bytes();
    if expected.len() != provided.len() {
        return false;
    }
    expected.ct_eq(provided).into()
}
