//! Static API key authentication.

use crate::api::{ApiSettings, error::AppError};
use crate::gateway::GatewayError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Header carrying the caller credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests whose `x-api-key` header does not match the configured key.
///
/// Runs before any extractor of the matched route, so unauthenticated requests never reach
/// body parsing or the gateway.
pub async fn require_api_key(
    State(settings): State<Arc<ApiSettings>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let supplied = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    let present = supplied.is_some();
    let authorized =
        supplied.is_some_and(|key| keys_match(key.as_bytes(), settings.api_key.as_bytes()));

    if !authorized {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            present,
            "Rejected request with invalid or missing API key"
        );
        return Err(AppError(GatewayError::Unauthorized));
    }

    Ok(next.run(request).await)
}

// Runs in time proportional to the expected key only.
fn keys_match(supplied: &[u8], expected: &[u8]) -> bool {
    let mut diff = supplied.len() ^ expected.len();
    for (index, byte) in expected.iter().enumerate() {
        let other = supplied.get(index).copied().unwrap_or(!byte);
        diff |= usize::from(byte ^ other);
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::keys_match;

    #[test]
    fn keys_must_match_exactly() {
        assert!(keys_match(b"s3cret", b"s3cret"));
        assert!(!keys_match(b"s3cres", b"s3cret"));
        assert!(!keys_match(b"s3cr", b"s3cret"));
        assert!(!keys_match(b"s3crets", b"s3cret"));
        assert!(!keys_match(b"", b"s3cret"));
        assert!(!keys_match(b"anything", b""));
    }
}
