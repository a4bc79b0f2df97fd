//! # Request Identity
//!
//! Two layers sit in front of the assessment routes:
//!
//! - [`require_api_key`] checks `Authorization: Bearer <key>` against the
//!   configured key (`[auth] api_key` or `BILAN_API_KEY`). Without a key the
//!   layer is not installed.
//! - [`resolve_actor`] turns the optional `x-bilan-actor` header into an
//!   [`Actor`] request extension. A malformed header is rejected here, so
//!   handlers only ever see a parsed user id or nothing.
//!
//! `/health` is routed outside both layers.

use super::types::ApiError;
use axum::{
    Extension,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use bilan_core::UserId;
use std::sync::Arc;
use subtle::{Choice, ConstantTimeEq};

/// Header carrying the id of the user on whose behalf a request is made.
pub const ACTOR_HEADER: &str = "x-bilan-actor";

// =============================================================================
// API KEY
// =============================================================================

/// The shared secret expected in the `Authorization` header.
#[derive(Clone)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    /// Wrap a configured key; an empty key disables authentication.
    #[must_use]
    pub fn new(key: &str) -> Option<Self> {
        (!key.is_empty()).then(|| Self(Arc::from(key)))
    }

    /// Compare a presented key in time independent of where it differs.
    ///
    /// Every byte of the expected key is visited, whatever the presented
    /// length.
    #[must_use]
    pub fn verify(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();

        let same_len = expected.len().ct_eq(&presented.len());
        let same_bytes = expected
            .iter()
            .enumerate()
            .fold(Choice::from(1), |acc, (i, byte)| {
                acc & byte.ct_eq(presented.get(i).unwrap_or(&0))
            });
        (same_len & same_bytes).into()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(..)")
    }
}

/// Reject requests that do not present the configured key.
pub async fn require_api_key(
    State(key): State<ApiKey>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));

    match presented {
        Some(presented) if key.verify(presented) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(event = "auth_failure", reason = "invalid_api_key", "bad api key");
            Err(ApiError::Unauthenticated)
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "missing api key"
            );
            Err(ApiError::Unauthenticated)
        }
    }
}

// =============================================================================
// ACTOR
// =============================================================================

/// The user a request acts for, as named by `x-bilan-actor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub UserId);

impl Actor {
    /// Parse the raw header value.
    pub fn from_header(value: &[u8]) -> Result<Self, ApiError> {
        let text = std::str::from_utf8(value)
            .map_err(|_| ApiError::InvalidActor("non-UTF-8 header".to_string()))?;
        UserId::parse(text.trim())
            .map(Actor)
            .map_err(|_| ApiError::InvalidActor(text.to_string()))
    }

    /// The actor of a request that must name one.
    pub fn required(actor: Option<Extension<Actor>>) -> Result<UserId, ApiError> {
        actor
            .map(|Extension(Actor(user))| user)
            .ok_or(ApiError::MissingActor)
    }
}

/// Attach the parsed [`Actor`] to the request when the header is present.
pub async fn resolve_actor(mut request: Request<Body>, next: Next) -> Result<Response, ApiError> {
    if let Some(value) = request.headers().get(ACTOR_HEADER) {
        let actor = Actor::from_header(value.as_bytes())?;
        request.extensions_mut().insert(actor);
    }
    Ok(next.run(request).await)
}

// =============================================================================
// TESTS
// =============================================================================
