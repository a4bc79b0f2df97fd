//! # Rate Limiting
//!
//! One global token bucket shared by every route, sized from
//! `[limits] rate_limit` or `BILAN_RATE_LIMIT` (see [`crate::config`]).

use super::types::ApiError;
use crate::config::LimitsConfig;
use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Global rate limiter shared across requests.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Build the limiter for the configured rate; `None` when the limit is 0.
pub fn rate_limiter(limits: &LimitsConfig) -> Option<GlobalRateLimiter> {
    let rps = NonZeroU32::new(limits.rate_limit)?;
    Some(Arc::new(RateLimiter::direct(Quota::per_second(rps))))
}

/// Reject the request with 429 once the bucket is empty.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if limiter.check().is_err() {
        tracing::warn!(path = %request.uri().path(), "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(request).await)
}
