use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::api::routes::AppState;
use crate::config::RateLimitSettings;

/// Builds the limiter shared by every analysis endpoint.
pub fn api_limiter(settings: &RateLimitSettings) -> Arc<DefaultDirectRateLimiter> {
    let per_minute = NonZeroU32::new(settings.api_requests_per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)))
}

/// Custom rate limit exceeded response
#[derive(Debug)]
pub struct RateLimitExceeded;

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Please try again later.",
        )
            .into_response()
    }
}

pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.limiter.check().is_err() {
        warn!(path = %request.uri().path(), "Rate limit exceeded");
        return RateLimitExceeded.into_response();
    }
    next.run(request).await
}
