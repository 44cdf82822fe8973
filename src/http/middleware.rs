//! HTTP middleware

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use crate::app::AppState;

/// Global API rate limit; replies 429 once the quota is exhausted
pub async fn throttle_api(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.api_limiter.check().is_err() {
        let body = serde_json::json!({
            "error": "Too many requests"
        });
        return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }

    next.run(request).await
}
