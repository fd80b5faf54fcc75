use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use rag_agent::ErrorResponse;

use crate::routes::AppState;

type AuthRejection = (StatusCode, Json<ErrorResponse>);

fn unauthorized(error: &str, message: &str) -> AuthRejection {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
}

/// Compares without short-circuiting on the first differing byte.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let (presented, expected) = (presented.as_bytes(), expected.as_bytes());
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Requires `Authorization: Bearer <API_BEARER_TOKEN>` when a token is configured.
pub async fn require_bearer(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let Some(TypedHeader(auth)) = auth else {
        return Err(unauthorized(
            "missing_authorization",
            "Authorization Bearer token is required",
        ));
    };

    if !tokens_match(auth.token(), expected) {
        log::warn!("Rejected request with invalid bearer token");
        return Err(unauthorized("invalid_token", "Token is invalid"));
    }

    Ok(next.run(request).await)
}
