//! Token check endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, instrument};

use super::{
    types::{storage_unavailable, ErrorResponse, TokenQuery, ValidateTokenResponse},
    utils::extract_token,
};
use crate::auth::AuthManager;

#[utoipa::path(
    get,
    path = "/api/auth/validate-token",
    params(TokenQuery),
    responses(
        (status = 200, description = "Whether the token is currently valid", body = ValidateTokenResponse),
        (status = 400, description = "No token supplied", body = ErrorResponse),
        (status = 500, description = "Token storage unavailable", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn validate_token(
    auth: Extension<Arc<AuthManager>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let Some(token) = extract_token(&headers, uri.query()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Token is required")),
        )
            .into_response();
    };

    match auth.check_token(&token).await {
        Ok(valid) => (StatusCode::OK, Json(ValidateTokenResponse { valid })).into_response(),
        Err(err) => {
            error!("Failed to validate token: {err}");
            storage_unavailable()
        }
    }
}
