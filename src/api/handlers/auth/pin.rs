//! PIN exchange endpoint.

use axum::{
    extract::{ConnectInfo, Extension},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc};
use tracing::instrument;

use super::{
    types::{ErrorResponse, ValidatePinRequest, ValidatePinResponse},
    utils::client_id,
};
use crate::auth::{AuthError, AuthManager};

#[utoipa::path(
    post,
    path = "/api/auth/validate-pin",
    request_body = ValidatePinRequest,
    responses(
        (status = 200, description = "PIN accepted, token issued", body = ValidatePinResponse),
        (status = 400, description = "PIN missing or blank", body = ErrorResponse),
        (status = 401, description = "Wrong PIN (INVALID_PIN) or client locked out (RATE_LIMITED)", body = ErrorResponse),
        (status = 500, description = "Token storage unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn validate_pin(
    auth: Extension<Arc<AuthManager>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    payload: Option<Json<Value>>,
) -> Response {
    // The body is taken as raw JSON so that a missing, non-string or blank
    // `pin` all map to the same 400.
    let Some(pin) = payload.as_ref().and_then(|Json(body)| pin_from_body(body)) else {
        return AuthError::MissingPin.into_response();
    };

    let client = client_id(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        auth.config().trust_proxy_headers(),
    );

    match auth.issue(pin, &client).await {
        Ok(issued) => (
            StatusCode::OK,
            Json(ValidatePinResponse {
                success: true,
                token: issued.token,
                expires_at: issued.expires_at,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

fn pin_from_body(body: &Value) -> Option<&str> {
    body.get("pin")
        .and_then(Value::as_str)
        .filter(|pin| !pin.trim().is_empty())
}
