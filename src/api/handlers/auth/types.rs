//! Request/response types for auth endpoints.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthError;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ValidatePinRequest {
    pub pin: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePinResponse {
    pub success: bool,
    pub token: String,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ValidateTokenResponse {
    pub valid: bool,
}

#[derive(IntoParams, Deserialize, Debug)]
#[into_params(parameter_in = Query)]
pub struct TokenQuery {
    /// Fallback for clients that cannot set an `Authorization` header.
    pub token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub(crate) fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    pub(crate) fn with_code(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: Some(code.to_string()),
        }
    }
}

pub(crate) fn storage_unavailable() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::with_code(
            "Token storage unavailable",
            "STORAGE_UNAVAILABLE",
        )),
    )
        .into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            Self::MissingPin => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(self.to_string()))).into_response()
            }
            Self::InvalidPin => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::with_code(self.to_string(), self.code())),
            )
                .into_response(),
            Self::RateLimited {
                retry_after_seconds,
            } => {
                let mut response = (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse::with_code(self.to_string(), self.code())),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(*retry_after_seconds));
                response
            }
            Self::Storage(err) => {
                error!("token store failure: {err}");
                storage_unavailable()
            }
            Self::TokenGeneration(err) => {
                error!("token generation failure: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::with_code("Internal server error", self.code())),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn error_response_omits_missing_code() -> Result<()> {
        let value = serde_json::to_value(ErrorResponse::new("PIN is required"))?;
        assert_eq!(value, serde_json::json!({"error": "PIN is required"}));
        Ok(())
    }

    #[test]
    fn validate_pin_response_uses_camel_case() -> Result<()> {
        let value = serde_json::to_value(ValidatePinResponse {
            success: true,
            token: "abc".to_string(),
            expires_at: 42,
        })?;
        assert_eq!(
            value,
            serde_json::json!({"success": true, "token": "abc", "expiresAt": 42})
        );
        Ok(())
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = AuthError::RateLimited {
            retry_after_seconds: 90,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(RETRY_AFTER),
            Some(&HeaderValue::from(90_u64))
        );
    }
}
