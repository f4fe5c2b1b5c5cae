//! Request guard for protected endpoints.
//!
//! Flow Overview: pull the bearer token (header, then `token` query param),
//! check it against the token store, and either pass the request through
//! with an [`AuthenticatedToken`] extension or reject it with a 401.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use std::sync::Arc;
use tracing::{debug, error};

use super::{
    types::{storage_unavailable, ErrorResponse},
    utils::extract_token,
};
use crate::auth::{AuthManager, StorageError};

/// The validated bearer token, available to handlers behind the guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedToken(pub String);

#[derive(Debug)]
pub enum GuardRejection {
    NoToken,
    InvalidToken,
    StorageUnavailable(StorageError),
}

impl GuardRejection {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoToken => "NO_TOKEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::NoToken => "Authentication required",
            Self::InvalidToken => "Invalid or expired token",
            Self::StorageUnavailable(err) => {
                error!("Failed to validate token: {err}");
                return storage_unavailable();
            }
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::with_code(message, self.code())),
        )
            .into_response()
    }
}

/// Classify the credential on a request.
///
/// # Errors
/// Returns the rejection to send when the request may not proceed.
pub async fn authorize(
    auth: &AuthManager,
    headers: &HeaderMap,
    query: Option<&str>,
) -> Result<AuthenticatedToken, GuardRejection> {
    let token = extract_token(headers, query).ok_or(GuardRejection::NoToken)?;
    match auth.check_token(&token).await {
        Ok(true) => Ok(AuthenticatedToken(token)),
        Ok(false) => Err(GuardRejection::InvalidToken),
        Err(err) => Err(GuardRejection::StorageUnavailable(err)),
    }
}

/// axum middleware: reject unauthenticated requests, pass the rest through.
pub async fn require_token(
    State(auth): State<Arc<AuthManager>>,
    mut request: Request,
    next: Next,
) -> Response {
    // Owned copies: the request body is not `Sync`, so no borrow of the
    // request may live across the await.
    let headers = request.headers().clone();
    let query = request.uri().query().map(str::to_string);
    let outcome = authorize(&auth, &headers, query.as_deref()).await;

    match outcome {
        Ok(token) => {
            request.extensions_mut().insert(token);
            next.run(request).await
        }
        Err(rejection) => {
            debug!(code = rejection.code(), "rejected unauthenticated request");
            rejection.into_response()
        }
    }
}

/// Put every route currently on `router` behind [`require_token`].
pub fn protect<S>(router: Router<S>, auth: Arc<AuthManager>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(auth, require_token))
}
