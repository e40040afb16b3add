//! API failures and their JSON envelope
//!
//! Every error response uses the same body shape:
//! `{"success": false, "error": <status>, "message": <description>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use taproom::AuthError;
use thiserror::Error;

/// A failure terminating request handling
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request failed authentication or authorization
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The addressed drink does not exist
    #[error("resource not found")]
    NotFound,

    /// The request was well-formed but could not be processed
    #[error("unprocessable")]
    Unprocessable,
}

impl ApiError {
    /// The HTTP status this failure responds with
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => {
                StatusCode::from_u16(err.status()).unwrap_or(StatusCode::UNAUTHORIZED)
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// The human-readable message carried in the response body
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Auth(err) => err.description(),
            Self::NotFound => "resource not found",
            Self::Unprocessable => "unprocessable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Auth(err) = &self {
            tracing::debug!(code = err.code(), "request rejected");
        }

        let status = self.status();
        let body = Json(json!({
            "success": false,
            "error": status.as_u16(),
            "message": self.message(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_keep_their_taxonomy_status() {
        let err = ApiError::from(AuthError::MissingAuthorization);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "The authorization header is missing.");

        let err = ApiError::from(AuthError::MissingPermissionsClaim);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_is_a_404() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NotFound.message(), "resource not found");
    }
}
