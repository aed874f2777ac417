//! Request-boundary error rendering.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use persona_core::ChatError;
use persona_core::api::ErrorResponse;

/// A [`ChatError`] on its way out as `{ "error", "kind" }`.
///
/// Every failure is a 500 except an unknown persona, which is a 404.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: ChatError,
}

impl ApiError {
    pub fn unknown_persona(persona_id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: ChatError::validation(format!("Unknown persona '{persona_id}'")),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ChatError> for ApiError {
    fn from(error: ChatError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ChatError::validation(format!("Invalid request body: {}", rejection.body_text())).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(status = %self.status, kind = ?self.error.kind(), "{}", self.error);
        (self.status, Json(ErrorResponse::from(&self.error))).into_response()
    }
}
